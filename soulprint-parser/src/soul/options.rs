//! Parse options
//!
//!     Everything a caller can tune about a single parse: size mode, credentials for the
//!     privacy gate, the expired-consent override, strictness, legacy migration and
//!     cancellation. Options are plain data; they are cloned into each parse and never shared
//!     mutably.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Size ceiling in standard mode (5 MiB)
pub const STANDARD_CEILING: usize = 5 * 1024 * 1024;

/// Size ceiling in jumbo mode (10 MiB)
pub const JUMBO_CEILING: usize = 10 * 1024 * 1024;

/// Number of lines processed between cancellation checks
pub const CHECK_INTERVAL: usize = 256;

/// Size mode. Jumbo relaxes the file ceiling and per-section entry caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Standard,
    Jumbo,
}

impl Mode {
    pub fn size_ceiling(self) -> usize {
        match self {
            Mode::Standard => STANDARD_CEILING,
            Mode::Jumbo => JUMBO_CEILING,
        }
    }
}

/// Shared flag a caller flips to stop a running parse
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for one parse call
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub mode: Mode,
    /// Required for `PrivacyLevel: restricted`
    pub auth_token: Option<String>,
    /// Required for `PrivacyLevel: private`
    pub creator_key: Option<String>,
    pub allow_expired_consent: bool,
    /// Promote every recoverable diagnostic to a fatal abort
    pub strict: bool,
    /// Accept major-0 documents by running the legacy key migration
    pub migrate_legacy: bool,
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelToken>,
    /// Validation-time clock; `None` reads the system clock
    pub clock: Option<DateTime<Utc>>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn jumbo(self) -> Self {
        self.with_mode(Mode::Jumbo)
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_creator_key(mut self, key: impl Into<String>) -> Self {
        self.creator_key = Some(key.into());
        self
    }

    pub fn allow_expired_consent(mut self, allow: bool) -> Self {
        self.allow_expired_consent = allow;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn migrate_legacy(mut self, migrate: bool) -> Self {
        self.migrate_legacy = migrate;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    /// True once the cancel token fired or the deadline passed
    pub fn interrupted(&self) -> bool {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_mode_ceilings() {
        assert_eq!(Mode::Standard.size_ceiling(), 5 * 1024 * 1024);
        assert_eq!(Mode::Jumbo.size_ceiling(), 10 * 1024 * 1024);
        assert_eq!(ParseOptions::default().mode, Mode::Standard);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let options = ParseOptions::new().with_cancel_token(token.clone());
        assert!(!options.interrupted());
        token.cancel();
        assert!(options.interrupted());
    }

    #[test]
    fn test_deadline_in_the_past_interrupts() {
        let past = Instant::now() - Duration::from_millis(1);
        assert!(ParseOptions::new().with_deadline(past).interrupted());

        let future = Instant::now() + Duration::from_secs(3600);
        assert!(!ParseOptions::new().with_deadline(future).interrupted());
    }
}
