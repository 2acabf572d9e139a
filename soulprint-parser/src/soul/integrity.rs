//! Content integrity
//!
//!     A document may declare `Hash: <hex>` in its metadata. The value is the SHA-256 of the
//!     whole file with the text of that Hash line blanked (its line feed is kept), rendered as
//!     64 lowercase hex characters. Blanking makes the digest independent of the declared value,
//!     so the same bytes can be verified after the value is written in.
//!
//!     The grammar parser feeds every line into a [`ContentHasher`] during its single forward
//!     pass; there is no second read of the input. [`seal`] is the writer side: it computes the
//!     digest for a source text and writes (or replaces) its Hash line.
//!
//!     Only the first `Hash:` line of the metadata region (after the version line, before the
//!     first section header) is ever blanked.

use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Metadata key carrying the content digest
pub const HASH_KEY: &str = "Hash";

/// Hex-encoded SHA-256 of arbitrary bytes
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// True for a line declaring the Hash metadata key
pub fn is_hash_line(text: &str) -> bool {
    text.strip_prefix(HASH_KEY)
        .is_some_and(|rest| rest.starts_with(':'))
}

/// True for a digest in the declared format
pub fn is_digest(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Streaming digest over a document's lines
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    hasher: Sha256,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line as it appears in the source
    pub fn line(&mut self, text: &str, terminated: bool) {
        self.hasher.update(text.as_bytes());
        if terminated {
            self.hasher.update(b"\n");
        }
    }

    /// Feed the Hash line with its text blanked
    pub fn blanked(&mut self, terminated: bool) {
        if terminated {
            self.hasher.update(b"\n");
        }
    }

    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Compute the digest of `source` and write it into the metadata Hash line.
///
/// An existing Hash line is replaced in place; otherwise one is inserted after the last
/// metadata line. The result verifies against itself when parsed.
pub fn seal(source: &str) -> String {
    let mut lines: Vec<Cow<'_, str>> = source.split_inclusive('\n').map(Cow::Borrowed).collect();

    let region_end = lines
        .iter()
        .enumerate()
        .skip(2)
        .find(|(_, line)| line.starts_with('['))
        .map_or(lines.len(), |(index, _)| index);

    let existing = (2..region_end).find(|&index| is_hash_line(&lines[index]));
    let index = match existing {
        Some(index) => index,
        None => {
            let index = (2..region_end)
                .rev()
                .find(|&index| {
                    let trimmed = lines[index].trim();
                    !trimmed.is_empty() && !trimmed.starts_with('#')
                })
                .map_or(region_end.min(2), |last| last + 1);
            if index > 0 && !lines[index - 1].ends_with('\n') {
                lines[index - 1].to_mut().push('\n');
            }
            lines.insert(index, Cow::Borrowed("\n"));
            index
        }
    };

    let terminated = lines[index].ends_with('\n');
    let mut hasher = ContentHasher::new();
    for (position, line) in lines.iter().enumerate() {
        if position == index {
            hasher.blanked(terminated);
        } else {
            let text = line.strip_suffix('\n');
            hasher.line(text.unwrap_or(line.as_ref()), text.is_some());
        }
    }
    let digest = hasher.finalize();

    let terminator = if terminated { "\n" } else { "" };
    lines[index] = Cow::Owned(format!("{HASH_KEY}: {digest}{terminator}"));
    lines.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSEALED: &str = "%SOULPRINT\n%VERSION: v1.0.0\nCreator: Ada\n\n[Identity]\n  Name: Sovl\n";

    #[test]
    fn test_sha256_hex_shape() {
        let digest = sha256_hex("");
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(is_digest(&digest));
        assert!(!is_digest("E3B0"));
    }

    #[test]
    fn test_hasher_matches_one_shot_digest() {
        let mut hasher = ContentHasher::new();
        hasher.line("a", true);
        hasher.line("b", false);
        assert_eq!(hasher.finalize(), sha256_hex("a\nb"));
    }

    #[test]
    fn test_hash_line_detection() {
        assert!(is_hash_line("Hash: abc"));
        assert!(is_hash_line("Hash:"));
        assert!(!is_hash_line("Hashes: abc"));
        assert!(!is_hash_line("  Hash: abc"));
    }

    #[test]
    fn test_seal_inserts_after_metadata() {
        let sealed = seal(UNSEALED);
        let lines: Vec<&str> = sealed.lines().collect();
        assert_eq!(lines[2], "Creator: Ada");
        assert!(lines[3].starts_with("Hash: "));
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "[Identity]");

        let blanked = sealed.replacen(lines[3], "", 1);
        assert_eq!(lines[3], format!("Hash: {}", sha256_hex(blanked)));
    }

    #[test]
    fn test_seal_is_stable() {
        let once = seal(UNSEALED);
        assert_eq!(seal(&once), once);
    }

    #[test]
    fn test_seal_replaces_stale_hash() {
        let stale = UNSEALED.replace(
            "Creator: Ada\n",
            &format!("Creator: Ada\nHash: {}\n", "0".repeat(64)),
        );
        assert_eq!(seal(&stale), seal(UNSEALED));
    }

    #[test]
    fn test_seal_without_trailing_newline() {
        let sealed = seal("%SOULPRINT\n%VERSION: v1.0.0\nCreator: Ada");
        assert!(sealed.starts_with("%SOULPRINT\n%VERSION: v1.0.0\nCreator: Ada\nHash: "));
        assert!(sealed.ends_with('\n'));
    }
}
