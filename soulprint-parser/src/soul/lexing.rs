//! Lexer
//!
//!     The lexing layer turns raw bytes into a stream of classified lines. It has three parts:
//!
//!         1. Decoding. See [decoder](decoder). Whole-buffer checks (size ceiling, byte-order
//!            mark, UTF-8, foreign line terminators) run once, then lines are handed out lazily
//!            as borrowed slices of the input.
//!
//!         2. Line classification. See [line_classification](line_classification). Every line
//!            gets a kind from its leading characters: blank, comment, directive, section
//!            header, list item, field, plain text, or overlong.
//!
//!         3. Value tokenization. See [tokens](tokens). A logos lexer splits a scalar value
//!            into text runs and escape sequences so the grammar parser can resolve escapes and
//!            reject unescaped reserved characters.
//!
//! Pass-through Lines
//!
//!     Comments and blank lines stay in the line stream, tagged for pass-through. They still
//!     count for line numbering and for the content digest, and a blank line can be captured
//!     by an open multiline block. They are never interpreted as entries.

pub mod decoder;
pub mod line_classification;
pub mod tokens;

pub use decoder::{decode, Line, Lines, MAX_LINE_CHARS};
pub use line_classification::{classify, indentation, LineKind};
pub use tokens::{escape, unescape, EscapeError, ValueToken};
