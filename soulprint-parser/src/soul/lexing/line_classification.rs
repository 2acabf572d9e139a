//! Line Classification
//!
//!     Each decoded line gets exactly one [`LineKind`] based on its leading characters. The
//!     classification is context-free; the grammar parser decides what a kind means in its
//!     current state (a `Field` line inside an open multiline block is block text, for example).
//!
//!     Order matters: blank and comment checks come first so that `# key: value` stays a
//!     comment, and directives (`%...`) and section headers (`[...]`) are only recognized at
//!     column 0.

/// The classification of a decoded line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Empty or whitespace only
    Blank,
    /// First non-whitespace character is `#`
    Comment,
    /// Starts with `%` (signature and version lines)
    Directive,
    /// Starts with `[`
    SectionHeader,
    /// First non-space characters are `- ` (or a lone `-`)
    ListItem,
    /// Contains a colon
    Field,
    /// Anything else; never valid outside a multiline block
    Text,
    /// Longer than the line cap; never interpreted
    Overlong,
}

/// Determine the kind of a line from its text (terminator excluded).
pub fn classify(text: &str) -> LineKind {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with('#') {
        return LineKind::Comment;
    }
    if text.starts_with('%') {
        return LineKind::Directive;
    }
    if text.starts_with('[') {
        return LineKind::SectionHeader;
    }
    let body = text.trim_start_matches(' ');
    if body == "-" || body.starts_with("- ") {
        return LineKind::ListItem;
    }
    if body.contains(':') {
        return LineKind::Field;
    }
    LineKind::Text
}

/// Number of leading spaces. Only spaces count as indentation.
pub fn indentation(text: &str) -> usize {
    text.bytes().take_while(|&b| b == b' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_comment() {
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(classify("   \t "), LineKind::Blank);
        assert_eq!(classify("# comment"), LineKind::Comment);
        assert_eq!(classify("    # Name: not a field"), LineKind::Comment);
        assert_eq!(classify("\t# tab-indented comment"), LineKind::Comment);
    }

    #[test]
    fn test_structural_lines() {
        assert_eq!(classify("%SOULPRINT"), LineKind::Directive);
        assert_eq!(classify("%VERSION: v1.0.0"), LineKind::Directive);
        assert_eq!(classify("[Identity]"), LineKind::SectionHeader);
        assert_eq!(classify("  [Identity]"), LineKind::Text);
    }

    #[test]
    fn test_entries() {
        assert_eq!(classify("  - Memory: First light"), LineKind::ListItem);
        assert_eq!(classify("-"), LineKind::ListItem);
        assert_eq!(classify("  Name: Sovl"), LineKind::Field);
        assert_eq!(classify("-dash: value"), LineKind::Field);
        assert_eq!(classify("    plain words"), LineKind::Text);
    }

    #[test]
    fn test_indentation_counts_spaces_only() {
        assert_eq!(indentation("    Name: x"), 4);
        assert_eq!(indentation("\tName: x"), 0);
        assert_eq!(indentation("Name: x"), 0);
    }
}
