//! Grammar Engine
//!
//!     A forward-only state machine over the classified line stream. Each line is looked at
//!     exactly once; nothing is buffered except the entry currently being assembled (an open
//!     list item or multiline block). The same pass feeds the content hasher, so the integrity
//!     digest is ready when the last line has been read.
//!
//! States
//!
//!     ExpectSignature -> ExpectVersion -> InMetadata -> { InSectionHeader <-> InSectionBody } -> Done
//!
//!     The first two lines are the header and any problem with them is fatal. Metadata runs
//!     until the first section header line. A section header moves to InSectionHeader; the
//!     first entry below it moves to InSectionBody.
//!
//! Recovery
//!
//!     A malformed line inside the metadata or a section body is reported as a SyntaxError and
//!     dropped; parsing continues with the next line. A malformed section header drops the
//!     header, and every entry line up to the next valid header is reported and dropped as
//!     well, since it belongs to no section. Duplicate section names and duplicate metadata
//!     keys abort on the line where they are found.
//!
//! Entries
//!
//!     - `Key: value` is a field. The value is trimmed and unescaped.
//!     - `- Key: value` opens a list item. Field lines indented deeper than the dash are
//!       continuation fields of that item; anything else closes it.
//!     - `Key: > |` opens a multiline block owned by the metadata, the section or the open list
//!       item. Body lines must be indented at least two spaces past the key; that indentation
//!       is stripped and the rest is kept raw. Blank lines are held back and only become part
//!       of the body if more body text follows.

use super::ir::{EntryNode, FieldNode, ItemNode, ParseTree, SectionNode};
use crate::soul::ast::{Abort, Code, Collector, Diagnostic, FatalKind, Header, SIGNATURE};
use crate::soul::integrity::{is_hash_line, ContentHasher};
use crate::soul::lexing::{indentation, unescape, Line, LineKind, Lines, MAX_LINE_CHARS};
use crate::soul::options::{ParseOptions, CHECK_INTERVAL};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Value that opens a multiline block
pub const BLOCK_MARKER: &str = "> |";

static VERSION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%VERSION: +v?(\d+)\.(\d+)\.(\d+) *$").unwrap());

static SECTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([A-Za-z][A-Za-z0-9_-]*)\] *$").unwrap());

static FIELD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*):(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectSignature,
    ExpectVersion,
    InMetadata,
    InSectionHeader,
    InSectionBody,
    Done,
}

/// Where a finished field goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    Metadata,
    Section,
    Item,
}

enum RawValue<'a> {
    Inline(&'a str),
    Block,
}

struct RawField<'a> {
    key: &'a str,
    value: RawValue<'a>,
}

struct OpenItem {
    node: ItemNode,
    dash_indent: usize,
}

struct OpenBlock<'a> {
    key: String,
    line: usize,
    owner: Owner,
    min_indent: usize,
    body: Vec<&'a str>,
    pending_blanks: usize,
}

impl<'a> OpenBlock<'a> {
    fn push(&mut self, text: &'a str) {
        for _ in 0..self.pending_blanks {
            self.body.push("");
        }
        self.pending_blanks = 0;
        self.body.push(text);
    }
}

/// Run the grammar over a decoded line stream.
///
/// Recoverable findings go to `collector`; the returned `Abort` is the first fatal one.
pub fn analyze(
    lines: Lines<'_>,
    options: &ParseOptions,
    collector: &mut Collector,
) -> Result<ParseTree, Abort> {
    let mut engine = Engine::new();
    for line in lines {
        if line.number % CHECK_INTERVAL == 0 {
            tracing::trace!(line = line.number, "grammar reached line batch");
            if options.interrupted() {
                return Err(FatalKind::Cancelled.into());
            }
        }
        engine.step(line, collector)?;
    }
    engine.finish(collector)
}

struct Engine<'a> {
    state: State,
    hasher: ContentHasher,
    hash_blanked: bool,
    header: Option<Header>,
    metadata: Vec<FieldNode>,
    sections: Vec<SectionNode>,
    section_names: HashSet<String>,
    current: Option<SectionNode>,
    item: Option<OpenItem>,
    block: Option<OpenBlock<'a>>,
}

impl<'a> Engine<'a> {
    fn new() -> Self {
        Self {
            state: State::ExpectSignature,
            hasher: ContentHasher::new(),
            hash_blanked: false,
            header: None,
            metadata: Vec::new(),
            sections: Vec::new(),
            section_names: HashSet::new(),
            current: None,
            item: None,
            block: None,
        }
    }

    fn step(&mut self, line: Line<'a>, collector: &mut Collector) -> Result<(), Abort> {
        self.digest(&line);

        match self.state {
            State::ExpectSignature => {
                if line.text != SIGNATURE {
                    return Err(Abort::new(FatalKind::Signature).at_line(line.number));
                }
                self.state = State::ExpectVersion;
                return Ok(());
            }
            State::ExpectVersion => {
                let header = parse_version(line.text)
                    .map_err(|message| Abort::new(FatalKind::Version(message)).at_line(line.number))?;
                self.header = Some(header);
                self.state = State::InMetadata;
                return Ok(());
            }
            _ => {}
        }

        if line.kind == LineKind::Overlong {
            return collector.record(
                Diagnostic::error(
                    Code::LineTooLong,
                    format!(
                        "line has {} characters, the limit is {MAX_LINE_CHARS}",
                        line.char_len()
                    ),
                )
                .at_line(line.number),
            );
        }

        if self.feed_block(&line, collector)? {
            return Ok(());
        }

        match line.kind {
            LineKind::Blank | LineKind::Comment => Ok(()),
            LineKind::SectionHeader => self.open_section(&line, collector),
            _ if self.state == State::InMetadata => self.metadata_line(&line, collector),
            LineKind::ListItem => self.list_item(&line, collector),
            LineKind::Field => self.section_field(&line, collector),
            _ => syntax_error(
                collector,
                line.number,
                format!("unexpected text '{}'", preview(line.text)),
            ),
        }
    }

    fn digest(&mut self, line: &Line<'_>) {
        if self.state == State::InMetadata && !self.hash_blanked && is_hash_line(line.text) {
            self.hash_blanked = true;
            self.hasher.blanked(line.terminated);
        } else {
            self.hasher.line(line.text, line.terminated);
        }
    }

    /// Offer a line to the open block. Returns true when the block consumed it.
    fn feed_block(&mut self, line: &Line<'a>, collector: &mut Collector) -> Result<bool, Abort> {
        let Some(block) = self.block.as_mut() else {
            return Ok(false);
        };
        if line.kind == LineKind::Blank {
            block.pending_blanks += 1;
            return Ok(true);
        }
        if indentation(line.text) >= block.min_indent {
            block.push(&line.text[block.min_indent..]);
            return Ok(true);
        }
        self.close_block(collector)?;
        Ok(false)
    }

    fn close_block(&mut self, collector: &mut Collector) -> Result<(), Abort> {
        let Some(block) = self.block.take() else {
            return Ok(());
        };
        if block.body.is_empty() {
            return syntax_error(
                collector,
                block.line,
                format!("multiline block '{}' has no indented body", block.key),
            );
        }
        let node = FieldNode::block(block.key, block.body.join("\n"), block.line);
        self.push(block.owner, node);
        Ok(())
    }

    fn metadata_line(&mut self, line: &Line<'a>, collector: &mut Collector) -> Result<(), Abort> {
        if line.kind != LineKind::Field || indentation(line.text) > 0 {
            return syntax_error(
                collector,
                line.number,
                "metadata lines must be 'Key: value' starting at column 0",
            );
        }
        let raw = match split_field(line.text) {
            Ok(raw) => raw,
            Err(message) => return syntax_error(collector, line.number, message),
        };
        if self.metadata.iter().any(|f| f.key == raw.key) {
            return Err(Abort::new(FatalKind::DuplicateMetadataKey {
                key: raw.key.to_string(),
            })
            .at_line(line.number)
            .at_path(raw.key));
        }
        self.accept(raw, line.number, 0, Owner::Metadata, collector)
    }

    fn open_section(&mut self, line: &Line<'a>, collector: &mut Collector) -> Result<(), Abort> {
        self.close_section();
        self.state = State::InSectionHeader;

        let Some(name) = SECTION_HEADER
            .captures(line.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            return syntax_error(
                collector,
                line.number,
                format!(
                    "malformed section header '{}'; its entries are dropped",
                    preview(line.text)
                ),
            );
        };

        if !self.section_names.insert(name.clone()) {
            return Err(Abort::new(FatalKind::DuplicateSection { name: name.clone() })
                .at_line(line.number)
                .at_path(name));
        }
        tracing::trace!(section = %name, line = line.number, "section opened");
        self.current = Some(SectionNode {
            name,
            line: line.number,
            entries: Vec::new(),
        });
        Ok(())
    }

    fn list_item(&mut self, line: &Line<'a>, collector: &mut Collector) -> Result<(), Abort> {
        if self.current.is_none() {
            return orphan(collector, line.number);
        }
        self.close_item();
        self.state = State::InSectionBody;

        let dash_indent = indentation(line.text);
        let rest = line.text[dash_indent + 1..].trim_start_matches(' ');
        let key_indent = line.text.len() - rest.len();
        self.item = Some(OpenItem {
            node: ItemNode {
                line: line.number,
                fields: Vec::new(),
            },
            dash_indent,
        });

        if rest.is_empty() {
            return syntax_error(collector, line.number, "list item has no field");
        }
        match split_field(rest) {
            Ok(raw) => self.accept(raw, line.number, key_indent, Owner::Item, collector),
            Err(message) => syntax_error(collector, line.number, message),
        }
    }

    fn section_field(&mut self, line: &Line<'a>, collector: &mut Collector) -> Result<(), Abort> {
        if self.current.is_none() {
            return orphan(collector, line.number);
        }
        self.state = State::InSectionBody;

        let indent = indentation(line.text);
        let continuation = self
            .item
            .as_ref()
            .is_some_and(|item| indent > item.dash_indent);
        if !continuation {
            self.close_item();
        }
        let owner = if continuation {
            Owner::Item
        } else {
            Owner::Section
        };

        match split_field(&line.text[indent..]) {
            Ok(raw) => self.accept(raw, line.number, indent, owner, collector),
            Err(message) => syntax_error(collector, line.number, message),
        }
    }

    /// Store an inline field or open a block for it
    fn accept(
        &mut self,
        raw: RawField<'_>,
        line: usize,
        key_indent: usize,
        owner: Owner,
        collector: &mut Collector,
    ) -> Result<(), Abort> {
        match raw.value {
            RawValue::Block => {
                self.block = Some(OpenBlock {
                    key: raw.key.to_string(),
                    line,
                    owner,
                    min_indent: key_indent + 2,
                    body: Vec::new(),
                    pending_blanks: 0,
                });
                Ok(())
            }
            RawValue::Inline(value) => match unescape(value) {
                Ok(value) => {
                    self.push(owner, FieldNode::inline(raw.key, value, line));
                    Ok(())
                }
                Err(err) => syntax_error(collector, line, format!("value of '{}': {err}", raw.key)),
            },
        }
    }

    fn push(&mut self, owner: Owner, node: FieldNode) {
        match owner {
            Owner::Metadata => self.metadata.push(node),
            Owner::Section => {
                if let Some(section) = self.current.as_mut() {
                    section.entries.push(EntryNode::Field(node));
                }
            }
            Owner::Item => {
                if let Some(item) = self.item.as_mut() {
                    item.node.fields.push(node);
                }
            }
        }
    }

    fn close_item(&mut self) {
        let Some(item) = self.item.take() else {
            return;
        };
        // an item whose only field was rejected leaves nothing behind
        if item.node.fields.is_empty() {
            return;
        }
        if let Some(section) = self.current.as_mut() {
            section.entries.push(EntryNode::Item(item.node));
        }
    }

    fn close_section(&mut self) {
        self.close_item();
        if let Some(section) = self.current.take() {
            if self.state == State::InSectionHeader {
                tracing::trace!(section = %section.name, "section closed with no entries");
            }
            self.sections.push(section);
        }
    }

    fn finish(mut self, collector: &mut Collector) -> Result<ParseTree, Abort> {
        match self.state {
            State::ExpectSignature => return Err(Abort::new(FatalKind::Signature).at_line(1)),
            State::ExpectVersion => {
                return Err(Abort::new(FatalKind::Version(
                    "missing %VERSION line".to_string(),
                ))
                .at_line(2))
            }
            _ => {}
        }
        self.close_block(collector)?;
        self.close_section();
        self.state = State::Done;

        let header = self
            .header
            .ok_or_else(|| Abort::new(FatalKind::Version("missing %VERSION line".to_string())))?;
        tracing::debug!(
            metadata = self.metadata.len(),
            sections = self.sections.len(),
            "grammar pass complete"
        );
        Ok(ParseTree {
            header,
            metadata: self.metadata,
            sections: self.sections,
            digest: self.hasher.finalize(),
        })
    }
}

fn parse_version(text: &str) -> Result<Header, String> {
    let caps = VERSION_LINE.captures(text).ok_or_else(|| {
        format!(
            "expected '%VERSION: vMAJOR.MINOR.PATCH', found '{}'",
            preview(text)
        )
    })?;
    let component = |index: usize| {
        caps[index]
            .parse::<u32>()
            .map_err(|_| format!("version component '{}' is out of range", &caps[index]))
    };
    Ok(Header::new(component(1)?, component(2)?, component(3)?))
}

/// Split `Key: value` (indentation already removed)
fn split_field(body: &str) -> Result<RawField<'_>, String> {
    if body.starts_with('\t') {
        return Err("tabs are not allowed for indentation".to_string());
    }
    let caps = FIELD_LINE
        .captures(body)
        .ok_or_else(|| format!("expected 'Key: value', found '{}'", preview(body)))?;
    let key = caps.get(1).map_or("", |m| m.as_str());
    let rest = caps.get(2).map_or("", |m| m.as_str());
    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(format!("missing space after '{key}:'"));
    }
    let value = rest.trim_matches(' ');
    let value = if value == BLOCK_MARKER {
        RawValue::Block
    } else {
        RawValue::Inline(value)
    };
    Ok(RawField { key, value })
}

fn syntax_error(
    collector: &mut Collector,
    line: usize,
    message: impl Into<String>,
) -> Result<(), Abort> {
    collector.record(Diagnostic::error(Code::SyntaxError, message).at_line(line))
}

fn orphan(collector: &mut Collector, line: usize) -> Result<(), Abort> {
    syntax_error(collector, line, "entry does not belong to any section")
}

/// First characters of a line, for messages
fn preview(text: &str) -> String {
    const LIMIT: usize = 40;
    if text.chars().count() <= LIMIT {
        text.to_string()
    } else {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head}...")
    }
}
