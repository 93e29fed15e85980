//! Line scanner: decides whether a paragraph is a command-line, a say-line or
//! narration.
//!
//! Command-lines are tried first. A line that looks like brackets but does not
//! hold up as a sequence of commands falls through to the say-line grammar,
//! and anything that fails that too is narration. Scanning never fails.

use std::ops::Range;

use crate::ast::{CommandNode, Field, Line, Loc, SayNode, ELEMENT_MARKER};
use crate::diag::{DiagCode, Diagnostic};
use crate::lexer::{
    find_quote_end, is_command_close, is_command_open, is_comment_start, is_list_comma, is_paren_close,
    is_paren_open, is_say_separator, quote_closers, say_quote_closers,
};
use crate::parser::parse_command;

/// Punctuation that never occurs inside a speaker name.
const RESERVED_NAME_PUNCT: &[char] = &['。', '！', '？', '!', '?', '…', '；', ';', '“', '”', '"', '\'', '，', ','];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub max_name_chars: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig { max_name_chars: 24 }
    }
}

/// How confidently a piece of text reads as a speaker name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameClass {
    /// Quote-delimited: always a name.
    Definite,
    /// Plain text that may be a name; treated as one.
    Ambiguous,
    NotAName,
}

impl NameClass {
    pub fn is_name(self) -> bool {
        self != NameClass::NotAName
    }
}

pub fn classify_name(text: &str, quoted: bool, max_chars: usize) -> NameClass {
    let text = text.trim();
    if text.is_empty() || text.chars().count() > max_chars {
        return NameClass::NotAName;
    }
    if text.contains(RESERVED_NAME_PUNCT) || text.contains(ELEMENT_MARKER) {
        return NameClass::NotAName;
    }
    if quoted { NameClass::Definite } else { NameClass::Ambiguous }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub line: Line,
    pub diags: Vec<Diagnostic>,
}

/// Classifies the plain text of block `block`.
pub fn scan_line(text: &str, block: usize, cfg: &ScanConfig) -> ScanResult {
    let mut diags = Vec::new();
    if text.trim().is_empty() {
        return ScanResult { line: Line::Blank, diags };
    }
    match scan_commands(text, block) {
        CommandScan::Commands(nodes, ds) => {
            return ScanResult { line: Line::Commands(nodes), diags: ds };
        }
        CommandScan::Malformed(d) => {
            log::debug!("block {}: bracket line without a command name, read as text", block);
            diags.push(d);
        }
        CommandScan::NotCommands => {}
    }
    let line = match scan_say(text, cfg) {
        Some(say) => Line::Say(say),
        None => Line::Narration,
    };
    ScanResult { line, diags }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandScan {
    NotCommands,
    Commands(Vec<CommandNode>, Vec<Diagnostic>),
    /// Bracket structure is fine but a segment has no readable name.
    Malformed(Diagnostic),
}

struct Segment {
    outer: Range<usize>,
    interior: Range<usize>,
}

fn char_at(s: &str, i: usize) -> Option<char> {
    s.get(i..).and_then(|r| r.chars().next())
}

fn skip_ws(s: &str, mut i: usize) -> usize {
    while let Some(c) = char_at(s, i) {
        if !c.is_whitespace() {
            break;
        }
        i += c.len_utf8();
    }
    i
}

fn is_weak_quote(c: char) -> bool {
    matches!(c, '\'' | '‘' | '’')
}

fn bracket_segments(text: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut pos = skip_ws(text, 0);
    loop {
        let open = char_at(text, pos)?;
        if !is_command_open(open) {
            return None;
        }
        let body = pos + open.len_utf8();
        let mut j = body;
        let close = loop {
            let c = char_at(text, j)?;
            if is_command_close(c) {
                break j;
            }
            // apostrophes are common in prose, only skip double-quote pairs
            match quote_closers(c) {
                Some(closers) if !is_weak_quote(c) => j = find_quote_end(text, j, closers)?,
                _ => j += c.len_utf8(),
            }
        };
        let end = close + char_at(text, close).map_or(1, char::len_utf8);
        segments.push(Segment { outer: pos..end, interior: body..close });

        pos = skip_ws(text, end);
        match char_at(text, pos) {
            None => break,
            Some(c) if is_command_open(c) => continue,
            Some(c) if is_comment_start(c) => break,
            Some(_) => return None,
        }
    }
    Some(segments)
}

/// Tries to read `text` as one or more bracketed commands.
pub fn scan_commands(text: &str, block: usize) -> CommandScan {
    let Some(segments) = bracket_segments(text) else {
        return CommandScan::NotCommands;
    };
    let mut nodes = Vec::with_capacity(segments.len());
    let mut diags = Vec::new();
    for seg in segments {
        let mut interior = seg.interior.clone();
        let lead = skip_ws(text, interior.start);
        let disabled = char_at(text, lead).is_some_and(is_comment_start);
        if disabled {
            interior.start = lead + char_at(text, lead).map_or(1, char::len_utf8);
        }
        let first_element = text[..interior.start].matches(ELEMENT_MARKER).count();
        let loc = Loc::span(block, seg.outer.clone());
        let Some((mut node, ds)) = parse_command(&text[interior.clone()], loc, first_element) else {
            let diag = DiagCode::UnrecognizedCommand
                .builder()
                .param("name", text[seg.interior].trim())
                .param("reason", "no command name")
                .at(loc)
                .build();
            return CommandScan::Malformed(diag);
        };
        node.disabled = disabled;
        nodes.push(node);
        diags.extend(ds);
    }
    CommandScan::Commands(nodes, diags)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SayTok {
    Quoted,
    Sep,
    Open,
    Close,
    Comma,
    Text,
}

#[derive(Debug, Clone)]
struct Piece {
    kind: SayTok,
    outer: Range<usize>,
    /// Text of the piece: inside the quotes, or the trimmed run.
    inner: Range<usize>,
}

fn breaks_text(c: char) -> bool {
    is_say_separator(c)
        || is_paren_open(c)
        || is_paren_close(c)
        || is_list_comma(c)
        || (say_quote_closers(c).is_some() && !is_weak_quote(c))
}

fn say_pieces(src: &str) -> Vec<Piece> {
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(c) = char_at(src, i) {
        let one = i..i + c.len_utf8();
        if c.is_whitespace() {
            i = one.end;
            continue;
        }
        let single = if is_say_separator(c) {
            Some(SayTok::Sep)
        } else if is_paren_open(c) {
            Some(SayTok::Open)
        } else if is_paren_close(c) {
            Some(SayTok::Close)
        } else if is_list_comma(c) {
            Some(SayTok::Comma)
        } else {
            None
        };
        if let Some(kind) = single {
            out.push(Piece { kind, outer: one.clone(), inner: one.clone() });
            i = one.end;
            continue;
        }
        if let Some(closers) = say_quote_closers(c) {
            if let Some(end) = find_quote_end(src, i, closers) {
                let closer_len = src[..end].chars().next_back().map_or(1, char::len_utf8);
                out.push(Piece { kind: SayTok::Quoted, outer: i..end, inner: one.end..end - closer_len });
                i = end;
                continue;
            }
            // unterminated: the rest of the line is plain text
            let end = src.trim_end().len();
            out.push(Piece { kind: SayTok::Text, outer: i..end, inner: i..end });
            break;
        }
        let mut j = one.end;
        while let Some(d) = char_at(src, j) {
            if breaks_text(d) {
                break;
            }
            j += d.len_utf8();
        }
        let end = i + src[i..j].trim_end().len();
        out.push(Piece { kind: SayTok::Text, outer: i..end, inner: i..end });
        i = j;
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    /// `name? SEP status? content`
    SepFirst,
    /// `name? status SEP content`
    StatusFirst,
    /// `name status? "content"`
    QuotedContent,
    /// `"name"? status? content`
    QuotedName,
}

const FORMS: [Form; 4] = [Form::SepFirst, Form::StatusFirst, Form::QuotedContent, Form::QuotedName];

struct SayMatcher<'a> {
    src: &'a str,
    pieces: Vec<Piece>,
    max_name_chars: usize,
}

impl<'a> SayMatcher<'a> {
    fn kind(&self, i: usize) -> Option<SayTok> {
        self.pieces.get(i).map(|p| p.kind)
    }

    fn field(&self, p: &Piece) -> Field {
        Field::new(p.inner.clone(), &self.src[p.inner.clone()])
    }

    fn name(&self, i: usize, quoted_only: bool) -> Option<(Field, bool, usize)> {
        let p = self.pieces.get(i)?;
        let quoted = match p.kind {
            SayTok::Quoted => true,
            SayTok::Text if !quoted_only => false,
            _ => return None,
        };
        let text = &self.src[p.inner.clone()];
        classify_name(text, quoted, self.max_name_chars)
            .is_name()
            .then(|| (Field::new(p.inner.clone(), text.trim()), quoted, i + 1))
    }

    fn sep(&self, i: usize) -> Option<usize> {
        (self.kind(i)? == SayTok::Sep).then_some(i + 1)
    }

    fn status(&self, i: usize) -> Option<(Vec<Field>, usize)> {
        if self.kind(i)? != SayTok::Open {
            return None;
        }
        let mut tags = Vec::new();
        let mut j = i + 1;
        loop {
            match self.kind(j)? {
                SayTok::Close => return Some((tags, j + 1)),
                SayTok::Comma => {}
                SayTok::Text => tags.push(self.field(&self.pieces[j])),
                _ => return None,
            }
            j += 1;
        }
    }

    /// Content runs to the end of the line.
    fn content(&self, i: usize, quoted_only: bool) -> Option<(Vec<Field>, bool)> {
        let first = self.pieces.get(i)?;
        if quoted_only && self.pieces[i..].iter().any(|p| p.kind != SayTok::Quoted) {
            return None;
        }
        if first.kind == SayTok::Quoted {
            let fields = self.pieces[i..]
                .iter()
                .filter(|p| p.kind == SayTok::Quoted)
                .map(|p| self.field(p))
                .collect();
            return Some((fields, true));
        }
        if quoted_only {
            return None;
        }
        let start = first.outer.start;
        let end = start + self.src[start..].trim_end().len();
        Some((vec![Field::new(start..end, &self.src[start..end])], false))
    }

    fn try_form(&self, form: Form, with_name: bool) -> Option<SayNode> {
        let mut node = SayNode::default();
        let mut i = 0;
        if with_name {
            let (f, quoted, next) = self.name(i, form == Form::QuotedName)?;
            node.speaker = Some(f);
            node.speaker_quoted = quoted;
            i = next;
        } else if form == Form::QuotedContent {
            return None;
        }
        match form {
            Form::SepFirst => {
                i = self.sep(i)?;
                if let Some((tags, next)) = self.status(i) {
                    node.status = tags;
                    i = next;
                }
            }
            Form::StatusFirst => {
                let (tags, next) = self.status(i)?;
                node.status = tags;
                i = self.sep(next)?;
            }
            Form::QuotedContent | Form::QuotedName => {
                if let Some((tags, next)) = self.status(i) {
                    node.status = tags;
                    i = next;
                }
            }
        }
        let (content, quoted) = self.content(i, form == Form::QuotedContent)?;
        node.content = content;
        node.content_quoted = quoted;
        Some(node)
    }

    fn run(&self) -> Option<SayNode> {
        FORMS
            .iter()
            .flat_map(|f| [(*f, true), (*f, false)])
            .find_map(|(form, with_name)| self.try_form(form, with_name))
    }
}

/// Reads `text` as a say-line. `None` means the line is narration: no form
/// matched, or neither a speaker nor quoted content was found.
pub fn scan_say(text: &str, cfg: &ScanConfig) -> Option<SayNode> {
    let matcher = SayMatcher { src: text, pieces: say_pieces(text), max_name_chars: cfg.max_name_chars };
    let node = matcher.run()?;
    if node.speaker.is_none() && (!node.content_quoted || node.content_text().trim().is_empty()) {
        return None;
    }
    Some(node)
}
