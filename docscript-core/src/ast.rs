//! Input model handed over by document ingestion, and the nodes the scanner
//! produces from it.
//!
//! Ingestion (docx/odt/md readers) lives outside this crate. What reaches us
//! is an ordered list of [`NormalizedBlock`]s: styled text runs plus the
//! paragraph-level styling that changes how a paragraph is read.

use std::fmt;
use std::ops::Range;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stands in for an embedded media object inside run text. The n-th marker of
/// a block refers to `NormalizedBlock::media[n]`.
pub const ELEMENT_MARKER: char = '\u{FFFC}';

static COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{6})$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 0xff, g: 0xff, b: 0xff };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Accepts `#rrggbb` or `rrggbb`.
    pub fn parse(s: &str) -> Option<Color> {
        let caps = COLOR_RE.captures(s.trim())?;
        let hex = caps.get(1)?.as_str();
        let v = u32::from_str_radix(hex, 16).ok()?;
        Some(Color::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
    }

    pub fn is_white(&self) -> bool {
        *self == Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color '{}'", s)))
    }
}

/// Inline styling of a run. Always preserved as content markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub color: Option<Color>,
}

impl TextStyle {
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && self.color.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        TextRun { text: text.into(), style: TextStyle::default() }
    }

    pub fn styled(text: impl Into<String>, style: TextStyle) -> Self {
        TextRun { text: text.into(), style }
    }
}

/// A sequence of styled runs. Byte offsets used by [`StyledText::slice`] are
/// offsets into [`StyledText::plain`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyledText(pub Vec<TextRun>);

impl StyledText {
    pub fn new() -> Self {
        StyledText(Vec::new())
    }

    pub fn plain(&self) -> String {
        self.0.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|r| r.text.is_empty())
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.0
    }

    /// Appends a run, merging it into the previous one when styles match.
    pub fn push(&mut self, run: TextRun) {
        if run.text.is_empty() {
            return;
        }
        if let Some(last) = self.0.last_mut() {
            if last.style == run.style {
                last.text.push_str(&run.text);
                return;
            }
        }
        self.0.push(run);
    }

    pub fn append(&mut self, other: StyledText) {
        for run in other.0 {
            self.push(run);
        }
    }

    pub fn slice(&self, range: Range<usize>) -> StyledText {
        let mut out = StyledText::new();
        let mut offset = 0;
        for run in &self.0 {
            let (s, e) = (offset, offset + run.text.len());
            offset = e;
            let lo = range.start.max(s);
            let hi = range.end.min(e);
            if lo < hi {
                out.push(TextRun::styled(&run.text[lo - s..hi - s], run.style.clone()));
            }
        }
        out
    }

    /// Strips leading and trailing whitespace across run boundaries.
    pub fn trim(&self) -> StyledText {
        let plain = self.plain();
        let start = plain.len() - plain.trim_start().len();
        let end = plain.trim_end().len();
        if start >= end {
            return StyledText::new();
        }
        self.slice(start..end)
    }

    /// Drops characters for which `f` is true, keeping run styles.
    pub fn without(&self, f: impl Fn(char) -> bool) -> StyledText {
        let mut out = StyledText::new();
        for run in &self.0 {
            let text: String = run.text.chars().filter(|c| !f(*c)).collect();
            out.push(TextRun::styled(text, run.style.clone()));
        }
        out
    }
}

impl From<&str> for StyledText {
    fn from(s: &str) -> Self {
        let mut t = StyledText::new();
        t.push(TextRun::plain(s));
        t
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphStyle {
    pub align: Alignment,
    pub background: Option<Color>,
}

/// Structured content that may trail a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attachment {
    Table(Vec<Vec<String>>),
    List(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub path: String,
    #[serde(default)]
    pub kind: MediaKind,
}

impl MediaRef {
    pub fn image(path: impl Into<String>) -> Self {
        MediaRef { path: path.into(), kind: MediaKind::Image }
    }

    pub fn audio(path: impl Into<String>) -> Self {
        MediaRef { path: path.into(), kind: MediaKind::Audio }
    }
}

/// One paragraph (or table / list) as delivered by ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizedBlock {
    pub runs: StyledText,
    pub paragraph: ParagraphStyle,
    pub attachment: Option<Attachment>,
    pub media: Vec<MediaRef>,
}

impl NormalizedBlock {
    pub fn text(s: &str) -> Self {
        NormalizedBlock { runs: StyledText::from(s), ..Default::default() }
    }

    pub fn styled(runs: Vec<TextRun>) -> Self {
        NormalizedBlock { runs: StyledText(runs), ..Default::default() }
    }

    pub fn table(rows: Vec<Vec<&str>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        NormalizedBlock { attachment: Some(Attachment::Table(rows)), ..Default::default() }
    }

    pub fn list(items: Vec<&str>) -> Self {
        let items = items.into_iter().map(str::to_string).collect();
        NormalizedBlock { attachment: Some(Attachment::List(items)), ..Default::default() }
    }

    pub fn with_paragraph(mut self, paragraph: ParagraphStyle) -> Self {
        self.paragraph = paragraph;
        self
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    pub fn plain(&self) -> String {
        self.runs.plain()
    }

    pub fn is_blank(&self) -> bool {
        self.attachment.is_none()
            && self.media.is_empty()
            && self.runs.plain().trim().is_empty()
    }

    /// Non-default background: the paragraph is copied to the output verbatim.
    pub fn is_passthrough(&self) -> bool {
        self.paragraph.background.is_some_and(|c| !c.is_white())
    }

    /// Centered paragraph carrying an image.
    pub fn is_display(&self) -> bool {
        self.paragraph.align == Alignment::Center
            && self.media.iter().any(|m| m.kind == MediaKind::Image)
    }
}

/// A whole document after ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub title: String,
    pub blocks: Vec<NormalizedBlock>,
}

impl Document {
    pub fn new(title: impl Into<String>, blocks: Vec<NormalizedBlock>) -> Self {
        Document { title: title.into(), blocks }
    }

    /// Reads the JSON form produced by the ingestion tools.
    pub fn from_json(src: &str) -> anyhow::Result<Document> {
        let doc: Document =
            serde_json::from_str(src).context("Failed to parse normalized document JSON")?;
        log::debug!("Loaded document '{}' with {} blocks", doc.title, doc.blocks.len());
        Ok(doc)
    }
}

/// Source location: block index plus a byte range inside its plain text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Loc {
    pub block: usize,
    pub start: usize,
    pub end: usize,
}

impl Loc {
    pub fn block(block: usize) -> Self {
        Loc { block, start: 0, end: 0 }
    }

    pub fn span(block: usize, range: Range<usize>) -> Self {
        Loc { block, start: range.start, end: range.end }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "block {}", self.block)
        } else {
            write!(f, "block {}:{}..{}", self.block, self.start, self.end)
        }
    }
}

/// A piece of a say-line with its position in the line text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub range: Range<usize>,
    pub text: String,
}

impl Field {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Field { range, text: text.into() }
    }
}

/// Result of scanning a say-line. Content is kept as positions so the builder
/// can cut the styled runs of the block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SayNode {
    pub speaker: Option<Field>,
    pub speaker_quoted: bool,
    pub status: Vec<Field>,
    pub content: Vec<Field>,
    pub content_quoted: bool,
}

impl SayNode {
    pub fn speaker_text(&self) -> Option<&str> {
        self.speaker.as_ref().map(|f| f.text.as_str())
    }

    pub fn content_text(&self) -> String {
        self.content.iter().map(|f| f.text.as_str()).collect()
    }

    /// Status tags, split on whitespace inside each field.
    pub fn status_tags(&self) -> Vec<String> {
        self.status
            .iter()
            .flat_map(|f| f.text.split_whitespace())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    Quoted(String),
    /// Index into the owning block's media list.
    Element(usize),
    Call(Box<CommandNode>),
}

impl ArgValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) | ArgValue::Quoted(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CommandNode> {
        match self {
            ArgValue::Call(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Text(s) => write!(f, "{}", s),
            ArgValue::Quoted(s) => write!(f, "\"{}\"", s),
            ArgValue::Element(i) => write!(f, "<element {}>", i),
            ArgValue::Call(c) => write!(f, "{}", c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNode {
    pub name: String,
    pub positional: Option<ArgValue>,
    /// Keyword arguments in source order; keys are unique.
    pub kwargs: Vec<(String, ArgValue)>,
    /// Argument text exactly as written, for commands that read it verbatim.
    pub raw_args: String,
    /// Written as `[#cmd ...]`: parsed, never executed.
    pub disabled: bool,
    pub attachment: Option<Attachment>,
    pub loc: Loc,
}

impl CommandNode {
    pub fn new(name: impl Into<String>, loc: Loc) -> Self {
        CommandNode {
            name: name.into(),
            positional: None,
            kwargs: Vec::new(),
            raw_args: String::new(),
            disabled: false,
            attachment: None,
            loc,
        }
    }

    pub fn kwarg(&self, key: &str) -> Option<&ArgValue> {
        self.kwargs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First keyword present among `keys` (English name and aliases).
    pub fn kwarg_any(&self, keys: &[&str]) -> Option<&ArgValue> {
        keys.iter().find_map(|k| self.kwarg(k))
    }

    pub fn has_kwarg(&self, key: &str) -> bool {
        self.kwarg(key).is_some()
    }

    pub fn positional_text(&self) -> Option<&str> {
        self.positional.as_ref().and_then(ArgValue::as_text)
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        let mut args = Vec::new();
        if let Some(p) = &self.positional {
            args.push(p.to_string());
        }
        for (k, v) in &self.kwargs {
            args.push(format!("{}={}", k, v));
        }
        if !args.is_empty() {
            write!(f, "({})", args.join(", "))?;
        }
        Ok(())
    }
}

/// Classification of one paragraph's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Commands(Vec<CommandNode>),
    Say(SayNode),
    Narration,
    Blank,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parse_and_display() {
        assert_eq!(Color::parse("#FF8000"), Some(Color::new(255, 128, 0)));
        assert_eq!(Color::parse("00ff00").map(|c| c.to_string()), Some("#00ff00".into()));
        assert_eq!(Color::parse("#fff"), None);
        assert!(Color::parse("#ffffff").unwrap().is_white());
    }

    #[test]
    fn slice_keeps_run_styles() {
        let bold = TextStyle { bold: true, ..Default::default() };
        let text = StyledText(vec![
            TextRun::plain("ab"),
            TextRun::styled("cd", bold.clone()),
            TextRun::plain("ef"),
        ]);
        let s = text.slice(1..5);
        assert_eq!(s.plain(), "bcde");
        assert_eq!(s.runs().len(), 3);
        assert_eq!(s.runs()[1].style, bold);
    }

    #[test]
    fn passthrough_ignores_white_background() {
        let white = ParagraphStyle { background: Some(Color::WHITE), ..Default::default() };
        assert!(!NormalizedBlock::text("x").with_paragraph(white).is_passthrough());
        let grey = ParagraphStyle { background: Some(Color::new(0xcc, 0xcc, 0xcc)), ..Default::default() };
        assert!(NormalizedBlock::text("x").with_paragraph(grey).is_passthrough());
    }

    #[test]
    fn document_from_json() {
        let src = r##"{
            "title": "ch1",
            "blocks": [
                {"runs": [{"text": "Alice: hi", "style": {"bold": true}}]},
                {"attachment": {"list": ["a", "b"]}},
                {"paragraph": {"align": "center"}, "media": [{"path": "cg.png"}]}
            ]
        }"##;
        let doc = Document::from_json(src).unwrap();
        assert_eq!(doc.blocks.len(), 3);
        assert!(doc.blocks[0].runs.runs()[0].style.bold);
        assert_eq!(doc.blocks[1].attachment, Some(Attachment::List(vec!["a".into(), "b".into()])));
        assert!(doc.blocks[2].is_display());
        assert!(Document::from_json("{").is_err());
    }
}
