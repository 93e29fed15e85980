//! Character classes shared by the scanners, and the tokenizer for the
//! argument part of a command (`[name args...]`).
//!
//! Every ASCII marker has a full-width twin so documents typed with a CJK
//! input method work without switching layouts.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::ast::ELEMENT_MARKER;

pub fn is_command_open(c: char) -> bool {
    matches!(c, '[' | '［' | '【')
}

pub fn is_command_close(c: char) -> bool {
    matches!(c, ']' | '］' | '】')
}

pub fn is_comment_start(c: char) -> bool {
    matches!(c, '#' | '＃')
}

pub fn is_say_separator(c: char) -> bool {
    matches!(c, ':' | '：')
}

pub fn is_paren_open(c: char) -> bool {
    matches!(c, '(' | '（')
}

pub fn is_paren_close(c: char) -> bool {
    matches!(c, ')' | '）')
}

pub fn is_arg_comma(c: char) -> bool {
    matches!(c, ',' | '，')
}

/// Commas inside a say-line status, which also accept the enumeration comma.
pub fn is_list_comma(c: char) -> bool {
    matches!(c, ',' | '，' | '、')
}

pub fn is_assign(c: char) -> bool {
    matches!(c, '=' | '＝')
}

/// Quote pairs valid inside commands. Curly quotes form one class each: the
/// opener is not checked against the closer's direction.
pub fn quote_closers(open: char) -> Option<&'static [char]> {
    match open {
        '"' => Some(&['"']),
        '\'' => Some(&['\'']),
        '“' | '”' | '„' => Some(&['“', '”']),
        '‘' | '’' => Some(&['‘', '’']),
        '「' => Some(&['」']),
        '『' => Some(&['』']),
        _ => None,
    }
}

/// Say-lines additionally accept square and lenticular brackets as quotes.
pub fn say_quote_closers(open: char) -> Option<&'static [char]> {
    match open {
        '[' | '［' => Some(&[']', '］']),
        '【' => Some(&['】']),
        _ => quote_closers(open),
    }
}

/// Byte offset just past the matching closer of the quote opened at `open_at`.
pub fn find_quote_end(src: &str, open_at: usize, closers: &[char]) -> Option<usize> {
    let open_len = src[open_at..].chars().next()?.len_utf8();
    let body = open_at + open_len;
    src[body..]
        .char_indices()
        .find(|(_, c)| closers.contains(c))
        .map(|(i, c)| body + i + c.len_utf8())
}

/// Byte range inside a command interior, relative to the interior start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Text(String),
    Str(String),
    Element(usize),
    Assign,
    Comma,
    LParen,
    RParen,
    /// Unterminated quote; carries the text after the opener.
    Unterminated(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tok {
    pub tok: TokKind,
    pub span: Span,
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    base: usize,
    next_element: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer::with_offsets(src, 0, 0)
    }

    /// `base` is added to every span; element markers are numbered from
    /// `first_element`.
    pub fn with_offsets(src: &'a str, base: usize, first_element: usize) -> Self {
        Lexer { src, chars: src.char_indices().peekable(), base, next_element: first_element }
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map(|(i, _)| *i).unwrap_or(self.src.len())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_special(c: char) -> bool {
        is_assign(c) || is_arg_comma(c) || is_paren_open(c) || is_paren_close(c) || c == ELEMENT_MARKER
    }

    // no escapes: quoted text is kept verbatim
    fn string_literal(&mut self) -> TokKind {
        let Some((_, open)) = self.advance() else { return TokKind::Eof };
        let closers = quote_closers(open).unwrap_or(&['"']);
        let mut content = String::new();
        while let Some((_, c)) = self.advance() {
            if closers.contains(&c) {
                return TokKind::Str(content);
            }
            content.push(c);
        }
        TokKind::Unterminated(content)
    }

    fn text(&mut self) -> String {
        let start = self.pos();
        while let Some(c) = self.peek() {
            if Self::is_special(c) {
                break;
            }
            self.advance();
        }
        let end = self.pos();
        self.src[start..end].trim_end().to_string()
    }

    fn push(&self, tokens: &mut Vec<Tok>, tok: TokKind, start: usize, end: usize) {
        tokens.push(Tok { tok, span: Span { start: self.base + start, end: self.base + end } });
    }

    pub fn run(&mut self) -> Vec<Tok> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos();
            let Some(c) = self.peek() else { break };
            let kind = match c {
                c if is_assign(c) => {
                    self.advance();
                    TokKind::Assign
                }
                c if is_arg_comma(c) => {
                    self.advance();
                    TokKind::Comma
                }
                c if is_paren_open(c) => {
                    self.advance();
                    TokKind::LParen
                }
                c if is_paren_close(c) => {
                    self.advance();
                    TokKind::RParen
                }
                ELEMENT_MARKER => {
                    self.advance();
                    let idx = self.next_element;
                    self.next_element += 1;
                    TokKind::Element(idx)
                }
                c if quote_closers(c).is_some() => self.string_literal(),
                _ => TokKind::Text(self.text()),
            };
            let end = self.pos();
            self.push(&mut tokens, kind, start, end);
        }
        let end = self.src.len();
        self.push(&mut tokens, TokKind::Eof, end, end);
        tokens
    }
}
