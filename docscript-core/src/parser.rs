//! Command expression parser.
//!
//! ```text
//! command  := name (SEP args)?
//! args     := arg (',' arg)*
//! arg      := key '=' value | value        -- a bare value only in first place
//! value    := text | "quoted" | <element> | text '(' args ')'
//! ```
//!
//! Parsing never loses the command name: on a malformed argument list the node
//! keeps what was read up to the error and an `unrecognized-command`
//! diagnostic is attached.

use crate::ast::{ArgValue, CommandNode, Loc, ELEMENT_MARKER};
use crate::diag::{DiagCode, Diagnostic};
use crate::lexer::{is_arg_comma, is_assign, is_paren_open, is_say_separator, Lexer, Span, Tok, TokKind};

static EOF: TokKind = TokKind::Eof;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub msg: String,
    pub span: Span,
}

pub struct Parser<'a> {
    toks: &'a [Tok],
    cursor: usize,
}

impl<'a> Parser<'a> {
    pub fn new(toks: &'a [Tok]) -> Self {
        Self { toks, cursor: 0 }
    }

    fn peek(&self) -> &'a TokKind {
        match self.toks.get(self.cursor) {
            Some(t) => &t.tok,
            None => &EOF,
        }
    }

    fn span(&self) -> Span {
        self.toks
            .get(self.cursor)
            .or_else(|| self.toks.last())
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn bump(&mut self) -> &'a TokKind {
        let tok = self.peek();
        if self.cursor < self.toks.len() {
            self.cursor += 1;
        }
        tok
    }

    fn at(&self, k: &TokKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(k)
    }

    fn consume(&mut self, k: &TokKind) -> bool {
        if self.at(k) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error<T>(&self, msg: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError { msg: msg.into(), span: self.span() })
    }

    fn at_end(&self, nested: bool) -> bool {
        self.at(&TokKind::Eof) || (nested && self.at(&TokKind::RParen))
    }

    /// Parses an argument list into `node`. Arguments read before an error
    /// stay in `node`.
    pub fn arguments(&mut self, node: &mut CommandNode, nested: bool) -> Result<(), ParseError> {
        if self.at_end(nested) {
            return Ok(());
        }
        loop {
            match self.peek() {
                TokKind::Text(t) => {
                    self.bump();
                    if self.consume(&TokKind::Assign) {
                        self.keyword(node, t)?;
                    } else if self.at(&TokKind::LParen) {
                        let call = self.call(t, node.loc)?;
                        self.positional(node, ArgValue::Call(Box::new(call)))?;
                    } else {
                        self.positional(node, ArgValue::Text(t.clone()))?;
                    }
                }
                TokKind::Str(_) | TokKind::Element(_) => {
                    let v = self.value(node.loc)?;
                    self.positional(node, v)?;
                }
                TokKind::Assign => return self.error("'=' without a key"),
                TokKind::Comma => return self.error("empty argument"),
                TokKind::Unterminated(_) => return self.error("unterminated quote"),
                TokKind::RParen => return self.error("unbalanced ')'"),
                TokKind::LParen => return self.error("'(' without a call name"),
                TokKind::Eof => return self.error("argument expected after ','"),
            }

            if self.consume(&TokKind::Comma) {
                continue;
            }
            if self.at_end(nested) {
                return Ok(());
            }
            return self.error("expected ',' between arguments");
        }
    }

    fn keyword(&mut self, node: &mut CommandNode, key: &str) -> Result<(), ParseError> {
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return self.error(format!("invalid argument name '{}'", key));
        }
        if node.has_kwarg(key) {
            return self.error(format!("argument '{}' given twice", key));
        }
        let v = self.value(node.loc)?;
        node.kwargs.push((key.to_string(), v));
        Ok(())
    }

    fn positional(&self, node: &mut CommandNode, v: ArgValue) -> Result<(), ParseError> {
        if !node.kwargs.is_empty() {
            return self.error("positional argument after keyword arguments");
        }
        if node.positional.is_some() {
            return self.error("only one positional argument is allowed");
        }
        node.positional = Some(v);
        Ok(())
    }

    fn value(&mut self, loc: Loc) -> Result<ArgValue, ParseError> {
        match self.peek() {
            TokKind::Text(t) => {
                self.bump();
                if self.at(&TokKind::LParen) {
                    Ok(ArgValue::Call(Box::new(self.call(t, loc)?)))
                } else {
                    Ok(ArgValue::Text(t.clone()))
                }
            }
            TokKind::Str(s) => {
                self.bump();
                Ok(ArgValue::Quoted(s.clone()))
            }
            TokKind::Element(i) => {
                self.bump();
                Ok(ArgValue::Element(*i))
            }
            TokKind::Unterminated(_) => self.error("unterminated quote"),
            other => self.error(format!("value expected, got {:?}", other)),
        }
    }

    fn call(&mut self, name: &str, loc: Loc) -> Result<CommandNode, ParseError> {
        self.bump(); // '('
        let mut node = CommandNode::new(name, loc);
        self.arguments(&mut node, true)?;
        if !self.consume(&TokKind::RParen) {
            return self.error(format!("missing ')' for '{}'", name));
        }
        Ok(node)
    }
}

/// Splits off the command name: the first word, ended by whitespace, a
/// separator, `(`, `,` or `=`. Returns the name and where arguments start.
pub fn split_name(interior: &str) -> Option<(&str, usize)> {
    let lead = interior.len() - interior.trim_start().len();
    let rest = &interior[lead..];
    let end = rest
        .char_indices()
        .find(|(_, c)| {
            c.is_whitespace()
                || is_say_separator(*c)
                || is_paren_open(*c)
                || is_arg_comma(*c)
                || is_assign(*c)
                || *c == ELEMENT_MARKER
        })
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let name = &rest[..end];
    if name.is_empty() || name.starts_with(|c| crate::lexer::quote_closers(c).is_some()) {
        return None;
    }
    let mut args_at = lead + end;
    // a colon may separate the name from its arguments
    let after = &interior[args_at..];
    let trimmed = after.trim_start();
    if let Some(c) = trimmed.chars().next() {
        if is_say_separator(c) {
            args_at += after.len() - trimmed.len() + c.len_utf8();
        }
    }
    Some((name, args_at))
}

/// Parses one command interior (text between the brackets). `loc` locates the
/// bracket segment; `first_element` is the number of element markers that
/// precede the interior in its block. `None` if no name can be read.
pub fn parse_command(interior: &str, loc: Loc, first_element: usize) -> Option<(CommandNode, Vec<Diagnostic>)> {
    let (name, args_at) = split_name(interior)?;
    let toks = Lexer::with_offsets(&interior[args_at..], args_at, first_element).run();
    let mut node = CommandNode::new(name, loc);
    node.raw_args = interior[args_at..].trim().to_string();
    let mut diags = Vec::new();

    if let Err(e) = Parser::new(&toks).arguments(&mut node, false) {
        log::debug!("command '{}': {} at {:?}", name, e.msg, e.span);
        diags.push(
            DiagCode::UnrecognizedCommand
                .builder()
                .param("name", name)
                .param("reason", &e.msg)
                .at(loc)
                .build(),
        );
    }
    Some((node, diags))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_with_colon_separator() {
        assert_eq!(split_name("  Show: Alice"), Some(("Show", 7)));
        assert_eq!(split_name("显示：Alice").map(|(n, _)| n), Some("显示"));
        assert_eq!(split_name("   "), None);
        assert_eq!(split_name("\"quoted\""), None);
    }
}
