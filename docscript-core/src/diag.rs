//! Diagnostics shared by every compiler stage.
//!
//! Every code is registered in [`DiagCode`] together with its severity and a
//! message template (`{param}` placeholders). A [`Diagnostic`] can only be
//! made through [`DiagCode::builder`], which renders the template once; after
//! that the record is read-only.
//!
//! No diagnostic stops compilation. They are collected in an append-only
//! [`Diagnostics`] list and handed back next to the output.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::ast::Loc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagCode {
    UnrecognizedCommand,
    CommandUnknown,
    CommandMissingArgument,
    CommandInvalidArgument,
    SayerImplicitDecl,
    CharacterNameResolutionFailed,
    CharacterDuplicate,
    CharacterStateEmpty,
    CharacterStateError,
    SceneNotFound,
    SceneDuplicate,
    FunctionDuplicate,
    FunctionNotFound,
    LabelNotFound,
    LabelCrossFunction,
    LabelDuplicate,
    UnhandledNodeInTerminatedBlock,
    StateMergeCompensated,
    CfgInvalid,
}

impl DiagCode {
    pub const ALL: &'static [DiagCode] = &[
        DiagCode::UnrecognizedCommand,
        DiagCode::CommandUnknown,
        DiagCode::CommandMissingArgument,
        DiagCode::CommandInvalidArgument,
        DiagCode::SayerImplicitDecl,
        DiagCode::CharacterNameResolutionFailed,
        DiagCode::CharacterDuplicate,
        DiagCode::CharacterStateEmpty,
        DiagCode::CharacterStateError,
        DiagCode::SceneNotFound,
        DiagCode::SceneDuplicate,
        DiagCode::FunctionDuplicate,
        DiagCode::FunctionNotFound,
        DiagCode::LabelNotFound,
        DiagCode::LabelCrossFunction,
        DiagCode::LabelDuplicate,
        DiagCode::UnhandledNodeInTerminatedBlock,
        DiagCode::StateMergeCompensated,
        DiagCode::CfgInvalid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiagCode::UnrecognizedCommand => "unrecognized-command",
            DiagCode::CommandUnknown => "command-unknown",
            DiagCode::CommandMissingArgument => "command-missing-argument",
            DiagCode::CommandInvalidArgument => "command-invalid-argument",
            DiagCode::SayerImplicitDecl => "sayer-implicit-decl",
            DiagCode::CharacterNameResolutionFailed => "character-nameresolution-failed",
            DiagCode::CharacterDuplicate => "character-duplicate",
            DiagCode::CharacterStateEmpty => "character-state-empty",
            DiagCode::CharacterStateError => "character-stateerror",
            DiagCode::SceneNotFound => "scene-notfound",
            DiagCode::SceneDuplicate => "scene-duplicate",
            DiagCode::FunctionDuplicate => "function-duplicate",
            DiagCode::FunctionNotFound => "function-notfound",
            DiagCode::LabelNotFound => "label-notfound",
            DiagCode::LabelCrossFunction => "label-cross-function",
            DiagCode::LabelDuplicate => "label-duplicate",
            DiagCode::UnhandledNodeInTerminatedBlock => "unhandled-node-in-terminated-block",
            DiagCode::StateMergeCompensated => "state-merge-compensated",
            DiagCode::CfgInvalid => "cfg-invalid",
        }
    }

    /// Prefix of the code up to the first `-`.
    pub fn namespace(self) -> &'static str {
        let s = self.as_str();
        s.split('-').next().unwrap_or(s)
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagCode::SayerImplicitDecl | DiagCode::StateMergeCompensated => Severity::Info,
            DiagCode::CommandMissingArgument
            | DiagCode::FunctionNotFound
            | DiagCode::LabelNotFound
            | DiagCode::LabelCrossFunction
            | DiagCode::CfgInvalid => Severity::Error,
            _ => Severity::Warning,
        }
    }

    pub fn template(self) -> &'static str {
        match self {
            DiagCode::UnrecognizedCommand => "command '{name}' could not be parsed completely: {reason}",
            DiagCode::CommandUnknown => "unknown command '{name}'",
            DiagCode::CommandMissingArgument => "command '{name}' requires argument '{arg}'",
            DiagCode::CommandInvalidArgument => "command '{name}': invalid value '{value}' for '{arg}'",
            DiagCode::SayerImplicitDecl => "speaker '{name}' is not declared; declared implicitly with default style",
            DiagCode::CharacterNameResolutionFailed => "character '{name}' cannot be resolved; declared implicitly",
            DiagCode::CharacterDuplicate => "character '{name}' is already declared; later style settings are ignored",
            DiagCode::CharacterStateEmpty => "character '{name}' has no sprite state matching '{state}'",
            DiagCode::CharacterStateError => "character '{name}': {reason}",
            DiagCode::SceneNotFound => "scene '{name}' is not declared; created without background",
            DiagCode::SceneDuplicate => "scene '{name}' is already declared; this declaration is ignored",
            DiagCode::FunctionDuplicate => "function '{name}' is declared more than once; the later body is discarded",
            DiagCode::FunctionNotFound => "call target '{name}' is not a function",
            DiagCode::LabelNotFound => "jump target '{name}' is neither a label of '{function}' nor a function",
            DiagCode::LabelCrossFunction => "label '{name}' belongs to function '{owner}', not '{function}'; edge dropped",
            DiagCode::LabelDuplicate => "label '{name}' is declared again later in '{function}'; this declaration is ignored",
            DiagCode::UnhandledNodeInTerminatedBlock => "'{node}' follows a terminator and can never run; dropped",
            DiagCode::StateMergeCompensated => "{count} instruction(s) added on the path from '{from}' to match the state entering '{to}'",
            DiagCode::CfgInvalid => "function '{function}': {reason}",
        }
    }

    pub fn builder(self) -> DiagnosticBuilder {
        DiagnosticBuilder { code: self, params: Vec::new(), loc: None }
    }
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub struct DiagnosticBuilder {
    code: DiagCode,
    params: Vec<(&'static str, String)>,
    loc: Option<Loc>,
}

impl DiagnosticBuilder {
    pub fn param(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    pub fn at(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn build(self) -> Diagnostic {
        let mut message = self.code.template().to_string();
        for (k, v) in &self.params {
            message = message.replace(&format!("{{{}}}", k), v);
        }
        Diagnostic {
            code: self.code,
            severity: self.code.severity(),
            message,
            loc: self.loc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    code: DiagCode,
    severity: Severity,
    message: String,
    loc: Option<Loc>,
}

impl Diagnostic {
    pub fn code(&self) -> DiagCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn loc(&self) -> Option<Loc> {
        self.loc
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(loc) = self.loc {
            write!(f, " ({})", loc)?;
        }
        Ok(())
    }
}

/// Append-only list of diagnostics for one compilation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        log::debug!("{}", diag);
        self.items.push(diag);
    }

    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for d in iter {
            self.push(d);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, code: DiagCode) -> usize {
        self.items.iter().filter(|d| d.code == code).count()
    }

    pub fn has(&self, code: DiagCode) -> bool {
        self.count(code) > 0
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_is_rendered_once() {
        let d = DiagCode::SceneNotFound.builder().param("name", "park").at(Loc::block(3)).build();
        assert_eq!(d.message(), "scene 'park' is not declared; created without background");
        assert_eq!(d.severity(), Severity::Warning);
        assert_eq!(d.to_string(), "warning[scene-notfound]: scene 'park' is not declared; created without background (block 3)");
    }

    #[test]
    fn codes_are_unique_and_namespaced() {
        let mut seen = std::collections::HashSet::new();
        for code in DiagCode::ALL {
            assert!(seen.insert(code.as_str()), "duplicate code {}", code);
            assert!(!code.namespace().is_empty());
        }
        assert_eq!(DiagCode::CharacterStateError.namespace(), "character");
    }

    #[test]
    fn sink_counts_by_code() {
        let mut sink = Diagnostics::new();
        sink.push(DiagCode::LabelDuplicate.builder().param("name", "a").param("function", "f").build());
        sink.push(DiagCode::CfgInvalid.builder().build());
        assert_eq!(sink.count(DiagCode::LabelDuplicate), 1);
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 2);
    }
}
