//! Front end of the document compiler: the normalized input model, the line
//! scanner with its command expression parser, and the diagnostics every
//! later stage reports through.

pub mod ast;
pub mod diag;
pub mod lexer;
pub mod parser;
pub mod scanner;

pub use ast::{Document, Line, NormalizedBlock};
pub use diag::{DiagCode, Diagnostic, Diagnostics, Severity};
pub use scanner::{classify_name, scan_line, NameClass, ScanConfig, ScanResult};
