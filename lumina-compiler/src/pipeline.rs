//! Whole-document entry points.

use anyhow::Context;
use docscript_core::ast::Document;
use docscript_core::diag::Diagnostics;
use rayon::prelude::*;

use crate::builder;
use crate::cfg;
use crate::codegen::{self, dump::Dump, renpy};
use crate::config::CompilerConfig;
use crate::ir::Program;

/// Everything one document compiles to.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub program: Program,
    pub script: String,
    pub dump: Dump,
    pub diagnostics: Diagnostics,
}

/// Builds the IR and CFGs of a document without generating code.
pub fn lower(doc: &Document, cfg: &CompilerConfig, diags: &mut Diagnostics) -> Program {
    let built = builder::build(doc, &cfg.frontend, diags);
    let mut program = built.program;
    program.functions = cfg::build_all(&built.raw_functions, diags);
    program
}

/// Generates the Ren'Py script for an already lowered program.
pub fn render(program: &Program, cfg: &CompilerConfig) -> (String, Diagnostics) {
    let generated = codegen::generate(program, &cfg.codegen);
    let script = renpy::emit(program, &generated, &cfg.codegen);
    let mut diags = Diagnostics::new();
    diags.extend(generated.diagnostics);
    (script, diags)
}

pub fn compile(doc: &Document, cfg: &CompilerConfig) -> Compiled {
    let mut diagnostics = Diagnostics::new();
    let program = lower(doc, cfg, &mut diagnostics);
    let (script, generated) = render(&program, cfg);
    diagnostics.extend(generated.into_vec());
    let dump = Dump::from_program(&program, &cfg.frontend.narrator_name);
    log::info!("Compiled '{}': {} diagnostics", doc.title, diagnostics.len());
    Compiled { program, script, dump, diagnostics }
}

/// Compiles independent documents in parallel. Results keep input order.
pub fn compile_batch(docs: &[Document], cfg: &CompilerConfig) -> Vec<Compiled> {
    docs.par_iter().map(|doc| compile(doc, cfg)).collect()
}

/// Parses the JSON ingestion form and compiles it.
pub fn compile_json(src: &str, cfg: &CompilerConfig) -> anyhow::Result<Compiled> {
    let doc = Document::from_json(src).context("Failed to load document")?;
    Ok(compile(&doc, cfg))
}
