//! State-merge code generation.
//!
//! Each function is walked once in block order with a simulated
//! [`Snapshot`]. A block is entered with the exit state of its lowest-index
//! predecessor that was already walked. When traversal is done, every other
//! incoming edge gets a patch (see [`state::diff`]) that brings its exit state
//! in line with that entry state. The result is handed to an emitter.

pub mod dump;
pub mod renpy;
pub mod state;
mod walk;

use std::collections::BTreeSet;

use docscript_core::diag::{DiagCode, Diagnostic, Diagnostics};

use crate::config::CodegenConfig;
use crate::ir::{CharId, Function, Inst, Program, Scene, Terminator};
pub use state::{diff, Snapshot};
use walk::Walker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenBlock {
    pub label: Option<String>,
    pub body: Vec<Inst>,
    /// Compensation appended before a single-successor exit.
    pub patch: Vec<Inst>,
    pub term: Terminator,
    /// Compensation per Branch arm, aligned with the arms.
    pub arm_patches: Vec<Vec<Inst>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenFunction {
    pub name: String,
    pub blocks: Vec<GenBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub functions: Vec<GenFunction>,
    /// Declared scenes followed by the ones created for unknown references.
    pub scenes: Vec<Scene>,
    /// Shown states that have no image in the character's tree.
    pub placeholders: BTreeSet<(CharId, Vec<String>)>,
    pub diagnostics: Vec<Diagnostic>,
}

fn block_name(f: &Function, i: usize) -> String {
    match &f.blocks[i].label {
        Some(l) => format!("{}.{}", f.name, l),
        None => format!("{}#{}", f.name, i),
    }
}

/// Generates every function of `program`. Pure: the same program always
/// produces the same result.
pub fn generate(program: &Program, cfg: &CodegenConfig) -> Generated {
    let mut diags = Diagnostics::new();
    let mut scenes = program.scenes.clone();
    let mut placeholders = BTreeSet::new();
    let mut functions = Vec::with_capacity(program.functions.len());

    for f in &program.functions {
        let mut walker = Walker::new(program, cfg, &mut scenes, &mut placeholders, &mut diags);
        functions.push(generate_function(f, &mut walker));
    }

    log::info!("Generated {} functions, {} diagnostics", functions.len(), diags.len());
    Generated { functions, scenes, placeholders, diagnostics: diags.into_vec() }
}

fn generate_function(f: &Function, walker: &mut Walker<'_>) -> GenFunction {
    let preds = f.predecessors();
    let initial = Snapshot::initial(walker.program());
    let mut entry: Vec<Snapshot> = Vec::with_capacity(f.blocks.len());
    let mut exit: Vec<Snapshot> = Vec::with_capacity(f.blocks.len());
    let mut blocks = Vec::with_capacity(f.blocks.len());

    for (i, block) in f.blocks.iter().enumerate() {
        let start = match preds[i].iter().map(|(p, _)| *p).filter(|p| *p < i).min() {
            Some(p) => exit[p].clone(),
            None if i == 0 => initial.clone(),
            None => exit[i - 1].clone(),
        };
        let mut snap = start.clone();
        let body = block.insts.iter().filter_map(|inst| walker.walk_inst(&mut snap, inst)).collect();
        entry.push(start);
        exit.push(snap);

        let arms = match &block.term {
            Terminator::Branch(arms) => arms.len(),
            _ => 0,
        };
        blocks.push(GenBlock {
            label: block.label.clone(),
            body,
            patch: Vec::new(),
            term: block.term.clone(),
            arm_patches: vec![Vec::new(); arms],
        });
    }

    // patches are computed after the walk, never interleaved with it
    for (b, incoming) in preds.iter().enumerate() {
        for &(p, arm) in incoming {
            let patch = diff(&entry[b], &exit[p]);
            if patch.is_empty() {
                continue;
            }
            log::debug!("edge {} -> {}: {} compensating instruction(s)", p, b, patch.len());
            walker.report(
                DiagCode::StateMergeCompensated
                    .builder()
                    .param("count", patch.len())
                    .param("from", block_name(f, p))
                    .param("to", block_name(f, b))
                    .at(f.loc)
                    .build(),
            );
            match arm {
                Some(k) => blocks[p].arm_patches[k].extend(patch),
                None => blocks[p].patch.extend(patch),
            }
        }
    }

    GenFunction { name: f.name.clone(), blocks }
}
