//! CFG construction and validation.
//!
//! A function's op stream is cut into basic blocks at the entry, at every
//! label and after every terminator. Jump and Branch targets are resolved
//! here; anything that cannot be resolved is reported and the edge dropped,
//! so the result always satisfies [`validate`].

use docscript_core::ast::Loc;
use docscript_core::diag::{DiagCode, Diagnostic, Diagnostics};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::{ArmTarget, Block, BranchArm, FuncId, Function, Inst, Op, RawFunction, SymbolTable, Terminator};

enum Target {
    Label(String),
    Function(FuncId),
}

enum Exit {
    Jump(Target),
    Call(FuncId),
    Branch(Vec<(String, Target)>),
    Return,
}

struct Part {
    label: Option<String>,
    insts: Vec<Inst>,
    exit: Exit,
}

struct Cutter<'a> {
    raw: &'a RawFunction,
    symbols: &'a SymbolTable,
    local: FxHashSet<&'a str>,
    diags: &'a mut Diagnostics,
}

impl<'a> Cutter<'a> {
    fn resolve(&mut self, target: &str, loc: Loc) -> Option<Target> {
        if self.local.contains(target) {
            return Some(Target::Label(target.to_string()));
        }
        if let Some(id) = self.symbols.functions.get(target) {
            return Some(Target::Function(*id));
        }
        let diag = match self.symbols.label_owner.get(target) {
            Some(owner) => DiagCode::LabelCrossFunction.builder().param("owner", owner),
            None => DiagCode::LabelNotFound.builder(),
        };
        self.diags.push(diag.param("name", target).param("function", &self.raw.name).at(loc).build());
        None
    }

    fn cut(&mut self) -> Vec<Part> {
        let raw = self.raw;
        let mut last_decl: FxHashMap<&str, usize> = FxHashMap::default();
        for (i, op) in raw.ops.iter().enumerate() {
            if let Op::Label { name, .. } = op {
                last_decl.insert(name, i);
            }
        }
        self.local = last_decl.keys().copied().collect();

        let mut parts = Vec::new();
        let mut open: Option<(Option<String>, Vec<Inst>)> = Some((None, Vec::new()));

        for (i, op) in raw.ops.iter().enumerate() {
            if let Op::Label { name, loc } = op {
                if last_decl.get(name.as_str()) != Some(&i) {
                    self.diags.push(
                        DiagCode::LabelDuplicate
                            .builder()
                            .param("name", name)
                            .param("function", &raw.name)
                            .at(*loc)
                            .build(),
                    );
                    continue;
                }
                // an open block falls through into the new label
                if let Some((label, insts)) = open.take() {
                    parts.push(Part { label, insts, exit: Exit::Jump(Target::Label(name.clone())) });
                }
                open = Some((Some(name.clone()), Vec::new()));
                continue;
            }

            let Some((_, insts)) = open.as_mut() else {
                self.diags.push(
                    DiagCode::UnhandledNodeInTerminatedBlock
                        .builder()
                        .param("node", op.describe())
                        .at(op.loc())
                        .build(),
                );
                continue;
            };

            let exit = match op {
                Op::Inst(inst) => {
                    insts.push(inst.clone());
                    continue;
                }
                Op::Jump { target, loc } => match self.resolve(target, *loc) {
                    Some(t) => Exit::Jump(t),
                    None => Exit::Return,
                },
                Op::Call { target, loc } => match self.symbols.functions.get(target.as_str()) {
                    Some(id) => Exit::Call(*id),
                    None => {
                        self.diags.push(DiagCode::FunctionNotFound.builder().param("name", target).at(*loc).build());
                        continue;
                    }
                },
                Op::Branch { arms, .. } => {
                    let loc = op.loc();
                    let arms: Vec<_> = arms
                        .iter()
                        .filter_map(|(text, target)| self.resolve(target, loc).map(|t| (text.clone(), t)))
                        .collect();
                    if arms.is_empty() { Exit::Return } else { Exit::Branch(arms) }
                }
                Op::Return { .. } => Exit::Return,
                Op::Label { .. } => continue,
            };

            let falls_through = matches!(exit, Exit::Call(_));
            if let Some((label, insts)) = open.take() {
                parts.push(Part { label, insts, exit });
            }
            if falls_through {
                open = Some((None, Vec::new()));
            }
        }

        if let Some((label, insts)) = open {
            parts.push(Part { label, insts, exit: Exit::Return });
        }
        parts
    }
}

/// Cuts one function into blocks.
pub fn build(raw: &RawFunction, symbols: &SymbolTable, diags: &mut Diagnostics) -> Function {
    let mut cutter = Cutter { raw, symbols, local: FxHashSet::default(), diags };
    let parts = cutter.cut();

    let index: FxHashMap<String, usize> = parts
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.label.clone().map(|l| (l, i)))
        .collect();
    let block_of = |t: &Target| -> ArmTarget {
        match t {
            Target::Label(l) => ArmTarget::Block(index.get(l).copied().unwrap_or_default()),
            Target::Function(f) => ArmTarget::Function(*f),
        }
    };

    let blocks = parts
        .into_iter()
        .map(|p| {
            let term = match &p.exit {
                Exit::Jump(t) => match block_of(t) {
                    ArmTarget::Block(b) => Terminator::JumpToLabel(b),
                    ArmTarget::Function(f) => Terminator::JumpToFunction(f),
                },
                Exit::Call(f) => Terminator::CallFunction(*f),
                Exit::Branch(arms) => Terminator::Branch(
                    arms.iter().map(|(text, t)| BranchArm { text: text.clone(), target: block_of(t) }).collect(),
                ),
                Exit::Return => Terminator::Return,
            };
            Block { label: p.label, insts: p.insts, term }
        })
        .collect();

    Function { name: raw.name.clone(), blocks, loc: raw.loc }
}

/// Re-checks the block invariants of a built function.
pub fn validate(f: &Function) -> Vec<Diagnostic> {
    let mut problems = Vec::new();
    if f.blocks.is_empty() {
        problems.push("function has no entry block".to_string());
    }
    let mut seen = FxHashSet::default();
    for (i, b) in f.blocks.iter().enumerate() {
        if let Some(l) = &b.label {
            if !seen.insert(l.as_str()) {
                problems.push(format!("label '{}' names more than one block", l));
            }
        }
        let targets: Vec<usize> = match &b.term {
            Terminator::JumpToLabel(t) => vec![*t],
            Terminator::Branch(arms) => {
                if arms.is_empty() {
                    problems.push(format!("block {} branches with no arms", i));
                }
                b.term.successors(i + 1)
            }
            Terminator::CallFunction(_) => {
                if i + 1 >= f.blocks.len() {
                    problems.push(format!("block {} calls without a continuation block", i));
                }
                Vec::new()
            }
            _ => Vec::new(),
        };
        for t in targets {
            match f.blocks.get(t) {
                Some(target) if target.label.is_some() => {}
                _ => problems.push(format!("block {} targets block {} which is not a local label", i, t)),
            }
        }
    }
    problems
        .into_iter()
        .map(|reason| {
            DiagCode::CfgInvalid.builder().param("function", &f.name).param("reason", reason).at(f.loc).build()
        })
        .collect()
}

/// Builds every function of a document against a shared symbol table.
pub fn build_all(raws: &[RawFunction], diags: &mut Diagnostics) -> Vec<Function> {
    let mut symbols = SymbolTable::default();
    for (i, raw) in raws.iter().enumerate() {
        symbols.functions.entry(raw.name.clone()).or_insert(FuncId(i));
        for op in &raw.ops {
            if let Op::Label { name, .. } = op {
                symbols.label_owner.entry(name.clone()).or_insert_with(|| raw.name.clone());
            }
        }
    }

    let functions: Vec<Function> = raws
        .iter()
        .map(|raw| {
            let f = build(raw, &symbols, diags);
            diags.extend(validate(&f));
            log::debug!("function '{}': {} blocks", f.name, f.blocks.len());
            f
        })
        .collect();
    log::info!("Built CFGs for {} functions", functions.len());
    functions
}
