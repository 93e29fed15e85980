use std::collections::BTreeSet;

use docscript_core::diag::{DiagCode, Diagnostic, Diagnostics};
use rustc_hash::FxHashSet;

use super::state::Snapshot;
use crate::config::{CodegenConfig, ReentrantShow};
use crate::ir::{CharId, Inst, Program, Scene};

/// Per-function walking context. Characters whose state became unknown stop
/// producing state-consistency diagnostics until the function ends.
pub(super) struct Walker<'p> {
    program: &'p Program,
    cfg: &'p CodegenConfig,
    scenes: &'p mut Vec<Scene>,
    placeholders: &'p mut BTreeSet<(CharId, Vec<String>)>,
    diags: &'p mut Diagnostics,
    unknown: FxHashSet<CharId>,
}

impl<'p> Walker<'p> {
    pub fn new(
        program: &'p Program,
        cfg: &'p CodegenConfig,
        scenes: &'p mut Vec<Scene>,
        placeholders: &'p mut BTreeSet<(CharId, Vec<String>)>,
        diags: &'p mut Diagnostics,
    ) -> Self {
        Walker { program, cfg, scenes, placeholders, diags, unknown: FxHashSet::default() }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn report(&mut self, d: Diagnostic) {
        self.diags.push(d);
    }

    fn state_error(&mut self, id: CharId, reason: &str, inst: &Inst) {
        if self.unknown.contains(&id) {
            return;
        }
        let program = self.program;
        let name = &program.character(id).name;
        self.diags.push(
            DiagCode::CharacterStateError.builder().param("name", name).param("reason", reason).at(inst.loc()).build(),
        );
    }

    /// Updates `snap` for one instruction and returns what to emit, if
    /// anything.
    pub fn walk_inst(&mut self, snap: &mut Snapshot, inst: &Inst) -> Option<Inst> {
        log::trace!("walk_inst: {:?}", inst);
        match inst {
            Inst::Say { speaker: Some(id), status, content, loc } if !status.is_empty() => {
                let program = self.program;
                let tree = &program.character(*id).sprites;
                let cur = snap.get(*id);
                let mut attrs = Vec::new();
                // tags outside the sprite tree are plain annotations
                if let Some(path) = tree.resolve(&cur.path, status).filter(|p| *p != cur.path) {
                    if cur.shown {
                        attrs = path.clone();
                    }
                    snap.set_path(*id, path);
                }
                Some(Inst::Say { speaker: Some(*id), status: attrs, content: content.clone(), loc: *loc })
            }
            Inst::Say { speaker, content, loc, .. } => {
                Some(Inst::Say { speaker: *speaker, status: Vec::new(), content: content.clone(), loc: *loc })
            }
            Inst::Show { character, tags, loc } => self.show(snap, *character, tags, inst).map(|path| Inst::Show {
                character: *character,
                tags: path,
                loc: *loc,
            }),
            Inst::Hide { character, .. } => {
                if !snap.is_shown(*character) {
                    self.state_error(*character, "hidden while not on screen", inst);
                    return None;
                }
                snap.hide(*character);
                Some(inst.clone())
            }
            Inst::SetScene { scene, loc } => {
                if !self.scenes.iter().any(|s| &s.name == scene) {
                    self.diags.push(DiagCode::SceneNotFound.builder().param("name", scene).at(*loc).build());
                    self.scenes.push(Scene { name: scene.clone(), background: None });
                }
                snap.set_scene(scene);
                Some(inst.clone())
            }
            Inst::ClearScene { .. } => {
                snap.clear_scene();
                Some(inst.clone())
            }
            Inst::SetState { character, tags, loc } => {
                let path = self.resolve(snap, *character, tags, inst);
                let cur = snap.get(*character);
                if !cur.shown {
                    snap.set_path(*character, path);
                    return None;
                }
                if path == cur.path {
                    return None;
                }
                self.place(snap, *character, path.clone());
                Some(Inst::Show { character: *character, tags: path, loc: *loc })
            }
            _ => Some(inst.clone()),
        }
    }

    /// Returns the full state path to show, or `None` to skip the Show.
    fn show(&mut self, snap: &mut Snapshot, id: CharId, tags: &[String], inst: &Inst) -> Option<Vec<String>> {
        let path = self.resolve(snap, id, tags, inst);
        let cur = snap.get(id);
        if cur.shown {
            match self.cfg.reentrant_show {
                ReentrantShow::UpdateState if path != cur.path => {}
                ReentrantShow::UpdateState => return None,
                ReentrantShow::Reject => {
                    self.state_error(id, "shown while already on screen", inst);
                    return None;
                }
            }
        }
        self.place(snap, id, path.clone());
        Some(path)
    }

    /// Full state path for `tags` applied to the current state. Tags that do
    /// not resolve are kept as written and make the state unknown.
    fn resolve(&mut self, snap: &Snapshot, id: CharId, tags: &[String], inst: &Inst) -> Vec<String> {
        let program = self.program;
        let ch = program.character(id);
        let cur = snap.get(id);
        let resolved = if ch.sprites.is_empty() && tags.is_empty() {
            Some(Vec::new())
        } else {
            ch.sprites.resolve(&cur.path, tags)
        };
        match resolved {
            Some(p) => p,
            None => {
                self.diags.push(
                    DiagCode::CharacterStateEmpty
                        .builder()
                        .param("name", &ch.name)
                        .param("state", tags.join(" "))
                        .at(inst.loc())
                        .build(),
                );
                self.unknown.insert(id);
                tags.to_vec()
            }
        }
    }

    fn place(&mut self, snap: &mut Snapshot, id: CharId, path: Vec<String>) {
        if !self.program.character(id).sprites.is_complete(&path) {
            self.placeholders.insert((id, path.clone()));
        }
        snap.show(id, path);
    }
}
