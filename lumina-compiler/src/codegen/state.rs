//! Simulated runtime display state.

use std::collections::BTreeMap;

use docscript_core::ast::Loc;

use crate::ir::{CharId, Inst, Program};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presence {
    pub path: Vec<String>,
    pub shown: bool,
}

/// Scene plus per-character presence. Characters are kept in id order, which
/// is declaration order; diffs walk them in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub scene: Option<String>,
    pub characters: BTreeMap<CharId, Presence>,
}

impl Snapshot {
    /// No scene; every character off screen at its default state.
    pub fn initial(program: &Program) -> Self {
        let characters = program
            .characters
            .iter()
            .enumerate()
            .map(|(i, c)| (CharId(i), Presence { path: c.sprites.default_path(), shown: false }))
            .collect();
        Snapshot { scene: None, characters }
    }

    pub fn get(&self, id: CharId) -> Presence {
        self.characters.get(&id).cloned().unwrap_or_default()
    }

    pub fn is_shown(&self, id: CharId) -> bool {
        self.characters.get(&id).is_some_and(|p| p.shown)
    }

    pub fn show(&mut self, id: CharId, path: Vec<String>) {
        let p = self.characters.entry(id).or_default();
        p.path = path;
        p.shown = true;
    }

    pub fn hide(&mut self, id: CharId) {
        self.characters.entry(id).or_default().shown = false;
    }

    pub fn set_path(&mut self, id: CharId, path: Vec<String>) {
        self.characters.entry(id).or_default().path = path;
    }

    /// A scene change clears the stage.
    pub fn set_scene(&mut self, scene: &str) {
        self.scene = Some(scene.to_string());
        self.clear_stage();
    }

    pub fn clear_scene(&mut self) {
        self.scene = None;
        self.clear_stage();
    }

    fn clear_stage(&mut self) {
        for p in self.characters.values_mut() {
            p.shown = false;
        }
    }
}

/// Instructions that turn the on-screen part of `other` into
/// `authoritative`. Off-screen state differences need no instruction.
pub fn diff(authoritative: &Snapshot, other: &Snapshot) -> Vec<Inst> {
    let loc = Loc::default();
    let mut out = Vec::new();
    let mut cur = other.clone();
    if authoritative.scene != other.scene {
        match &authoritative.scene {
            Some(scene) => {
                out.push(Inst::SetScene { scene: scene.clone(), loc });
                cur.set_scene(scene);
            }
            None => {
                out.push(Inst::ClearScene { loc });
                cur.clear_scene();
            }
        }
    }
    for (&id, want) in &authoritative.characters {
        let have = cur.get(id);
        match (want.shown, have.shown) {
            (true, false) => out.push(Inst::Show { character: id, tags: want.path.clone(), loc }),
            (false, true) => out.push(Inst::Hide { character: id, loc }),
            (true, true) if want.path != have.path => {
                out.push(Inst::Show { character: id, tags: want.path.clone(), loc })
            }
            _ => {}
        }
    }
    for (&id, have) in &cur.characters {
        if have.shown && !authoritative.characters.contains_key(&id) {
            out.push(Inst::Hide { character: id, loc });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn diff_of_equal_snapshots_is_empty() {
        let mut a = Snapshot::default();
        a.show(CharId(0), path("casual smile"));
        a.set_path(CharId(1), path("x"));
        assert!(diff(&a, &a.clone()).is_empty());
    }

    #[test]
    fn scene_change_comes_first_and_reshows() {
        let mut auth = Snapshot::default();
        auth.set_scene("park");
        auth.show(CharId(1), path("casual"));
        let mut other = Snapshot::default();
        other.set_scene("street");
        other.show(CharId(0), path("a"));
        other.show(CharId(1), path("casual"));

        let patch = diff(&auth, &other);
        assert!(matches!(&patch[0], Inst::SetScene { scene, .. } if scene == "park"));
        assert!(matches!(&patch[1], Inst::Show { character: CharId(1), .. }));
        assert_eq!(patch.len(), 2);
    }

    #[test]
    fn off_screen_paths_are_not_patched() {
        let mut auth = Snapshot::default();
        auth.set_path(CharId(0), path("angry"));
        let mut other = Snapshot::default();
        other.set_path(CharId(0), path("smile"));
        assert!(diff(&auth, &other).is_empty());

        other.show(CharId(0), path("smile"));
        assert!(matches!(diff(&auth, &other).as_slice(), [Inst::Hide { character: CharId(0), .. }]));
    }

    #[test]
    fn missing_scene_is_cleared() {
        let mut auth = Snapshot::default();
        auth.show(CharId(0), path("casual"));
        let mut other = Snapshot::default();
        other.set_scene("park");
        other.show(CharId(0), path("casual"));

        let patch = diff(&auth, &other);
        assert!(matches!(&patch[0], Inst::ClearScene { .. }));
        assert!(matches!(&patch[1], Inst::Show { character: CharId(0), .. }));
        assert_eq!(patch.len(), 2);
    }
}
