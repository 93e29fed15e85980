//! Intermediate representation: declarations plus per-function CFGs.

pub mod inst;
pub mod sprite;

use docscript_core::ast::Color;
use rustc_hash::FxHashMap;
use serde::Serialize;

pub use inst::{ArmTarget, AudioChannel, Block, BranchArm, Function, Inst, Op, RawFunction, Terminator};
pub use sprite::{AssetRef, SpriteTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CharId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub aliases: Vec<String>,
    pub name_color: Option<Color>,
    pub content_color: Option<Color>,
    pub sprites: SpriteTree,
    /// Created by a reference rather than a declaration.
    pub implicit: bool,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Character {
            name: name.into(),
            aliases: Vec::new(),
            name_color: None,
            content_color: None,
            sprites: SpriteTree::new(),
            implicit: false,
        }
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub name: String,
    pub background: Option<AssetRef>,
}

/// Image shown by a display paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayImage {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub title: String,
    pub characters: Vec<Character>,
    pub scenes: Vec<Scene>,
    pub images: Vec<DisplayImage>,
    pub functions: Vec<Function>,
}

impl Program {
    pub fn character(&self, id: CharId) -> &Character {
        &self.characters[id.0]
    }

    pub fn find_character(&self, name: &str) -> Option<CharId> {
        self.characters.iter().position(|c| c.answers_to(name)).map(CharId)
    }

    pub fn find_scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.functions.iter().position(|f| f.name == name).map(FuncId)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0]
    }
}

/// Name → id tables used while building.
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub functions: FxHashMap<String, FuncId>,
    /// Label name → first function declaring it.
    pub label_owner: FxHashMap<String, String>,
}
