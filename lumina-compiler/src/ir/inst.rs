use docscript_core::ast::{Loc, StyledText};
use serde::{Deserialize, Serialize};

use super::{CharId, FuncId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioChannel {
    #[default]
    Music,
    Sound,
    Voice,
}

impl AudioChannel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "music" | "bgm" | "音乐" => Some(AudioChannel::Music),
            "sound" | "sfx" | "音效" => Some(AudioChannel::Sound),
            "voice" | "语音" => Some(AudioChannel::Voice),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudioChannel::Music => "music",
            AudioChannel::Sound => "sound",
            AudioChannel::Voice => "voice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    Say {
        speaker: Option<CharId>,
        status: Vec<String>,
        content: StyledText,
        loc: Loc,
    },
    /// Before generation `tags` are the tags as written; the generator
    /// replaces them with the resolved full state path.
    Show {
        character: CharId,
        tags: Vec<String>,
        loc: Loc,
    },
    Hide {
        character: CharId,
        loc: Loc,
    },
    /// Changes a character's state. On screen it becomes a Show of the new
    /// state; off screen it only updates the remembered state.
    SetState {
        character: CharId,
        tags: Vec<String>,
        loc: Loc,
    },
    SetScene {
        scene: String,
        loc: Loc,
    },
    /// Empties the stage and drops the background.
    ClearScene {
        loc: Loc,
    },
    /// A display paragraph; `image` names an entry of `Program::images`.
    ShowImage {
        image: String,
        loc: Loc,
    },
    Play {
        channel: AudioChannel,
        asset: String,
        loc: Loc,
    },
    Passthrough {
        text: String,
        loc: Loc,
    },
    Comment {
        text: String,
        loc: Loc,
    },
}

impl Inst {
    pub fn loc(&self) -> Loc {
        match self {
            Inst::Say { loc, .. }
            | Inst::Show { loc, .. }
            | Inst::Hide { loc, .. }
            | Inst::SetState { loc, .. }
            | Inst::SetScene { loc, .. }
            | Inst::ClearScene { loc }
            | Inst::ShowImage { loc, .. }
            | Inst::Play { loc, .. }
            | Inst::Passthrough { loc, .. }
            | Inst::Comment { loc, .. } => *loc,
        }
    }

    /// Short name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Inst::Say { .. } => "say",
            Inst::Show { .. } => "show",
            Inst::Hide { .. } => "hide",
            Inst::SetState { .. } => "state",
            Inst::SetScene { .. } | Inst::ClearScene { .. } => "scene",
            Inst::ShowImage { .. } => "display",
            Inst::Play { .. } => "play",
            Inst::Passthrough { .. } => "passthrough",
            Inst::Comment { .. } => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmTarget {
    Block(usize),
    Function(FuncId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchArm {
    pub text: String,
    pub target: ArmTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    JumpToFunction(FuncId),
    /// Returns into the next block.
    CallFunction(FuncId),
    JumpToLabel(usize),
    Branch(Vec<BranchArm>),
    Return,
}

impl Terminator {
    /// Local successors in arm order. A call continues in `next`.
    pub fn successors(&self, next: usize) -> Vec<usize> {
        match self {
            Terminator::CallFunction(_) => vec![next],
            Terminator::JumpToLabel(t) => vec![*t],
            Terminator::Branch(arms) => arms
                .iter()
                .filter_map(|a| match a.target {
                    ArmTarget::Block(b) => Some(b),
                    ArmTarget::Function(_) => None,
                })
                .collect(),
            Terminator::JumpToFunction(_) | Terminator::Return => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label: Option<String>,
    pub insts: Vec<Inst>,
    pub term: Terminator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub blocks: Vec<Block>,
    pub loc: Loc,
}

impl Function {
    pub fn label_block(&self, name: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.label.as_deref() == Some(name))
    }

    /// Predecessor edges of every block: `(from, arm)` where `arm` is the
    /// Branch arm index, in block order then arm order.
    pub fn predecessors(&self) -> Vec<Vec<(usize, Option<usize>)>> {
        let mut preds = vec![Vec::new(); self.blocks.len()];
        for (i, b) in self.blocks.iter().enumerate() {
            match &b.term {
                Terminator::Branch(arms) => {
                    for (k, arm) in arms.iter().enumerate() {
                        if let ArmTarget::Block(t) = arm.target {
                            if let Some(p) = preds.get_mut(t) {
                                p.push((i, Some(k)));
                            }
                        }
                    }
                }
                term => {
                    for t in term.successors(i + 1) {
                        if let Some(p) = preds.get_mut(t) {
                            p.push((i, None));
                        }
                    }
                }
            }
        }
        preds
    }
}

/// Builder output for one function before it is cut into blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Inst(Inst),
    Label { name: String, loc: Loc },
    Jump { target: String, loc: Loc },
    Call { target: String, loc: Loc },
    Branch { arms: Vec<(String, String)>, loc: Loc },
    Return { loc: Loc },
}

impl Op {
    pub fn loc(&self) -> Loc {
        match self {
            Op::Inst(i) => i.loc(),
            Op::Label { loc, .. }
            | Op::Jump { loc, .. }
            | Op::Call { loc, .. }
            | Op::Branch { loc, .. }
            | Op::Return { loc } => *loc,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Op::Inst(i) => i.kind_name().to_string(),
            Op::Label { name, .. } => format!("label {}", name),
            Op::Jump { target, .. } => format!("jump {}", target),
            Op::Call { target, .. } => format!("call {}", target),
            Op::Branch { .. } => "branch".to_string(),
            Op::Return { .. } => "return".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFunction {
    pub name: String,
    pub ops: Vec<Op>,
    pub loc: Loc,
}
