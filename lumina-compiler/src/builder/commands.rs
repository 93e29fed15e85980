//! Command vocabulary and argument access helpers.

use docscript_core::ast::{ArgValue, CommandNode, NormalizedBlock};
use docscript_core::diag::{DiagCode, Diagnostic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Function,
    Label,
    Jump,
    Call,
    Return,
    Branch,
    Character,
    Sprite,
    Scene,
    SwitchScene,
    Show,
    Hide,
    SetState,
    Play,
    Comment,
    SayMode,
}

impl CommandKind {
    pub const ALL: &'static [CommandKind] = &[
        CommandKind::Function,
        CommandKind::Label,
        CommandKind::Jump,
        CommandKind::Call,
        CommandKind::Return,
        CommandKind::Branch,
        CommandKind::Character,
        CommandKind::Sprite,
        CommandKind::Scene,
        CommandKind::SwitchScene,
        CommandKind::Show,
        CommandKind::Hide,
        CommandKind::SetState,
        CommandKind::Play,
        CommandKind::Comment,
        CommandKind::SayMode,
    ];

    /// English name and Chinese alias.
    pub fn names(self) -> (&'static str, &'static str) {
        match self {
            CommandKind::Function => ("Function", "函数"),
            CommandKind::Label => ("Label", "标签"),
            CommandKind::Jump => ("Jump", "跳转"),
            CommandKind::Call => ("Call", "调用"),
            CommandKind::Return => ("Return", "返回"),
            CommandKind::Branch => ("Branch", "选项"),
            CommandKind::Character => ("Character", "角色"),
            CommandKind::Sprite => ("Sprite", "立绘"),
            CommandKind::Scene => ("Scene", "场景"),
            CommandKind::SwitchScene => ("SwitchScene", "切换场景"),
            CommandKind::Show => ("Show", "显示"),
            CommandKind::Hide => ("Hide", "隐藏"),
            CommandKind::SetState => ("SetState", "状态"),
            CommandKind::Play => ("Play", "播放"),
            CommandKind::Comment => ("Comment", "注释"),
            CommandKind::SayMode => ("SayMode", "发言模式"),
        }
    }

    pub fn lookup(name: &str) -> Option<CommandKind> {
        Self::ALL.iter().copied().find(|k| {
            let (en, zh) = k.names();
            en.eq_ignore_ascii_case(name) || zh == name
        })
    }

    /// Declarations run in their own stage before any code is built.
    pub fn is_declaration(self) -> bool {
        matches!(self, CommandKind::Character | CommandKind::Sprite | CommandKind::Scene)
    }
}

/// Keyword spellings accepted for one argument.
pub mod keys {
    pub const ALIAS: &[&str] = &["alias", "别名"];
    pub const NAME_COLOR: &[&str] = &["namecolor", "名字颜色"];
    pub const COLOR: &[&str] = &["color", "颜色"];
    pub const STATE: &[&str] = &["state", "状态"];
    pub const IMAGE: &[&str] = &["image", "图片"];
    pub const BACKGROUND: &[&str] = &["background", "背景"];
    pub const CHANNEL: &[&str] = &["channel", "通道"];
    pub const SPEAKER: &[&str] = &["speaker", "发言者"];
    pub const SPEAKERS: &[&str] = &["speakers", "发言者列表"];
}

pub fn missing(node: &CommandNode, arg: &str) -> Diagnostic {
    DiagCode::CommandMissingArgument.builder().param("name", &node.name).param("arg", arg).at(node.loc).build()
}

pub fn invalid(node: &CommandNode, arg: &str, value: impl std::fmt::Display) -> Diagnostic {
    DiagCode::CommandInvalidArgument
        .builder()
        .param("name", &node.name)
        .param("arg", arg)
        .param("value", value)
        .at(node.loc)
        .build()
}

/// The positional argument as text, required.
pub fn positional_text(node: &CommandNode, arg: &str) -> Result<String, Diagnostic> {
    match node.positional.as_ref() {
        Some(ArgValue::Text(s)) | Some(ArgValue::Quoted(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(ArgValue::Call(call)) => Ok(call.name.clone()),
        Some(other) => Err(invalid(node, arg, other)),
        None => Err(missing(node, arg)),
    }
}

/// A path-like value: text as written, or the media path an element marker
/// points at.
pub fn asset_value(value: &ArgValue, block: &NormalizedBlock) -> Option<String> {
    match value {
        ArgValue::Text(s) | ArgValue::Quoted(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        ArgValue::Element(i) => block.media.get(*i).map(|m| m.path.clone()),
        ArgValue::Call(_) => None,
    }
}

/// Splits a list written inside one argument (`A、B`, `"A, B"`, `A|B`).
pub fn split_list(s: &str) -> Vec<String> {
    s.split(|c: char| docscript_core::lexer::is_list_comma(c) || c == '|' || c == '/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn split_tags(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// State tags written as `Name(tags)`, followed by those of `state=`.
pub fn state_tags(node: &CommandNode) -> Vec<String> {
    let mut tags = Vec::new();
    if let Some(call) = node.positional.as_ref().and_then(ArgValue::as_call) {
        tags.extend(call.positional_text().map(split_tags).unwrap_or_default());
    }
    if let Some(state) = node.kwarg_any(keys::STATE).and_then(ArgValue::as_text) {
        tags.extend(split_tags(state));
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_accepts_alias_and_case() {
        assert_eq!(CommandKind::lookup("show"), Some(CommandKind::Show));
        assert_eq!(CommandKind::lookup("切换场景"), Some(CommandKind::SwitchScene));
        assert_eq!(CommandKind::lookup("dance"), None);
        assert_eq!(CommandKind::lookup("状态"), Some(CommandKind::SetState));
        assert!(CommandKind::Sprite.is_declaration());
    }

    #[test]
    fn list_splitting() {
        assert_eq!(split_list("Alice、Bob | Carol"), vec!["Alice", "Bob", "Carol"]);
        assert!(split_list(" , ").is_empty());
    }
}
