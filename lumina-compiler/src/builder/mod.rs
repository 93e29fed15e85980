//! IR builder.
//!
//! Runs in three steps over the scanned document:
//! 1. a default-function step that synthesizes a function from the title
//!    when the document declares none,
//! 2. a declaration stage (characters, sprites, scenes) over the whole
//!    document, so a reference resolves no matter where it is written,
//! 3. the code stage, which turns the remaining lines into per-function op
//!    streams for the CFG constructor.

pub mod commands;
pub mod say;

use docscript_core::ast::{
    ArgValue, Attachment, CommandNode, Document, Line, Loc, MediaKind, NormalizedBlock, SayNode, StyledText,
    ELEMENT_MARKER,
};
use docscript_core::diag::{DiagCode, Diagnostics};
use docscript_core::lexer::is_say_separator;
use docscript_core::scanner::{scan_line, ScanConfig};

use crate::config::FrontendConfig;
use crate::ident::Namer;
use crate::ir::{
    AssetRef, AudioChannel, CharId, Character, DisplayImage, Inst, Op, Program, RawFunction, Scene,
};
use commands::{asset_value, invalid, keys, missing, positional_text, split_list, split_tags, state_tags, CommandKind};
use say::{SayMode, Speakers};

#[derive(Debug, Clone)]
enum Item {
    Commands(Vec<CommandNode>),
    Say(SayNode),
    Narration,
    Passthrough,
    Display,
}

#[derive(Debug, Clone)]
struct Scanned {
    block: usize,
    item: Item,
}

/// Result of the builder: declarations plus one op stream per function.
#[derive(Debug, Clone, Default)]
pub struct Built {
    pub program: Program,
    pub raw_functions: Vec<RawFunction>,
}

pub struct Builder<'a> {
    doc: &'a Document,
    cfg: &'a FrontendConfig,
    program: Program,
    raws: Vec<RawFunction>,
    current: Option<usize>,
    speakers: Speakers,
    image_ids: Namer,
    diags: &'a mut Diagnostics,
}

impl<'a> Builder<'a> {
    pub fn new(doc: &'a Document, cfg: &'a FrontendConfig, diags: &'a mut Diagnostics) -> Self {
        Builder {
            doc,
            cfg,
            program: Program { title: doc.title.clone(), ..Default::default() },
            raws: Vec::new(),
            current: None,
            speakers: Speakers::default(),
            image_ids: Namer::new(),
            diags,
        }
    }

    pub fn build(mut self) -> Built {
        log::info!("Building IR for '{}' ({} blocks)", self.doc.title, self.doc.blocks.len());
        let items = self.scan();
        self.default_function(&items);
        self.declarations(&items);
        for s in &items {
            self.code(s);
        }
        log::info!(
            "IR built: {} characters, {} scenes, {} functions",
            self.program.characters.len(),
            self.program.scenes.len(),
            self.raws.len()
        );
        Built { program: self.program, raw_functions: self.raws }
    }

    fn block(&self, i: usize) -> &'a NormalizedBlock {
        &self.doc.blocks[i]
    }

    fn scan(&mut self) -> Vec<Scanned> {
        let scan_cfg = ScanConfig { max_name_chars: self.cfg.max_name_chars };
        let mut items: Vec<Scanned> = Vec::new();
        for (i, block) in self.doc.blocks.iter().enumerate() {
            if let Some(att) = &block.attachment {
                // a table or list belongs only to the command right before it
                match items.last_mut() {
                    Some(Scanned { item: Item::Commands(nodes), .. }) => {
                        if let Some(node) = nodes.last_mut().filter(|n| n.attachment.is_none()) {
                            node.attachment = Some(att.clone());
                            continue;
                        }
                        log::debug!("block {}: command already has an attachment, discarded", i);
                    }
                    _ => log::debug!("block {}: attachment without a preceding command, discarded", i),
                }
                continue;
            }
            if block.is_blank() {
                continue;
            }
            let item = if block.is_passthrough() {
                Item::Passthrough
            } else if block.is_display() {
                Item::Display
            } else {
                let r = scan_line(&block.plain(), i, &scan_cfg);
                self.diags.extend(r.diags);
                match r.line {
                    Line::Commands(nodes) => Item::Commands(nodes),
                    Line::Say(s) => Item::Say(s),
                    Line::Narration => Item::Narration,
                    Line::Blank => continue,
                }
            };
            items.push(Scanned { block: i, item });
        }
        items
    }

    fn enabled_commands<'s>(items: &'s [Scanned]) -> impl Iterator<Item = (usize, &'s CommandNode, CommandKind)> {
        items
            .iter()
            .filter_map(|s| match &s.item {
                Item::Commands(nodes) => Some(nodes.iter().map(move |n| (s.block, n))),
                _ => None,
            })
            .flatten()
            .filter(|(_, n)| !n.disabled)
            .filter_map(|(b, n)| CommandKind::lookup(&n.name).map(|k| (b, n, k)))
    }

    fn default_function(&mut self, items: &[Scanned]) {
        if Self::enabled_commands(items).any(|(_, _, k)| k == CommandKind::Function) {
            return;
        }
        let title = self.doc.title.trim();
        let name = if title.is_empty() { self.cfg.default_function_name.as_str() } else { title };
        log::debug!("no Function command, wrapping the document in '{}'", name);
        self.raws.push(RawFunction { name: name.to_string(), ops: Vec::new(), loc: Loc::block(0) });
        self.current = Some(0);
    }

    fn declarations(&mut self, items: &[Scanned]) {
        // characters first, sprites and scenes may refer to them
        for (_, node, kind) in Self::enabled_commands(items) {
            if kind == CommandKind::Character {
                self.declare_character(node);
            }
        }
        for (b, node, kind) in Self::enabled_commands(items) {
            match kind {
                CommandKind::Sprite => self.declare_sprite(node, self.block(b)),
                CommandKind::Scene => self.declare_scene(node, self.block(b)),
                _ => {}
            }
        }
    }

    /// Finds a character by name or alias, declaring it implicitly (and
    /// reporting `code`) when it does not exist yet.
    fn character(&mut self, name: &str, code: DiagCode, loc: Loc) -> CharId {
        if let Some(id) = self.program.find_character(name) {
            return id;
        }
        self.diags.push(code.builder().param("name", name).at(loc).build());
        let mut c = Character::new(name);
        c.implicit = true;
        self.program.characters.push(c);
        CharId(self.program.characters.len() - 1)
    }

    fn add_states(&mut self, id: CharId, attachment: Option<&Attachment>) {
        for (state, asset) in attachment.map(pairs).unwrap_or_default() {
            self.add_state(id, &state, (!asset.is_empty()).then_some(asset));
        }
    }

    fn add_state(&mut self, id: CharId, state: &str, asset: Option<String>) {
        let path = split_tags(state);
        if path.is_empty() {
            return;
        }
        let ch = &mut self.program.characters[id.0];
        let asset = asset.map(AssetRef::File).unwrap_or_else(|| AssetRef::Placeholder {
            text: format!("{} {}", ch.name, path.join(" ")),
        });
        ch.sprites.insert(&path, asset);
    }

    fn declare_character(&mut self, node: &CommandNode) {
        let name = match positional_text(node, "name") {
            Ok(n) => n,
            Err(d) => return self.diags.push(d),
        };
        let id = match self.program.find_character(&name) {
            Some(id) => {
                self.diags.push(DiagCode::CharacterDuplicate.builder().param("name", &name).at(node.loc).build());
                id
            }
            None => {
                let mut c = Character::new(&name);
                if let Some(a) = node.kwarg_any(keys::ALIAS).and_then(ArgValue::as_text) {
                    c.aliases = split_list(a);
                }
                c.name_color = self.color_arg(node, keys::NAME_COLOR);
                c.content_color = self.color_arg(node, keys::COLOR);
                self.program.characters.push(c);
                log::debug!("declared character '{}'", name);
                CharId(self.program.characters.len() - 1)
            }
        };
        self.add_states(id, node.attachment.as_ref());
    }

    fn color_arg(&mut self, node: &CommandNode, spellings: &[&str]) -> Option<docscript_core::ast::Color> {
        let v = node.kwarg_any(spellings)?;
        let color = v.as_text().and_then(docscript_core::ast::Color::parse);
        if color.is_none() {
            self.diags.push(invalid(node, spellings[0], v));
        }
        color
    }

    /// `[Sprite Alice, state=casual smile, image=...]` or
    /// `[Sprite Alice(casual smile), image=...]`, optionally with a table.
    fn declare_sprite(&mut self, node: &CommandNode, block: &NormalizedBlock) {
        let name = match positional_text(node, "character") {
            Ok(n) => n,
            Err(d) => return self.diags.push(d),
        };
        let id = self.character(&name, DiagCode::CharacterNameResolutionFailed, node.loc);
        let state = node
            .kwarg_any(keys::STATE)
            .and_then(ArgValue::as_text)
            .map(str::to_string)
            .or_else(|| node.positional.as_ref()?.as_call()?.positional_text().map(str::to_string));
        match state {
            Some(state) => {
                let asset = node.kwarg_any(keys::IMAGE).and_then(|v| asset_value(v, block));
                self.add_state(id, &state, asset);
            }
            None if node.attachment.is_none() => self.diags.push(missing(node, "state")),
            None => {}
        }
        self.add_states(id, node.attachment.as_ref());
    }

    fn declare_scene(&mut self, node: &CommandNode, block: &NormalizedBlock) {
        let name = match positional_text(node, "name") {
            Ok(n) => n,
            Err(d) => return self.diags.push(d),
        };
        if self.program.find_scene(&name).is_some() {
            self.diags.push(DiagCode::SceneDuplicate.builder().param("name", &name).at(node.loc).build());
            return;
        }
        let background = node.kwarg_any(keys::BACKGROUND).and_then(|v| asset_value(v, block)).map(AssetRef::File);
        log::debug!("declared scene '{}'", name);
        self.program.scenes.push(Scene { name, background });
    }

    fn emit(&mut self, op: Op) {
        if let Some(i) = self.current {
            self.raws[i].ops.push(op);
        }
    }

    fn code(&mut self, s: &Scanned) {
        let block = self.block(s.block);
        match &s.item {
            Item::Commands(nodes) => {
                for node in nodes.iter().filter(|n| !n.disabled) {
                    self.command(node, block);
                }
            }
            _ if self.current.is_none() => {
                log::trace!("block {} precedes the first function, dropped", s.block);
            }
            Item::Say(say) => self.say(say, block, s.block),
            Item::Narration => {
                let speaker = self.speakers.narration();
                let content = block.runs.trim();
                self.emit(Op::Inst(Inst::Say { speaker, status: Vec::new(), content, loc: Loc::block(s.block) }));
            }
            Item::Passthrough => {
                let text = block.plain();
                self.emit(Op::Inst(Inst::Passthrough { text, loc: Loc::block(s.block) }));
            }
            Item::Display => self.display(block, s.block),
        }
    }

    fn say(&mut self, say: &SayNode, block: &NormalizedBlock, index: usize) {
        let loc = Loc::block(index);
        let named = say.speaker_text().map(|n| self.character(n, DiagCode::SayerImplicitDecl, loc));
        let speaker = self.speakers.say(named, say.content_quoted);
        let mut content = StyledText::new();
        for f in &say.content {
            content.append(block.runs.slice(f.range.clone()));
        }
        self.emit(Op::Inst(Inst::Say { speaker, status: say.status_tags(), content: content.trim(), loc }));
    }

    fn display(&mut self, block: &NormalizedBlock, index: usize) {
        let caption: String = block.plain().chars().filter(|c| *c != ELEMENT_MARKER).collect();
        let caption = caption.trim();
        let images: Vec<_> = block.media.iter().filter(|m| m.kind == MediaKind::Image).collect();
        for m in &images {
            let id = if images.len() == 1 && !caption.is_empty() {
                self.image_ids.claim(caption)
            } else {
                self.image_ids.claim(&format!("img{}", self.program.images.len() + 1))
            };
            self.program.images.push(DisplayImage { id: id.clone(), path: m.path.clone() });
            self.emit(Op::Inst(Inst::ShowImage { image: id, loc: Loc::block(index) }));
        }
    }

    fn open_function(&mut self, node: &CommandNode) {
        let name = match positional_text(node, "name") {
            Ok(n) => n,
            Err(d) => return self.diags.push(d),
        };
        if self.raws.iter().any(|f| f.name == name) {
            self.diags.push(DiagCode::FunctionDuplicate.builder().param("name", &name).at(node.loc).build());
            self.current = None;
            return;
        }
        log::debug!("function '{}' opened", name);
        self.raws.push(RawFunction { name, ops: Vec::new(), loc: node.loc });
        self.current = Some(self.raws.len() - 1);
    }

    fn command(&mut self, node: &CommandNode, block: &NormalizedBlock) {
        let Some(kind) = CommandKind::lookup(&node.name) else {
            self.diags.push(DiagCode::CommandUnknown.builder().param("name", &node.name).at(node.loc).build());
            return;
        };
        match kind {
            CommandKind::Function => return self.open_function(node),
            CommandKind::SayMode => return self.say_mode(node),
            k if k.is_declaration() => return,
            _ if self.current.is_none() => return,
            _ => {}
        }

        let loc = node.loc;
        let op = match kind {
            CommandKind::Label => positional_text(node, "name").map(|name| Op::Label { name, loc }),
            CommandKind::Jump => positional_text(node, "target").map(|target| Op::Jump { target, loc }),
            CommandKind::Call => positional_text(node, "function").map(|target| Op::Call { target, loc }),
            CommandKind::Return => Ok(Op::Return { loc }),
            CommandKind::Branch => self.branch(node).map(|arms| Op::Branch { arms, loc }),
            CommandKind::SwitchScene => {
                positional_text(node, "scene").map(|scene| Op::Inst(Inst::SetScene { scene, loc }))
            }
            CommandKind::Show => positional_text(node, "character").map(|name| {
                let character = self.character(&name, DiagCode::CharacterNameResolutionFailed, loc);
                Op::Inst(Inst::Show { character, tags: state_tags(node), loc })
            }),
            CommandKind::SetState => positional_text(node, "character").and_then(|name| {
                let tags = state_tags(node);
                if tags.is_empty() {
                    return Err(missing(node, "state"));
                }
                let character = self.character(&name, DiagCode::CharacterNameResolutionFailed, loc);
                Ok(Op::Inst(Inst::SetState { character, tags, loc }))
            }),
            CommandKind::Hide => positional_text(node, "character").map(|name| {
                let character = self.character(&name, DiagCode::CharacterNameResolutionFailed, loc);
                Op::Inst(Inst::Hide { character, loc })
            }),
            CommandKind::Play => self.play(node, block),
            CommandKind::Comment => Ok(Op::Inst(Inst::Comment { text: unquote(&node.raw_args), loc })),
            _ => return,
        };
        match op {
            Ok(op) => self.emit(op),
            Err(d) => self.diags.push(d),
        }
    }

    fn play(&mut self, node: &CommandNode, block: &NormalizedBlock) -> Result<Op, docscript_core::Diagnostic> {
        let asset = match node.positional.as_ref() {
            Some(v) => asset_value(v, block).ok_or_else(|| invalid(node, "asset", v))?,
            None => return Err(missing(node, "asset")),
        };
        let channel = match node.kwarg_any(keys::CHANNEL) {
            None => AudioChannel::Music,
            Some(v) => match v.as_text().and_then(AudioChannel::parse) {
                Some(c) => c,
                None => {
                    self.diags.push(invalid(node, "channel", v));
                    AudioChannel::Music
                }
            },
        };
        Ok(Op::Inst(Inst::Play { channel, asset, loc: node.loc }))
    }

    fn branch(&self, node: &CommandNode) -> Result<Vec<(String, String)>, docscript_core::Diagnostic> {
        let Some(att) = &node.attachment else {
            return Err(missing(node, "options"));
        };
        let mut arms = Vec::new();
        for (text, target) in pairs(att) {
            if text.is_empty() || target.is_empty() {
                return Err(invalid(node, "options", format!("{}|{}", text, target)));
            }
            arms.push((text, target));
        }
        if arms.is_empty() {
            return Err(missing(node, "options"));
        }
        Ok(arms)
    }

    fn say_mode(&mut self, node: &CommandNode) {
        let mode = match positional_text(node, "mode") {
            Ok(m) => m,
            Err(d) => return self.diags.push(d),
        };
        let loc = node.loc;
        let resolve = |b: &mut Self, n: &str| b.character(n, DiagCode::CharacterNameResolutionFailed, loc);
        let new_mode = match mode.to_lowercase().as_str() {
            "default" | "默认" => SayMode::Default,
            "single" | "长发言" => match node.kwarg_any(keys::SPEAKER).and_then(ArgValue::as_text) {
                Some(n) => SayMode::Single(resolve(self, n.trim())),
                None => return self.diags.push(missing(node, "speaker")),
            },
            "rotation" | "交替" => {
                let mut names = node.kwarg_any(keys::SPEAKERS).and_then(ArgValue::as_text).map(split_list).unwrap_or_default();
                if let Some(Attachment::List(items)) = &node.attachment {
                    names.extend(items.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
                }
                if names.is_empty() {
                    return self.diags.push(missing(node, "speakers"));
                }
                let speakers = names.iter().map(|n| resolve(self, n)).collect();
                SayMode::Rotation { speakers, next: 0 }
            }
            _ => return self.diags.push(invalid(node, "mode", &mode)),
        };
        self.speakers.set_mode(new_mode);
    }
}

/// Two-column view of an attachment: table rows `a | b`, or list items
/// `a: b`.
fn pairs(att: &Attachment) -> Vec<(String, String)> {
    match att {
        Attachment::Table(rows) => rows
            .iter()
            .map(|r| {
                let cell = |i: usize| r.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
                (cell(0), cell(1))
            })
            .collect(),
        Attachment::List(items) => items.iter().map(|s| split_pair(s)).collect(),
    }
}

/// Splits `text: target` at the last separator.
fn split_pair(s: &str) -> (String, String) {
    match s.rfind(is_say_separator) {
        Some(i) => {
            let sep_len = s[i..].chars().next().map_or(1, char::len_utf8);
            (s[..i].trim().to_string(), s[i + sep_len..].trim().to_string())
        }
        None => (s.trim().to_string(), String::new()),
    }
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let mut chars = s.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open), Some(close)) if docscript_core::lexer::quote_closers(open).is_some_and(|c| c.contains(&close)) => {
            chars.as_str().to_string()
        }
        _ => s.to_string(),
    }
}

/// Runs the builder over a document.
pub fn build(doc: &Document, cfg: &FrontendConfig, diags: &mut Diagnostics) -> Built {
    Builder::new(doc, cfg, diags).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_splits_at_last_separator() {
        assert_eq!(split_pair("Go left: path_a"), ("Go left".into(), "path_a".into()));
        assert_eq!(split_pair("时间：10:30：later"), ("时间：10:30".into(), "later".into()));
        assert_eq!(split_pair("alone"), ("alone".into(), String::new()));
    }

    #[test]
    fn unquote_strips_matching_quotes() {
        assert_eq!(unquote("\"hello, world\""), "hello, world");
        assert_eq!(unquote("“注释”"), "注释");
        assert_eq!(unquote("plain, text"), "plain, text");
    }
}
