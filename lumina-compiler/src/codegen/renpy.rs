//! Ren'Py script emitter.

use std::fmt::Write;

use docscript_core::ast::{StyledText, ELEMENT_MARKER};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use super::{GenBlock, GenFunction, Generated};
use crate::config::CodegenConfig;
use crate::ident::{sanitize, Namer};
use crate::ir::{ArmTarget, AssetRef, CharId, FuncId, Inst, Program, Terminator};

static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Escapes text for a double-quoted Ren'Py string. Element markers are
/// dropped.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '%' => out.push_str("\\%"),
            '[' => out.push_str("[["),
            '{' => out.push_str("{{"),
            ELEMENT_MARKER => {}
            c => out.push(c),
        }
    }
    // Ren'Py collapses runs of spaces
    SPACE_RUN.replace_all(&out, |caps: &regex::Captures| format!(" {}", "\\ ".repeat(caps[0].len() - 1))).into_owned()
}

/// Styled text as string content with `{b}`/`{i}`/`{color}` markup.
pub fn markup(text: &StyledText) -> String {
    let mut out = String::new();
    for run in text.runs() {
        let body = escape(&run.text);
        if body.is_empty() {
            continue;
        }
        let style = &run.style;
        if let Some(c) = style.color {
            let _ = write!(out, "{{color={}}}", c);
        }
        if style.bold {
            out.push_str("{b}");
        }
        if style.italic {
            out.push_str("{i}");
        }
        out.push_str(&body);
        if style.italic {
            out.push_str("{/i}");
        }
        if style.bold {
            out.push_str("{/b}");
        }
        if style.color.is_some() {
            out.push_str("{/color}");
        }
    }
    out
}

/// Identifiers for everything the script refers to.
struct Names {
    characters: Vec<String>,
    scenes: FxHashMap<String, String>,
    functions: Vec<String>,
    labels: Vec<FxHashMap<String, String>>,
}

impl Names {
    fn new(program: &Program, generated: &Generated) -> Self {
        let mut idents = Namer::new();
        idents.reserve("bg");
        idents.reserve("cg");
        let characters = program.characters.iter().map(|c| idents.claim(&c.name)).collect();

        let mut scene_idents = Namer::new();
        let scenes = generated.scenes.iter().map(|s| (s.name.clone(), scene_idents.claim(&s.name))).collect();

        let mut label_idents = Namer::new();
        let functions = generated.functions.iter().map(|f| label_idents.claim(&f.name)).collect();
        let labels = generated
            .functions
            .iter()
            .map(|f| {
                let mut local = Namer::new();
                f.blocks.iter().filter_map(|b| b.label.as_ref()).map(|l| (l.clone(), local.claim(l))).collect()
            })
            .collect();
        Names { characters, scenes, functions, labels }
    }

    fn character(&self, id: CharId) -> &str {
        &self.characters[id.0]
    }

    fn scene(&self, name: &str) -> String {
        self.scenes.get(name).cloned().unwrap_or_else(|| sanitize(name))
    }

    fn function(&self, id: FuncId) -> &str {
        &self.functions[id.0]
    }

    fn label(&self, func: usize, block: &GenBlock) -> Option<String> {
        let l = block.label.as_ref()?;
        Some(format!("{}.{}", self.functions[func], self.labels[func].get(l).cloned().unwrap_or_else(|| sanitize(l))))
    }
}

fn image_tags(path: &[String]) -> String {
    path.iter().map(|t| sanitize(t)).collect::<Vec<_>>().join(" ")
}

fn image_name(base: &str, path: &[String]) -> String {
    if path.is_empty() { base.to_string() } else { format!("{} {}", base, image_tags(path)) }
}

fn placeholder(base: &str, text: &str) -> String {
    format!("Placeholder(\"{}\", text=\"{}\")", escape(base), escape(text))
}

struct Emitter<'a> {
    program: &'a Program,
    generated: &'a Generated,
    cfg: &'a CodegenConfig,
    names: Names,
    out: String,
}

impl<'a> Emitter<'a> {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth * self.cfg.indent_width {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn header(&mut self) {
        if self.cfg.header_comment {
            let title = self.program.title.replace('\n', " ");
            self.line(0, &format!("# Generated from \"{}\". Edits will be lost on recompilation.", title));
            self.out.push('\n');
        }
    }

    fn defines(&mut self) {
        let program = self.program;
        for (i, c) in program.characters.iter().enumerate() {
            let ident = self.names.character(CharId(i)).to_string();
            let mut args = format!("\"{}\", image=\"{}\"", escape(&c.name), ident);
            if let Some(color) = c.name_color {
                let _ = write!(args, ", who_color=\"{}\"", color);
            }
            if let Some(color) = c.content_color {
                let _ = write!(args, ", what_color=\"{}\"", color);
            }
            self.line(0, &format!("define {} = Character({})", ident, args));
            if i + 1 == program.characters.len() {
                self.out.push('\n');
            }
        }
    }

    fn images(&mut self) {
        let program = self.program;
        let generated = self.generated;
        let mut lines = Vec::new();

        for (i, c) in program.characters.iter().enumerate() {
            let id = CharId(i);
            let ident = self.names.character(id);
            for (path, asset) in c.sprites.images() {
                let value = match asset {
                    Some(AssetRef::File(p)) => format!("\"{}\"", escape(p)),
                    Some(AssetRef::Placeholder { text }) => placeholder(&self.cfg.character_placeholder_base, text),
                    None => placeholder(&self.cfg.character_placeholder_base, &format!("{} {}", c.name, path.join(" "))),
                };
                lines.push(format!("image {} = {}", image_name(ident, &path), value));
            }
            for (_, path) in generated.placeholders.range((id, Vec::new())..(CharId(i + 1), Vec::new())) {
                if c.sprites.images().iter().any(|(p, _)| p == path) {
                    continue;
                }
                let text = format!("{} {}", c.name, path.join(" "));
                let value = placeholder(&self.cfg.character_placeholder_base, text.trim());
                lines.push(format!("image {} = {}", image_name(ident, path), value));
            }
        }
        for s in &generated.scenes {
            let value = match &s.background {
                Some(AssetRef::File(p)) => format!("\"{}\"", escape(p)),
                Some(AssetRef::Placeholder { text }) => placeholder(&self.cfg.scene_placeholder_base, text),
                None => placeholder(&self.cfg.scene_placeholder_base, &s.name),
            };
            lines.push(format!("image bg {} = {}", self.names.scene(&s.name), value));
        }
        for img in &program.images {
            lines.push(format!("image cg {} = \"{}\"", img.id, escape(&img.path)));
        }

        if lines.is_empty() {
            return;
        }
        for l in lines {
            self.line(0, &l);
        }
        self.out.push('\n');
    }

    fn statement(&mut self, depth: usize, inst: &Inst) {
        let text = match inst {
            Inst::Say { speaker, status, content, .. } => {
                let body = format!("\"{}\"", markup(content));
                match speaker {
                    Some(id) if status.is_empty() => format!("{} {}", self.names.character(*id), body),
                    Some(id) => format!("{} {} {}", self.names.character(*id), image_tags(status), body),
                    None => body,
                }
            }
            Inst::Show { character, tags, .. } | Inst::SetState { character, tags, .. } => {
                format!("show {}", image_name(self.names.character(*character), tags))
            }
            Inst::Hide { character, .. } => format!("hide {}", self.names.character(*character)),
            Inst::SetScene { scene, .. } => format!("scene bg {}", self.names.scene(scene)),
            Inst::ClearScene { .. } => "scene".to_string(),
            Inst::ShowImage { image, .. } => format!("show cg {}", image),
            Inst::Play { channel, asset, .. } => format!("play {} \"{}\"", channel.as_str(), escape(asset)),
            Inst::Passthrough { text, .. } => {
                for l in text.lines() {
                    self.line(depth, l);
                }
                return;
            }
            Inst::Comment { text, .. } => {
                if !self.cfg.emit_comments {
                    return;
                }
                format!("# {}", text.replace('\n', " "))
            }
        };
        self.line(depth, &text);
    }

    fn target(&self, func: usize, gf: &GenFunction, target: ArmTarget) -> String {
        match target {
            ArmTarget::Block(b) => self.names.label(func, &gf.blocks[b]).unwrap_or_else(|| self.names.functions[func].clone()),
            ArmTarget::Function(f) => self.names.function(f).to_string(),
        }
    }

    fn function(&mut self, func: usize, gf: &GenFunction) {
        for (i, block) in gf.blocks.iter().enumerate() {
            let label = if i == 0 { Some(self.names.functions[func].clone()) } else { self.names.label(func, block) };
            if let Some(l) = &label {
                self.line(0, &format!("label {}:", l));
            }
            let before = self.out.len();

            for inst in &block.body {
                self.statement(1, inst);
            }
            for inst in &block.patch {
                self.statement(1, inst);
            }
            match &block.term {
                Terminator::JumpToFunction(f) => self.line(1, &format!("jump {}", self.names.function(*f))),
                Terminator::CallFunction(f) => self.line(1, &format!("call {}", self.names.function(*f))),
                Terminator::JumpToLabel(t) if *t == i + 1 => {}
                Terminator::JumpToLabel(t) => {
                    let target = self.target(func, gf, ArmTarget::Block(*t));
                    self.line(1, &format!("jump {}", target));
                }
                Terminator::Branch(arms) => {
                    self.line(1, "menu:");
                    for (k, arm) in arms.iter().enumerate() {
                        self.line(2, &format!("\"{}\":", escape(&arm.text)));
                        for inst in &block.arm_patches[k] {
                            self.statement(3, inst);
                        }
                        let target = self.target(func, gf, arm.target);
                        self.line(3, &format!("jump {}", target));
                    }
                }
                Terminator::Return => self.line(1, "return"),
            }

            if label.is_some() && self.out.len() == before {
                self.line(1, "pass");
            }
        }
        self.out.push('\n');
    }
}

/// Renders a generated program as a Ren'Py script.
pub fn emit(program: &Program, generated: &Generated, cfg: &CodegenConfig) -> String {
    let mut e = Emitter { program, generated, cfg, names: Names::new(program, generated), out: String::new() };
    e.header();
    e.defines();
    e.images();
    for (i, gf) in generated.functions.iter().enumerate() {
        e.function(i, gf);
    }
    e.out
}
