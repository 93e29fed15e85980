use docscript_core::ast::{Alignment, Color, Document, MediaRef, NormalizedBlock, ParagraphStyle};
use docscript_core::diag::{DiagCode, Diagnostics};
use lumina_compiler::builder::{self, Built};
use lumina_compiler::ir::{AssetRef, AudioChannel, CharId, Inst, Op};
use lumina_compiler::FrontendConfig;

fn build_blocks(title: &str, blocks: Vec<NormalizedBlock>) -> (Built, Diagnostics) {
    let _ = env_logger::builder().is_test(true).try_init();
    let doc = Document::new(title, blocks);
    let mut diags = Diagnostics::new();
    let built = builder::build(&doc, &FrontendConfig::default(), &mut diags);
    (built, diags)
}

fn build_lines(lines: &[&str]) -> (Built, Diagnostics) {
    build_blocks("Test", lines.iter().map(|l| NormalizedBlock::text(l)).collect())
}

fn insts(built: &Built, f: usize) -> Vec<&Inst> {
    built.raw_functions[f]
        .ops
        .iter()
        .filter_map(|op| match op {
            Op::Inst(i) => Some(i),
            _ => None,
        })
        .collect()
}

fn speakers(built: &Built) -> Vec<Option<CharId>> {
    insts(built, 0)
        .into_iter()
        .filter_map(|i| match i {
            Inst::Say { speaker, .. } => Some(*speaker),
            _ => None,
        })
        .collect()
}

#[test]
fn document_without_function_is_wrapped() {
    let (built, _) = build_lines(&["Alice: Hello."]);
    assert_eq!(built.raw_functions.len(), 1);
    assert_eq!(built.raw_functions[0].name, "Test");

    let (built, _) = build_blocks("", vec![NormalizedBlock::text("Just narration.")]);
    assert_eq!(built.raw_functions[0].name, "start");
}

#[test]
fn content_before_first_function_is_dropped() {
    let (built, _) = build_lines(&["Before anything.", "[Function main]", "Inside."]);
    assert_eq!(built.raw_functions.len(), 1);
    assert_eq!(insts(&built, 0).len(), 1);
}

#[test]
fn declarations_resolve_before_use() {
    let (built, diags) = build_lines(&[
        "[Function main]",
        "Ally: Hi!",
        "[Character 爱丽丝, alias=Ally, namecolor=#ff8800, color=#333333]",
    ]);
    assert!(!diags.has(DiagCode::SayerImplicitDecl));
    let c = &built.program.characters[0];
    assert_eq!(c.name, "爱丽丝");
    assert_eq!(c.aliases, vec!["Ally"]);
    assert_eq!(c.name_color, Color::parse("#ff8800"));
    assert_eq!(c.content_color, Some(Color::new(0x33, 0x33, 0x33)));
    assert_eq!(speakers(&built), vec![Some(CharId(0))]);
}

#[test]
fn unknown_speaker_is_declared_implicitly() {
    let (built, diags) = build_lines(&["Bob: Who am I?", "Bob: Still me."]);
    assert_eq!(diags.count(DiagCode::SayerImplicitDecl), 1);
    assert!(built.program.characters[0].implicit);
    assert_eq!(speakers(&built), vec![Some(CharId(0)), Some(CharId(0))]);
}

#[test]
fn duplicate_declarations_are_reported() {
    let (built, diags) =
        build_lines(&["[Character Alice]", "[Character Alice]", "[Scene park]", "[Scene park]", "[Function a]", "[Function a]"]);
    assert_eq!(diags.count(DiagCode::CharacterDuplicate), 1);
    assert_eq!(diags.count(DiagCode::SceneDuplicate), 1);
    assert_eq!(diags.count(DiagCode::FunctionDuplicate), 1);
    assert_eq!(built.program.characters.len(), 1);
    assert_eq!(built.raw_functions.len(), 1);
}

#[test]
fn default_mode_reuses_last_named_speaker() {
    let (built, _) = build_lines(&["[Character Alice]", "Alice: Hi.", "\"And another thing.\"", "It got quiet."]);
    assert_eq!(speakers(&built), vec![Some(CharId(0)), Some(CharId(0)), None]);
}

#[test]
fn single_mode_owns_narration() {
    let (built, _) = build_lines(&[
        "[Character Alice]",
        "[SayMode single, speaker=Alice]",
        "It was cold.",
        "\"Brr.\"",
        "[SayMode default]",
        "It was still cold.",
    ]);
    assert_eq!(speakers(&built), vec![Some(CharId(0)), Some(CharId(0)), None]);
}

#[test]
fn rotation_cycles_through_listed_speakers() {
    let (built, diags) = build_blocks(
        "Test",
        vec![
            NormalizedBlock::text("[Character Alice]"),
            NormalizedBlock::text("[Character Bob]"),
            NormalizedBlock::text("[发言模式 交替]"),
            NormalizedBlock::list(vec!["Alice", "Bob"]),
            NormalizedBlock::text("\"One.\""),
            NormalizedBlock::text("\"Two.\""),
            NormalizedBlock::text("Carol: \"Three.\""),
            NormalizedBlock::text("\"Four.\""),
        ],
    );
    assert_eq!(diags.count(DiagCode::SayerImplicitDecl), 1);
    assert_eq!(speakers(&built), vec![Some(CharId(0)), Some(CharId(1)), Some(CharId(2)), Some(CharId(0))]);
}

#[test]
fn say_mode_needs_its_arguments() {
    let (_, diags) = build_lines(&["[SayMode single]", "[SayMode rotation]", "[SayMode sideways]"]);
    assert_eq!(diags.count(DiagCode::CommandMissingArgument), 2);
    assert_eq!(diags.count(DiagCode::CommandInvalidArgument), 1);
}

#[test]
fn table_attaches_only_to_the_command_right_before_it() {
    let (built, _) = build_blocks(
        "Test",
        vec![
            NormalizedBlock::text("[Character Alice]"),
            NormalizedBlock::table(vec![vec!["casual smile", "a.png"], vec!["casual angry", ""]]),
            NormalizedBlock::table(vec![vec!["school", "s.png"]]),
            NormalizedBlock::text("Some narration."),
            NormalizedBlock::table(vec![vec!["swim", "w.png"]]),
        ],
    );
    let sprites = &built.program.characters[0].sprites;
    let images = sprites.images();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0].1, Some(&AssetRef::File("a.png".into())));
    assert!(matches!(images[1].1, Some(AssetRef::Placeholder { .. })));
}

#[test]
fn sprite_command_grows_the_tree() {
    let (built, diags) = build_lines(&[
        "[Sprite Alice(casual smile), image=a.png]",
        "[Sprite Alice, state=casual angry, image=b.png]",
        "[Sprite Alice]",
    ]);
    // Alice was never declared with Character
    assert_eq!(diags.count(DiagCode::CharacterNameResolutionFailed), 1);
    assert_eq!(diags.count(DiagCode::CommandMissingArgument), 1);
    let tree = &built.program.characters[0].sprites;
    assert_eq!(tree.default_path(), vec!["casual".to_string(), "smile".to_string()]);
    assert_eq!(tree.images().len(), 2);
}

#[test]
fn control_ops_follow_document_order() {
    let (built, _) = build_blocks(
        "Test",
        vec![
            NormalizedBlock::text("[Function main]"),
            NormalizedBlock::text("[Label top] [Call other]"),
            NormalizedBlock::text("[Branch]"),
            NormalizedBlock::list(vec!["Again: top", "Leave：out"]),
            NormalizedBlock::text("[Jump top] [Return]"),
        ],
    );
    let ops = &built.raw_functions[0].ops;
    assert!(matches!(&ops[0], Op::Label { name, .. } if name == "top"));
    assert!(matches!(&ops[1], Op::Call { target, .. } if target == "other"));
    match &ops[2] {
        Op::Branch { arms, .. } => {
            assert_eq!(arms, &vec![("Again".to_string(), "top".to_string()), ("Leave".to_string(), "out".to_string())]);
        }
        other => panic!("{:?}", other),
    }
    assert!(matches!(&ops[3], Op::Jump { target, .. } if target == "top"));
    assert!(matches!(&ops[4], Op::Return { .. }));
}

#[test]
fn branch_without_options_is_reported() {
    let (built, diags) = build_lines(&["[Function main]", "[Branch]"]);
    assert_eq!(diags.count(DiagCode::CommandMissingArgument), 1);
    assert!(built.raw_functions[0].ops.is_empty());
}

#[test]
fn unknown_and_disabled_commands() {
    let (built, diags) = build_lines(&["[Function main]", "[Dance Alice]", "[#Show Alice]"]);
    assert_eq!(diags.count(DiagCode::CommandUnknown), 1);
    assert!(built.raw_functions[0].ops.is_empty());
    assert!(built.program.characters.is_empty());
}

#[test]
fn media_commands_and_paragraphs() {
    let centered = ParagraphStyle { align: Alignment::Center, ..Default::default() };
    let shaded = ParagraphStyle { background: Some(Color::new(0xee, 0xee, 0xee)), ..Default::default() };
    let (built, diags) = build_blocks(
        "Test",
        vec![
            NormalizedBlock::text("[Play \u{FFFC}, channel=sound]").with_media(MediaRef::audio("sfx/rain.ogg")),
            NormalizedBlock::text("[Play theme.ogg, channel=radio]"),
            NormalizedBlock::text("\u{FFFC} Sunset").with_media(MediaRef::image("cg/sunset.png")).with_paragraph(centered),
            NormalizedBlock::text("$ renpy.pause(1.0)").with_paragraph(shaded),
            NormalizedBlock::text("[Comment \"remember the rain\"]"),
        ],
    );
    assert_eq!(diags.count(DiagCode::CommandInvalidArgument), 1);
    let all = insts(&built, 0);
    assert!(matches!(all[0], Inst::Play { channel: AudioChannel::Sound, asset, .. } if asset == "sfx/rain.ogg"));
    assert!(matches!(all[1], Inst::Play { channel: AudioChannel::Music, asset, .. } if asset == "theme.ogg"));
    assert!(matches!(all[2], Inst::ShowImage { image, .. } if image == "sunset"));
    assert!(matches!(all[3], Inst::Passthrough { text, .. } if text == "$ renpy.pause(1.0)"));
    assert!(matches!(all[4], Inst::Comment { text, .. } if text == "remember the rain"));
    assert_eq!(built.program.images[0].path, "cg/sunset.png");
}

#[test]
fn set_state_takes_tags_from_call_or_keyword() {
    let (built, diags) = build_lines(&[
        "[Function main]",
        "[状态 Alice(angry)]",
        "[SetState Alice, 状态=school smile]",
        "[SetState Alice]",
    ]);
    assert_eq!(diags.count(DiagCode::CharacterNameResolutionFailed), 1);
    assert_eq!(diags.count(DiagCode::CommandMissingArgument), 1);
    let all = insts(&built, 0);
    assert_eq!(all.len(), 2);
    assert!(matches!(all[0], Inst::SetState { character: CharId(0), tags, .. } if tags == &vec!["angry".to_string()]));
    assert!(matches!(all[1], Inst::SetState { tags, .. } if tags.join(" ") == "school smile"));
}
