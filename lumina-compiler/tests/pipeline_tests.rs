use docscript_core::ast::{Alignment, Color, Document, MediaRef, NormalizedBlock, ParagraphStyle, TextRun, TextStyle};
use docscript_core::diag::DiagCode;
use lumina_compiler::{compile, compile_batch, compile_json, CodegenConfig, CompilerConfig};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn text_doc(title: &str, lines: &[&str]) -> Document {
    Document::new(title, lines.iter().map(|l| NormalizedBlock::text(l)).collect())
}

#[test]
fn small_document_renders_completely() {
    init();
    let doc = Document::new(
        "Rain",
        vec![
            NormalizedBlock::text("[Character Alice, namecolor=#ff0000]"),
            NormalizedBlock::table(vec![vec!["casual", "alice.png"]]),
            NormalizedBlock::text("[Function main]"),
            NormalizedBlock::text("[Show Alice]"),
            NormalizedBlock::text("Alice: It's raining."),
            NormalizedBlock::text("[Return]"),
        ],
    );
    let out = compile(&doc, &CompilerConfig::default());
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let expected = "\
# Generated from \"Rain\". Edits will be lost on recompilation.

define alice = Character(\"Alice\", image=\"alice\", who_color=\"#ff0000\")

image alice casual = \"alice.png\"

label main:
    show alice casual
    alice \"It\\'s raining.\"
    return

";
    assert_eq!(out.script, expected);
}

#[test]
fn menus_and_local_labels() {
    init();
    let doc = Document::new(
        "Walk",
        vec![
            NormalizedBlock::text("[Function main]"),
            NormalizedBlock::text("[Branch]"),
            NormalizedBlock::table(vec![vec!["Go \"left\"", "left"], vec!["Give up", "done"]]),
            NormalizedBlock::text("[Label left]"),
            NormalizedBlock::text("[Call done]"),
            NormalizedBlock::text("We came back."),
            NormalizedBlock::text("[Function done]"),
            NormalizedBlock::text("[Comment the end]"),
        ],
    );
    let out = compile(&doc, &CompilerConfig::default());
    let script = &out.script;
    assert!(script.contains("label main:\n    menu:\n        \"Go \\\"left\\\"\":\n            jump main.left\n"));
    assert!(script.contains("        \"Give up\":\n            jump done\n"));
    assert!(script.contains("label main.left:\n    call done\n    \"We came back.\"\n    return\n"));
    assert!(script.contains("label done:\n    # the end\n    return\n"));

    let quiet = CompilerConfig {
        codegen: CodegenConfig { emit_comments: false, header_comment: false, indent_width: 2, ..Default::default() },
        ..Default::default()
    };
    let out = compile(&doc, &quiet);
    assert!(!out.script.contains('#'));
    assert!(out.script.starts_with("label main:\n  menu:\n"));
}

#[test]
fn styled_text_passthrough_and_display() {
    init();
    let red = TextStyle { color: Some(Color::new(0xff, 0, 0)), ..Default::default() };
    let bold = TextStyle { bold: true, ..Default::default() };
    let centered = ParagraphStyle { align: Alignment::Center, ..Default::default() };
    let shaded = ParagraphStyle { background: Some(Color::new(0xdd, 0xee, 0xff)), ..Default::default() };
    let doc = Document::new(
        "Styled",
        vec![
            NormalizedBlock::styled(vec![
                TextRun::plain("Bob: I said "),
                TextRun::styled("no", bold),
                TextRun::plain(" and "),
                TextRun::styled("meant it", red),
            ]),
            NormalizedBlock::text("\u{FFFC}").with_media(MediaRef::image("cg/door.png")).with_paragraph(centered),
            NormalizedBlock::text("$ persistent.seen = True").with_paragraph(shaded),
        ],
    );
    let out = compile(&doc, &CompilerConfig::default());
    assert_eq!(out.diagnostics.count(DiagCode::SayerImplicitDecl), 1);
    let script = &out.script;
    assert!(script.contains("    bob \"I said {b}no{/b} and {color=#ff0000}meant it{/color}\"\n"));
    assert!(script.contains("image cg img1 = \"cg/door.png\"\n"));
    assert!(script.contains("    show cg img1\n"));
    assert!(script.contains("    $ persistent.seen = True\n"));
}

#[test]
fn characters_without_sprites_get_placeholders() {
    init();
    let doc = text_doc("P", &["[Character Eve]", "[Show Eve]", "[Show Nobody]"]);
    let out = compile(&doc, &CompilerConfig::default());
    assert_eq!(out.diagnostics.count(DiagCode::CharacterNameResolutionFailed), 1);
    assert!(out.script.contains("image eve = Placeholder(\"girl\", text=\"Eve\")\n"));
    assert!(out.script.contains("image nobody = Placeholder(\"girl\", text=\"Nobody\")\n"));
    assert!(out.script.contains("    show eve\n"));
}

#[test]
fn identifiers_are_sanitized_and_unique() {
    init();
    let doc = text_doc(
        "Ids",
        &["[Character Mary Ann]", "[Character mary-ann]", "[Function 2nd part]", "Mary Ann: Hi.", "mary-ann: Hello."],
    );
    let out = compile(&doc, &CompilerConfig::default());
    assert!(out.script.contains("define mary_ann = Character(\"Mary Ann\""));
    assert!(out.script.contains("define mary_ann_2 = Character(\"mary-ann\""));
    assert!(out.script.contains("label n_2nd_part:\n    mary_ann \"Hi.\"\n    mary_ann_2 \"Hello.\"\n"));
}

#[test]
fn dump_projects_dialogue() {
    init();
    let doc = text_doc("D", &["[Character Alice]", "Alice(smile): Hi.", "The rain stopped.", "[Show Alice]"]);
    let out = compile(&doc, &CompilerConfig::default());
    let records = &out.dump.records;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].speaker, "Alice");
    assert_eq!(records[0].status, vec!["smile"]);
    assert_eq!(records[1].speaker, "narrator");
    assert_eq!(out.dump.to_text(), "Alice (smile): Hi.\nnarrator: The rain stopped.\n");

    let json: serde_json::Value = serde_json::from_str(&out.dump.to_json().unwrap()).unwrap();
    assert_eq!(json[0]["function"], "D");
    assert_eq!(json[1]["content"], "The rain stopped.");
    assert!(json[1].get("status").is_none());
}

#[test]
fn json_ingestion() {
    init();
    let src = r#"{"title": "J", "blocks": [
        {"runs": [{"text": "Alice: From JSON."}]},
        {"runs": [{"text": "styled", "style": {"italic": true}}], "paragraph": {"align": "center"}}
    ]}"#;
    let out = compile_json(src, &CompilerConfig::default()).unwrap();
    assert!(out.script.contains("    alice \"From JSON.\"\n"));
    assert!(out.script.contains("    \"{i}styled{/i}\"\n"));

    let err = compile_json("{\"blocks\": 3}", &CompilerConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Failed to load document"));
}

#[test]
fn batch_keeps_input_order_and_isolation() {
    init();
    let docs: Vec<Document> = (0..8)
        .map(|i| text_doc(&format!("doc{}", i), &[&format!("Speaker{}: line {}", i, i)]))
        .collect();
    let outs = compile_batch(&docs, &CompilerConfig::default());
    assert_eq!(outs.len(), 8);
    for (i, out) in outs.iter().enumerate() {
        assert_eq!(out.program.title, format!("doc{}", i));
        assert_eq!(out.program.characters.len(), 1);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.script, compile(&docs[i], &CompilerConfig::default()).script);
    }
}
