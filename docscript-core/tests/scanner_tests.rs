use docscript_core::ast::{ArgValue, Line, SayNode};
use docscript_core::diag::DiagCode;
use docscript_core::scanner::{scan_line, ScanConfig, ScanResult};

fn scan(text: &str) -> ScanResult {
    let _ = env_logger::builder().is_test(true).try_init();
    scan_line(text, 0, &ScanConfig::default())
}

fn say(text: &str) -> SayNode {
    match scan(text).line {
        Line::Say(s) => s,
        other => panic!("{:?} scanned as {:?}", text, other),
    }
}

#[test]
fn name_separator_content() {
    let s = say("名字: 你好");
    assert_eq!(s.speaker_text(), Some("名字"));
    assert_eq!(s.content_text(), "你好");
    assert!(!s.content_quoted);
}

#[test]
fn quoted_line_without_speaker() {
    let s = say("\"你好\"");
    assert_eq!(s.speaker, None);
    assert!(s.content_quoted);
    assert_eq!(s.content_text(), "你好");
}

#[test]
fn status_before_separator() {
    let s = say("苏语涵（平静、微笑）：“这是我说的话”");
    assert_eq!(s.speaker_text(), Some("苏语涵"));
    assert_eq!(s.status_tags(), vec!["平静", "微笑"]);
    assert_eq!(s.content_text(), "这是我说的话");
}

#[test]
fn status_after_separator() {
    let s = say("Alice: (smile) Nice to meet you.");
    assert_eq!(s.status_tags(), vec!["smile"]);
    assert_eq!(s.content_text(), "Nice to meet you.");
}

#[test]
fn name_before_quoted_content_without_separator() {
    let s = say("Alice 「早上好」");
    assert_eq!(s.speaker_text(), Some("Alice"));
    assert!(!s.speaker_quoted);
    assert_eq!(s.content_text(), "早上好");
    // text after the quote means this is not a say-line of that form
    assert_eq!(scan("He said “hello” to me").line, Line::Narration);
}

#[test]
fn quoted_name_without_separator() {
    let s = say("【Bob】 I'm late");
    assert_eq!(s.speaker_text(), Some("Bob"));
    assert!(s.speaker_quoted);
    assert_eq!(s.content_text(), "I'm late");
}

#[test]
fn several_quoted_pieces() {
    let s = say("Alice: “One.” “Two.”");
    assert_eq!(s.content.len(), 2);
    assert_eq!(s.content_text(), "One.Two.");
}

#[test]
fn narration_and_blank() {
    assert_eq!(scan("今天天气不错，我们出去玩吧。").line, Line::Narration);
    assert_eq!(scan("What a day! It rained: again.").line, Line::Narration);
    assert_eq!(scan("   ").line, Line::Blank);
    assert_eq!(scan("\"unterminated").line, Line::Narration);
}

#[test]
fn content_positions_index_the_line() {
    let text = "Alice: hi there";
    let s = say(text);
    assert_eq!(&text[s.content[0].range.clone()], "hi there");
    assert_eq!(&text[s.speaker.unwrap().range], "Alice");
}

#[test]
fn command_line_with_several_segments() {
    let r = scan("[cmd a, b=c] 【显示 爱丽丝】 # trailing comment");
    let Line::Commands(nodes) = r.line else { panic!("{:?}", r.line) };
    assert!(r.diags.is_empty());
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].name, "cmd");
    assert_eq!(nodes[0].positional, Some(ArgValue::Text("a".into())));
    assert_eq!(nodes[0].kwarg("b"), Some(&ArgValue::Text("c".into())));
    assert_eq!(nodes[1].name, "显示");
    assert_eq!(nodes[1].loc.start, "[cmd a, b=c] ".len());
}

#[test]
fn disabled_command() {
    let Line::Commands(nodes) = scan("[#Show Alice]").line else { panic!() };
    assert!(nodes[0].disabled);
    assert_eq!(nodes[0].name, "Show");
}

#[test]
fn brackets_inside_quotes_are_skipped() {
    let Line::Commands(nodes) = scan("[Comment \"a ] b\"]").line else { panic!() };
    assert_eq!(nodes[0].positional, Some(ArgValue::Quoted("a ] b".into())));
}

#[test]
fn malformed_arguments_stay_a_command() {
    let r = scan("[Show a, b]");
    assert!(matches!(r.line, Line::Commands(ref n) if n[0].name == "Show"));
    assert_eq!(r.diags[0].code(), DiagCode::UnrecognizedCommand);
}

#[test]
fn nameless_bracket_falls_back() {
    let r = scan("[   ] what");
    assert_eq!(r.line, Line::Narration);
    assert!(r.diags.is_empty());

    let r = scan("[\"quoted\"]");
    assert!(!matches!(r.line, Line::Commands(_)));
    assert_eq!(r.diags.len(), 1);
    assert_eq!(r.diags[0].code(), DiagCode::UnrecognizedCommand);
}

#[test]
fn long_text_is_not_a_name() {
    let cfg = ScanConfig { max_name_chars: 4 };
    let r = scan_line("Somebody: hello", 0, &cfg);
    assert_eq!(r.line, Line::Narration);
}
