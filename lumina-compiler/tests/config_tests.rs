use docscript_core::ast::{Document, NormalizedBlock};
use lumina_compiler::{compile, CompilerConfig, ReentrantShow};

// the global config can only be initialized once, so this file has a single test
#[test]
fn compiler_config_comes_from_shared_store() {
    let _ = env_logger::builder().is_test(true).try_init();
    assert_eq!(CompilerConfig::from_shared(), CompilerConfig::default());

    lumina_shared::config::init_from_str(
        "[frontend]\nnarrator_name = \"旁白\"\n\n[codegen]\nindent_width = 2\nreentrant_show = \"update_state\"\nheader_comment = false\n",
    )
    .unwrap();
    let cfg = CompilerConfig::from_shared();
    assert_eq!(cfg.frontend.narrator_name, "旁白");
    assert_eq!(cfg.frontend.max_name_chars, 24);
    assert_eq!(cfg.codegen.indent_width, 2);
    assert_eq!(cfg.codegen.reentrant_show, ReentrantShow::UpdateState);

    let doc = Document::new("c", vec![NormalizedBlock::text("Nobody speaks.")]);
    let out = compile(&doc, &cfg);
    assert_eq!(out.script, "label c:\n  \"Nobody speaks.\"\n  return\n\n");
    assert_eq!(out.dump.to_text(), "旁白: Nobody speaks.\n");
}
