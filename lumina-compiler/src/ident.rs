//! Identifier generation for the target script.
//!
//! Source names can be any text; the engine wants identifiers. The mapping
//! only depends on the name and on the names claimed before it, so the same
//! program always produces the same identifiers.

use rustc_hash::FxHashSet;
use unicode_xid::UnicodeXID;

const RESERVED: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif", "else", "except",
    "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass",
    "raise", "return", "try", "while", "with", "yield", "none", "true", "false", "narrator", "extend", "centered",
    "vcentered", "adv", "nvl", "name_only", "store", "config", "renpy", "layout", "ui", "im", "style", "menu",
    "label", "jump", "call", "scene", "show", "hide", "play", "stop", "image", "define", "default", "voice",
];

pub fn sanitize(raw: &str) -> String {
    let mut out = String::new();
    for c in raw.trim().chars() {
        if c.is_xid_continue() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let mut out = out.trim_matches('_').to_string();
    if out.is_empty() {
        out.push_str("id");
    }
    if !out.chars().next().is_some_and(UnicodeXID::is_xid_start) {
        out.insert_str(0, "n_");
    }
    if RESERVED.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// Hands out unique identifiers in claim order.
#[derive(Debug, Default, Clone)]
pub struct Namer {
    used: FxHashSet<String>,
}

impl Namer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an identifier as taken without deriving it from a name.
    pub fn reserve(&mut self, ident: &str) {
        self.used.insert(ident.to_string());
    }

    pub fn claim(&mut self, raw: &str) -> String {
        let base = sanitize(raw);
        let mut ident = base.clone();
        let mut n = 2;
        while self.used.contains(&ident) {
            ident = format!("{}_{}", base, n);
            n += 1;
        }
        self.used.insert(ident.clone());
        ident
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_unicode_words() {
        assert_eq!(sanitize("Alice"), "alice");
        assert_eq!(sanitize("苏 语涵"), "苏_语涵");
        assert_eq!(sanitize("1st day!"), "n_1st_day");
        assert_eq!(sanitize("..."), "id");
        assert_eq!(sanitize("Narrator"), "narrator_");
    }

    #[test]
    fn collisions_get_numbered() {
        let mut n = Namer::new();
        assert_eq!(n.claim("Alice"), "alice");
        assert_eq!(n.claim("alice"), "alice_2");
        assert_eq!(n.claim("ALICE"), "alice_3");
    }
}
