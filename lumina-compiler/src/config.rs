use serde::{Deserialize, Serialize};

/// What to do with a Show for a character that is already on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentrantShow {
    /// Report `character-stateerror` and drop the Show.
    #[default]
    Reject,
    /// Emit a state-changing Show when the resolved state differs.
    UpdateState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub default_function_name: String, // used when the document has no title
    pub max_name_chars: usize,
    pub narrator_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub indent_width: usize,
    pub character_placeholder_base: String,
    pub scene_placeholder_base: String,
    pub reentrant_show: ReentrantShow,
    pub emit_comments: bool,
    pub header_comment: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub frontend: FrontendConfig,
    pub codegen: CodegenConfig,
}

impl CompilerConfig {
    /// Pulls `[frontend]` and `[codegen]` from the shared config store.
    pub fn from_shared() -> Self {
        Self {
            frontend: lumina_shared::config::get("frontend"),
            codegen: lumina_shared::config::get("codegen"),
        }
    }

    /// Same as [`CompilerConfig::from_shared`] for a table loaded by the caller.
    pub fn from_table(table: &toml::Table) -> Self {
        Self {
            frontend: lumina_shared::config::section_of(table, "frontend"),
            codegen: lumina_shared::config::section_of(table, "codegen"),
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            default_function_name: "start".into(),
            max_name_chars: 24,
            narrator_name: "narrator".into(),
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            character_placeholder_base: "girl".into(),
            scene_placeholder_base: "bg".into(),
            reentrant_show: ReentrantShow::Reject,
            emit_comments: true,
            header_comment: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_override_defaults() {
        let table: toml::Table = toml::from_str(
            "[frontend]\nmax_name_chars = 8\n[codegen]\nindent_width = 2\nreentrant_show = \"update_state\"\n",
        )
        .unwrap();
        let cfg = CompilerConfig::from_table(&table);
        assert_eq!(cfg.frontend.max_name_chars, 8);
        assert_eq!(cfg.frontend.default_function_name, "start");
        assert_eq!(cfg.codegen.indent_width, 2);
        assert_eq!(cfg.codegen.reentrant_show, ReentrantShow::UpdateState);
        assert!(cfg.codegen.emit_comments);
    }
}
