//! Plain speaker/content dump.

use std::fmt::Write;

use anyhow::Context;
use serde::Serialize;

use crate::ir::{Inst, Program};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpRecord {
    pub function: String,
    pub block: Option<String>,
    pub speaker: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dump {
    pub records: Vec<DumpRecord>,
}

impl Dump {
    /// One record per say-line, in function then block order. Narration is
    /// attributed to `narrator`.
    pub fn from_program(program: &Program, narrator: &str) -> Self {
        let mut records = Vec::new();
        for f in &program.functions {
            for b in &f.blocks {
                for inst in &b.insts {
                    if let Inst::Say { speaker, status, content, .. } = inst {
                        let speaker = match speaker {
                            Some(id) => program.character(*id).name.clone(),
                            None => narrator.to_string(),
                        };
                        records.push(DumpRecord {
                            function: f.name.clone(),
                            block: b.label.clone(),
                            speaker,
                            status: status.clone(),
                            content: content.plain(),
                        });
                    }
                }
            }
        }
        Dump { records }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(&self.records).context("Failed to serialize dump")
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for r in &self.records {
            if r.status.is_empty() {
                let _ = writeln!(out, "{}: {}", r.speaker, r.content);
            } else {
                let _ = writeln!(out, "{} ({}): {}", r.speaker, r.status.join(", "), r.content);
            }
        }
        out
    }
}
