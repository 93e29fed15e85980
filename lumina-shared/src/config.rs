//! Process-wide configuration store.
//!
//! The whole TOML document is kept as a raw table; every consumer pulls the
//! section it owns and deserializes it into its own typed struct. A section
//! that is missing or does not match the expected shape falls back to the
//! type's `Default`, so a half-written config file never stops a compile.

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use anyhow::Context;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use toml::Table;

static GLOBAL_CONFIG: OnceCell<RwLock<Table>> = OnceCell::new();

/// Loads `path` into the global store. A missing file yields an empty table.
pub fn init<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();

    let content = if path.exists() {
        log::info!("Loading config from {:?}", path);
        fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?
    } else {
        log::warn!("Config file not found at {:?}, using defaults.", path);
        String::new()
    };

    init_from_str(&content)
}

/// Same as [`init`] but takes the TOML text directly.
pub fn init_from_str(content: &str) -> anyhow::Result<()> {
    let table: Table = toml::from_str(content).unwrap_or_else(|e| {
        log::error!("Config syntax error: {}, using empty config.", e);
        Table::new()
    });

    GLOBAL_CONFIG
        .set(RwLock::new(table))
        .map_err(|_| anyhow::anyhow!("Config already initialized"))?;

    Ok(())
}

pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}

/// Reads section `[key]` as `T`.
pub fn get<T: DeserializeOwned + Default>(key: &str) -> T {
    let Some(store) = GLOBAL_CONFIG.get() else {
        log::debug!("Config store not initialized, section '[{}]' uses defaults.", key);
        return T::default();
    };
    let read_guard = match store.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    section_of(&read_guard, key)
}

/// Deserializes `[key]` out of an arbitrary table. Exposed so callers can
/// resolve sections from a table they loaded themselves.
pub fn section_of<T: DeserializeOwned + Default>(table: &Table, key: &str) -> T {
    match table.get(key) {
        Some(value) => value.clone().try_into().unwrap_or_else(|e| {
            log::warn!("Config section '[{}]' mismatch: {}. Using default.", key, e);
            T::default()
        }),
        None => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        width: usize,
        name: String,
    }

    #[test]
    fn section_lookup_falls_back_to_default() {
        let table: Table = toml::from_str("[sample]\nwidth = 8\n[broken]\nwidth = \"x\"\n").unwrap();

        let s: Sample = section_of(&table, "sample");
        assert_eq!(s, Sample { width: 8, name: String::new() });

        let missing: Sample = section_of(&table, "nothing");
        assert_eq!(missing, Sample::default());

        let broken: Sample = section_of(&table, "broken");
        assert_eq!(broken, Sample::default());
    }

    #[test]
    fn init_reads_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sample]\nname = \"doc\"\n").unwrap();

        // the global table is set once, a second init must fail
        init(&path).unwrap();
        assert!(is_initialized());
        assert!(init(&path).is_err());

        let s: Sample = get("sample");
        assert_eq!(s.name, "doc");
    }
}
