use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::alias::AliasTable;

#[derive(Debug, Default, Deserialize)]
struct AliasFile {
    #[serde(default)]
    alias: HashMap<String, String>,
}

/// Load the alias table from `$HOME/.dockshellrc.toml`.
///
/// A missing `HOME`, a missing file, or a parse failure all degrade to an
/// empty table rather than aborting startup — config loading is never a
/// fatal precondition for a usable shell.
pub fn load_alias_table() -> AliasTable {
    let Some(path) = config_path() else {
        return AliasTable::new();
    };

    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return AliasTable::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read alias config");
            return AliasTable::new();
        }
    };

    match toml::from_str::<AliasFile>(&contents) {
        Ok(file) => AliasTable::from_map(file.alias),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse alias config");
            AliasTable::new()
        }
    }
}

fn config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".dockshellrc.toml"))
}
