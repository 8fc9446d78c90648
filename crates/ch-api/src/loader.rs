use std::fs;
use std::path::{Path, PathBuf};

use ch_core::HostError;

/// Synced game logic, loaded into the global namespace.
pub const MAIN_FILE: &str = "main.rhai";
/// Unsynced presentation code, loaded into the registry namespace.
pub const DRAW_FILE: &str = "draw.rhai";

/// Code found in one context directory under the data root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextSources {
    pub dir: PathBuf,
    pub main: Option<String>,
    pub draw: Option<String>,
}

impl ContextSources {
    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.draw.is_none()
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, HostError> {
    if !path.is_file() {
        return Ok(None);
    }
    fs::read_to_string(path).map(Some).map_err(|error| {
        HostError::new(
            "LOAD_READ",
            format!("Failed to read {}: {}", path.display(), error),
        )
    })
}

pub fn read_context_sources(data_dir: &Path, context_name: &str) -> Result<ContextSources, HostError> {
    let dir = data_dir.join(context_name);
    Ok(ContextSources {
        main: read_optional(&dir.join(MAIN_FILE))?,
        draw: read_optional(&dir.join(DRAW_FILE))?,
        dir,
    })
}
