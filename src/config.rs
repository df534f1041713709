// src/config.rs
// Host server address resolution and preflight checks

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{ReflectError, Result};
use crate::reflect::REFLECT_AGENT;

/// Default OpenCode server address (`opencode serve` default port)
pub const DEFAULT_SERVER_URL: &str = "http://localhost:4096/";

/// Parse a base URL and normalize it so relative joins append path
/// segments instead of replacing the last one.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(ReflectError::Config(format!(
            "not a usable server URL: {raw}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Where the externally-synced extractor agent definition lives
pub fn agent_definition_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReflectError::Config("no home directory".to_string()))?;
    Ok(agent_definition_path_in(&home))
}

fn agent_definition_path_in(home: &Path) -> PathBuf {
    home.join(".config/opencode/agents")
        .join(format!("{REFLECT_AGENT}.md"))
}

/// True when the extractor agent definition file exists. Used only for
/// startup warnings; this process never writes the file.
pub fn agent_definition_present() -> bool {
    agent_definition_path().map(|p| p.exists()).unwrap_or(false)
}
