//! Persona loading

use anyhow::Context;
use herald_chat::Persona;
use std::path::Path;

const BUILTIN_PERSONA: &str = include_str!("../personas/napoleon.toml");

/// The persona shipped with the binary
pub fn builtin() -> anyhow::Result<Persona> {
    toml::from_str(BUILTIN_PERSONA).context("built-in persona is invalid")
}

/// Load a persona from `path`, or the built-in one if no path is given
pub fn load(path: Option<&str>) -> anyhow::Result<Persona> {
    let Some(path) = path else {
        return builtin();
    };

    let path = expand_home(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read persona file {}", path.display()))?;
    let persona: Persona = toml::from_str(&content)
        .with_context(|| format!("failed to parse persona file {}", path.display()))?;

    if !persona.template.has_placeholder() {
        tracing::warn!(
            "Persona template in {} has no {{question}} placeholder; the question will be appended",
            path.display()
        );
    }
    Ok(persona)
}

fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}
