use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use deck::ParseOptions;
use deck_renderer::{LanguagePlayground, RenderOptions};

/// Contents of `deck.toml`. Every table and key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parse: ParseOptions,
    pub render: RenderOptions,
    pub playground: LanguagePlayground,
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        let config = Config::from_toml(&text)
            .with_context(|| format!("in config '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }
}
