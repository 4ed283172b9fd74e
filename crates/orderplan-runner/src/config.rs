//! Runner configuration file.
//!
//! ```json
//! {
//!   "executor": { "continueOnError": true },
//!   "contexts": [
//!     "default",
//!     { "name": "tiny", "inventory": { "SKU001": 1 }, "warehouseCapacity": 1 }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use orderplan_core::{Context, ContextConfig};
use orderplan_engine::ExecutorConfig;
use serde::Deserialize;

use crate::cli::DEFAULT_CONTEXTS;

/// A context named by preset or described inline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContextSource {
    Preset(String),
    Inline {
        name: String,
        #[serde(flatten)]
        config: ContextConfig,
    },
}

impl ContextSource {
    pub fn name(&self) -> &str {
        match self {
            ContextSource::Preset(name) => name,
            ContextSource::Inline { name, .. } => name,
        }
    }

    pub fn build(&self) -> Result<(String, Context)> {
        let context = match self {
            ContextSource::Preset(name) => Context::preset(name)?,
            ContextSource::Inline { config, .. } => config.clone().build()?,
        };
        Ok((self.name().to_string(), context))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub executor: ExecutorConfig,
    pub contexts: Vec<ContextSource>,
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply command-line overrides. Named contexts replace the configured
    /// ones; with neither, the default experiment contexts are used.
    pub fn merge_cli(mut self, contexts: &[String], continue_on_error: bool) -> Self {
        if !contexts.is_empty() {
            self.contexts = contexts
                .iter()
                .cloned()
                .map(ContextSource::Preset)
                .collect();
        }
        if self.contexts.is_empty() {
            self.contexts = DEFAULT_CONTEXTS
                .iter()
                .map(|name| ContextSource::Preset(name.to_string()))
                .collect();
        }
        if continue_on_error {
            self.executor.continue_on_error = true;
        }
        self
    }

    pub fn build_contexts(&self) -> Result<Vec<(String, Context)>> {
        self.contexts.iter().map(ContextSource::build).collect()
    }
}
