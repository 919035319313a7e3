//! Configuration
//!
//! Behaviour that differs between editors embedding the graph is read from
//! TOML:
//!
//! ```toml
//! [graph]
//! fan_in = "single"            # or "multiple"
//! default_inlet_value = 0.0
//!
//! [evaluation]
//! cycle_policy = "fail"        # or "use_cached"
//! ```
//!
//! Every section and field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::expr::Value;

/// How many links an inlet may receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanIn {
    /// At most one link per inlet. A second link is rejected.
    #[default]
    Single,
    /// Any number of links per inlet. Their values are summed.
    Multiple,
}

/// What evaluation does when it re-enters an operator that is still being
/// computed, i.e. when the requested node sits on a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Fail with `CyclicDependency`.
    #[default]
    Fail,
    /// Use the re-entered operator's cached value, or the reading inlet's
    /// default when it was never computed.
    UseCached,
}

/// `[graph]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub fan_in: FanIn,

    /// Default value of inlets created through the graph.
    pub default_inlet_value: Value,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            fan_in: FanIn::Single,
            default_inlet_value: 0.0,
        }
    }
}

/// `[evaluation]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub cycle_policy: CyclePolicy,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub evaluation: EvalConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.graph.default_inlet_value.is_finite() {
            return Err(GraphError::Config(format!(
                "graph.default_inlet_value must be finite, got {}",
                self.graph.default_inlet_value
            )));
        }
        Ok(())
    }
}

/// Load a configuration file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let contents = fs::read_to_string(path.as_ref())?;
    Config::from_toml_str(&contents)
}

/// `Flowgraph.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Flowgraph.toml")
}
