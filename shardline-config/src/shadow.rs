use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::AlgorithmConfig;

/// Shadow traffic section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Shadow {
    /// Shadow routing is evaluated only when enabled.
    ///
    /// _Default:_ `true`
    #[serde(default = "Shadow::enabled")]
    pub enabled: bool,

    /// Production to shadow data source mappings.
    #[serde(default)]
    pub data_sources: Vec<ShadowDataSource>,

    /// Tables that can carry shadow traffic.
    #[serde(default)]
    pub tables: Vec<ShadowTable>,

    /// Algorithms referenced by tables.
    #[serde(default)]
    pub algorithms: Vec<AlgorithmConfig>,

    /// Hint algorithm used for statements that touch no shadow table.
    #[serde(default)]
    pub default_algorithm: Option<String>,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            enabled: Self::enabled(),
            data_sources: vec![],
            tables: vec![],
            algorithms: vec![],
            default_algorithm: None,
        }
    }
}

impl Shadow {
    fn enabled() -> bool {
        true
    }

    pub fn data_source(&self, name: &str) -> Option<&ShadowDataSource> {
        self.data_sources.iter().find(|ds| ds.name == name)
    }

    pub fn algorithm(&self, name: &str) -> Option<&AlgorithmConfig> {
        self.algorithms.iter().find(|algo| algo.name == name)
    }
}

/// Named production/shadow pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ShadowDataSource {
    pub name: String,
    pub production: String,
    pub shadow: String,
}

impl ShadowDataSource {
    pub fn new(name: &str, production: &str, shadow: &str) -> Self {
        Self {
            name: name.into(),
            production: production.into(),
            shadow: shadow.into(),
        }
    }
}

/// Shadow table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ShadowTable {
    pub name: String,
    /// Names of `[[shadow.data_sources]]` entries this table is diverted through.
    #[serde(default)]
    pub data_sources: Vec<String>,
    /// Names of `[[shadow.algorithms]]` entries evaluated for this table.
    #[serde(default)]
    pub algorithms: Vec<String>,
}
