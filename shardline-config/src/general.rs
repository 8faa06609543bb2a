use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings that apply to every statement the router sees.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct General {
    /// Logical database used when a statement doesn't name one.
    ///
    /// _Default:_ `logic_db`
    #[serde(default = "General::default_database")]
    pub default_database: String,

    /// Physical data sources, in the order broadcast routing visits them.
    #[serde(default)]
    pub data_sources: Vec<String>,

    /// Data source for tables without a sharding rule. If not set,
    /// the first entry of `data_sources` is used.
    #[serde(default)]
    pub default_data_source: Option<String>,

    /// Log output format.
    ///
    /// _Default:_ `text`
    #[serde(default)]
    pub log_format: LogFormat,

    /// Default log level, overridden by `RUST_LOG`.
    ///
    /// _Default:_ `info`
    #[serde(default = "General::log_level")]
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            default_database: Self::default_database(),
            data_sources: vec![],
            default_data_source: None,
            log_format: LogFormat::default(),
            log_level: Self::log_level(),
        }
    }
}

impl General {
    fn default_database() -> String {
        "logic_db".into()
    }

    fn log_level() -> String {
        "info".into()
    }

    /// Data source unsharded tables are routed to.
    pub fn default_data_source(&self) -> Option<&str> {
        self.default_data_source
            .as_deref()
            .or_else(|| self.data_sources.first().map(|s| s.as_str()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
