use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::AlgorithmConfig;

/// Sharding section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Sharding {
    /// Sharded logic tables.
    #[serde(default)]
    pub tables: Vec<ShardedTable>,

    /// Algorithms referenced by strategies.
    #[serde(default)]
    pub algorithms: Vec<AlgorithmConfig>,

    /// Tables present, identically, on every data source.
    #[serde(default)]
    pub broadcast_tables: Vec<String>,

    /// Groups of tables sharded the same way, so joins between
    /// them stay on one data node.
    #[serde(default)]
    pub binding_tables: Vec<Vec<String>>,

    /// Database strategy for tables that don't set their own.
    #[serde(default)]
    pub default_database_strategy: Option<StrategyConfig>,

    /// Table strategy for tables that don't set their own.
    #[serde(default)]
    pub default_table_strategy: Option<StrategyConfig>,
}

impl Sharding {
    /// Find a sharded table by name, case-insensitive.
    pub fn table(&self, name: &str) -> Option<&ShardedTable> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    pub fn algorithm(&self, name: &str) -> Option<&AlgorithmConfig> {
        self.algorithms.iter().find(|algo| algo.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.broadcast_tables.is_empty()
    }
}

/// Sharded table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ShardedTable {
    /// Logic table name, as written in queries.
    pub name: String,
    /// Physical data nodes, as an inline expression,
    /// e.g. `ds_${0..1}.t_order_${0..1}`. If empty, the table
    /// lives under its own name on every data source.
    #[serde(default)]
    pub actual_data_nodes: Option<String>,
    /// Picks the data source.
    #[serde(default)]
    pub database_strategy: Option<StrategyConfig>,
    /// Picks the table within a data source.
    #[serde(default)]
    pub table_strategy: Option<StrategyConfig>,
}

/// Sharding column and the algorithm applied to its value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub column: String,
    pub algorithm: String,
}

impl StrategyConfig {
    pub fn new(column: &str, algorithm: &str) -> Self {
        Self {
            column: column.into(),
            algorithm: algorithm.into(),
        }
    }
}
