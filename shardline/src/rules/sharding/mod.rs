//! Sharding rule: where each logic table's rows live.

pub mod algorithm;

use std::fmt::Display;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use shardline_config::{Sharding, StrategyConfig};
use tracing::debug;

pub use algorithm::{
    HashModShardingAlgorithm, InlineShardingAlgorithm, ListShardingAlgorithm,
    ModShardingAlgorithm, ShardingAlgorithm,
};

use super::{inline, AlgorithmRegistry, Error};

/// Physical table in a physical data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DataNode {
    pub data_source: String,
    pub table: String,
}

impl DataNode {
    pub fn new(data_source: &str, table: &str) -> Self {
        Self {
            data_source: data_source.into(),
            table: table.into(),
        }
    }

    /// Parse `data_source.table`.
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text.trim().split_once('.') {
            Some((data_source, table)) if !data_source.is_empty() && !table.is_empty() => {
                Ok(Self::new(data_source, table))
            }
            _ => Err(Error::DataNode(text.into())),
        }
    }
}

impl Display for DataNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.data_source, self.table)
    }
}

/// Sharding column and the algorithm applied to its values.
#[derive(Debug, Clone)]
pub struct ShardingStrategy {
    pub column: String,
    pub algorithm_name: String,
    pub algorithm: Arc<dyn ShardingAlgorithm>,
}

impl ShardingStrategy {
    fn new(
        config: &StrategyConfig,
        algorithms: &IndexMap<String, Arc<dyn ShardingAlgorithm>>,
    ) -> Result<Self, Error> {
        let algorithm = algorithms
            .get(&config.algorithm)
            .cloned()
            .ok_or_else(|| Error::UnknownAlgorithm(config.algorithm.clone()))?;

        Ok(Self {
            column: config.column.to_lowercase(),
            algorithm_name: config.algorithm.clone(),
            algorithm,
        })
    }
}

/// Sharded logic table.
#[derive(Debug, Clone)]
pub struct TableRule {
    pub logic_table: String,
    /// Every physical table, in configuration order.
    pub data_nodes: Vec<DataNode>,
    pub database_strategy: Option<ShardingStrategy>,
    pub table_strategy: Option<ShardingStrategy>,
}

impl TableRule {
    /// Data sources holding this table, without duplicates.
    pub fn data_sources(&self) -> Vec<&str> {
        let mut data_sources: Vec<&str> = vec![];
        for node in &self.data_nodes {
            if !data_sources.contains(&node.data_source.as_str()) {
                data_sources.push(&node.data_source);
            }
        }
        data_sources
    }

    /// Physical tables in `data_source`, in configuration order.
    pub fn actual_tables(&self, data_source: &str) -> Vec<&str> {
        self.data_nodes
            .iter()
            .filter(|node| node.data_source == data_source)
            .map(|node| node.table.as_str())
            .collect()
    }

    /// Position of `node` among the tables of its data source.
    pub fn position(&self, node: &DataNode) -> Option<usize> {
        self.actual_tables(&node.data_source)
            .iter()
            .position(|table| table.eq_ignore_ascii_case(&node.table))
    }

    pub fn is_sharding_column(&self, column: &str) -> bool {
        [&self.database_strategy, &self.table_strategy]
            .into_iter()
            .flatten()
            .any(|strategy| strategy.column.eq_ignore_ascii_case(column))
    }

    pub fn sharding_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = vec![];
        for strategy in [&self.database_strategy, &self.table_strategy]
            .into_iter()
            .flatten()
        {
            if !columns.contains(&strategy.column.as_str()) {
                columns.push(&strategy.column);
            }
        }
        columns
    }
}

/// Compiled `[sharding]` section.
#[derive(Debug, Clone, Default)]
pub struct ShardingRule {
    tables: IndexMap<String, TableRule>,
    broadcast_tables: Vec<String>,
    binding_groups: Vec<Vec<String>>,
}

impl ShardingRule {
    /// Compile the sharding section. Tables without `actual_data_nodes`
    /// get one node per data source, named like the logic table.
    pub fn from_config(
        config: &Sharding,
        data_sources: &[String],
        registry: &AlgorithmRegistry,
    ) -> Result<Self, Error> {
        let mut algorithms = IndexMap::new();
        for algorithm in &config.algorithms {
            algorithms.insert(algorithm.name.clone(), registry.sharding(algorithm)?);
        }

        let mut tables = IndexMap::new();
        for table in &config.tables {
            let data_nodes = match &table.actual_data_nodes {
                Some(expression) => inline::expand(expression)?
                    .iter()
                    .map(|node| DataNode::parse(node))
                    .collect::<Result<Vec<_>, _>>()?,
                None => data_sources
                    .iter()
                    .map(|data_source| DataNode::new(data_source, &table.name))
                    .collect(),
            };

            if !data_sources.is_empty() {
                if let Some(node) = data_nodes
                    .iter()
                    .find(|node| !data_sources.contains(&node.data_source))
                {
                    return Err(Error::UnknownDataSource(node.data_source.clone()));
                }
            }

            let database_strategy = table
                .database_strategy
                .as_ref()
                .or(config.default_database_strategy.as_ref())
                .map(|strategy| ShardingStrategy::new(strategy, &algorithms))
                .transpose()?;
            let table_strategy = table
                .table_strategy
                .as_ref()
                .or(config.default_table_strategy.as_ref())
                .map(|strategy| ShardingStrategy::new(strategy, &algorithms))
                .transpose()?;

            debug!(
                "sharded table \"{}\" has {} data nodes",
                table.name,
                data_nodes.len()
            );

            tables.insert(
                table.name.to_lowercase(),
                TableRule {
                    logic_table: table.name.clone(),
                    data_nodes,
                    database_strategy,
                    table_strategy,
                },
            );
        }

        Ok(Self {
            tables,
            broadcast_tables: config
                .broadcast_tables
                .iter()
                .map(|table| table.to_lowercase())
                .collect(),
            binding_groups: config
                .binding_tables
                .iter()
                .map(|group| group.iter().map(|table| table.to_lowercase()).collect())
                .collect(),
        })
    }

    pub fn table_rule(&self, table: &str) -> Option<&TableRule> {
        self.tables.get(&table.to_lowercase())
    }

    pub fn table_rules(&self) -> impl Iterator<Item = &TableRule> {
        self.tables.values()
    }

    pub fn is_sharded(&self, table: &str) -> bool {
        self.table_rule(table).is_some()
    }

    pub fn is_broadcast(&self, table: &str) -> bool {
        self.broadcast_tables.contains(&table.to_lowercase())
    }

    pub fn broadcast_tables(&self) -> &[String] {
        &self.broadcast_tables
    }

    /// Binding group `table` belongs to.
    pub fn binding_group(&self, table: &str) -> Option<&[String]> {
        let table = table.to_lowercase();
        self.binding_groups
            .iter()
            .find(|group| group.contains(&table))
            .map(|group| group.as_slice())
    }

    /// Both tables are in the same binding group.
    pub fn is_bound(&self, left: &str, right: &str) -> bool {
        left.eq_ignore_ascii_case(right)
            || self
                .binding_group(left)
                .is_some_and(|group| group.contains(&right.to_lowercase()))
    }

    pub fn is_sharding_column(&self, table: &str, column: &str) -> bool {
        self.table_rule(table)
            .is_some_and(|rule| rule.is_sharding_column(column))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.broadcast_tables.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::config;

    fn rule() -> ShardingRule {
        let config = config();
        ShardingRule::from_config(
            &config.sharding,
            &config.general.data_sources,
            &AlgorithmRegistry::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_table_rule() {
        let rule = rule();
        let order = rule.table_rule("T_ORDER").unwrap();
        assert_eq!(order.data_nodes.len(), 4);
        assert_eq!(order.data_sources(), vec!["ds_0", "ds_1"]);
        assert_eq!(order.actual_tables("ds_1"), vec!["t_order_0", "t_order_1"]);
        assert_eq!(order.position(&DataNode::new("ds_1", "t_order_1")), Some(1));
        assert_eq!(order.sharding_columns(), vec!["user_id", "order_id"]);
        assert!(rule.is_sharding_column("t_order_item", "ORDER_ID"));
        assert!(!rule.is_sharding_column("t_order", "status"));
    }

    #[test]
    fn test_groups() {
        let rule = rule();
        assert!(rule.is_bound("t_order", "T_ORDER_ITEM"));
        assert!(!rule.is_bound("t_order", "t_user"));
        assert!(rule.is_broadcast("t_config"));
        assert!(!rule.is_sharded("t_config"));
    }

    #[test]
    fn test_default_nodes_and_errors() {
        let mut config = config();
        config.sharding.tables[0].actual_data_nodes = None;
        let rule = ShardingRule::from_config(
            &config.sharding,
            &config.general.data_sources,
            &AlgorithmRegistry::default(),
        )
        .unwrap();
        assert_eq!(
            rule.table_rule("t_order").unwrap().data_nodes,
            vec![
                DataNode::new("ds_0", "t_order"),
                DataNode::new("ds_1", "t_order")
            ]
        );

        config.sharding.tables[0].actual_data_nodes = Some("ds_${0..2}.t_order".into());
        let err = ShardingRule::from_config(
            &config.sharding,
            &config.general.data_sources,
            &AlgorithmRegistry::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownDataSource(ds) if ds == "ds_2"));

        config.sharding.tables[0].actual_data_nodes = None;
        config.sharding.algorithms.clear();
        let err = ShardingRule::from_config(
            &config.sharding,
            &config.general.data_sources,
            &AlgorithmRegistry::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm(_)));
    }
}
