//! Routing rule model, compiled from [`shardline_config::Config`].

pub mod error;
pub mod inline;
pub mod registry;
pub mod shadow;
pub mod sharding;
pub mod store;

use std::collections::HashSet;

use shardline_config::Config;
use tracing::debug;

pub use error::Error;
pub use registry::AlgorithmRegistry;
pub use shadow::{ShadowAlgorithm, ShadowDataSourceRule, ShadowHint, ShadowOperation, ShadowRule};
pub use sharding::{DataNode, ShardingAlgorithm, ShardingRule, ShardingStrategy, TableRule};
pub use store::RuleStore;

/// Every rule the router needs for one statement.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    version: u64,
    sharding: ShardingRule,
    shadow: ShadowRule,
    data_sources: Vec<String>,
    default_data_source: Option<String>,
    default_database: String,
}

impl RuleSet {
    /// Compile rules. When `general.data_sources` is empty, data sources
    /// are taken from the sharded tables' data nodes.
    pub fn from_config(config: &Config, registry: &AlgorithmRegistry) -> Result<Self, Error> {
        let sharding =
            ShardingRule::from_config(&config.sharding, &config.general.data_sources, registry)?;
        let shadow = ShadowRule::from_config(&config.shadow, registry)?;

        let mut data_sources = config.general.data_sources.clone();
        if data_sources.is_empty() {
            let mut seen = HashSet::new();
            let default = config.general.default_data_source.iter();
            let nodes = sharding
                .table_rules()
                .flat_map(|rule| rule.data_nodes.iter().map(|node| &node.data_source));
            for data_source in default.chain(nodes) {
                if seen.insert(data_source.clone()) {
                    data_sources.push(data_source.clone());
                }
            }
        }

        let default_data_source = config
            .general
            .default_data_source
            .clone()
            .or_else(|| data_sources.first().cloned());

        if let Some(default) = &default_data_source {
            if !data_sources.contains(default) {
                return Err(Error::UnknownDataSource(default.clone()));
            }
        }

        debug!(
            "rules compiled: {} data sources, default {:?}",
            data_sources.len(),
            default_data_source
        );

        Ok(Self {
            version: 0,
            sharding,
            shadow,
            data_sources,
            default_data_source,
            default_database: config.general.default_database.clone(),
        })
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Publish counter from [`RuleStore`]; 0 if never published.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn sharding(&self) -> &ShardingRule {
        &self.sharding
    }

    pub fn shadow(&self) -> &ShadowRule {
        &self.shadow
    }

    pub fn data_sources(&self) -> &[String] {
        &self.data_sources
    }

    pub fn default_data_source(&self) -> Option<&str> {
        self.default_data_source.as_deref()
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    /// Tables the binder treats as enhanced: sharded, broadcast and shadow tables.
    pub fn enhanced_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = vec![];
        let names = self
            .sharding
            .table_rules()
            .map(|rule| rule.logic_table.to_lowercase())
            .chain(self.sharding.broadcast_tables().iter().cloned())
            .chain(self.shadow.tables().map(|table| table.name.to_lowercase()));

        for name in names {
            if !tables.contains(&name) {
                tables.push(name);
            }
        }
        tables
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::config;

    #[test]
    fn test_from_config() {
        let rules = RuleSet::from_config(&config(), &AlgorithmRegistry::default()).unwrap();
        assert_eq!(rules.version(), 0);
        assert_eq!(rules.data_sources(), &["ds_0".to_string(), "ds_1".to_string()]);
        assert_eq!(rules.default_data_source(), Some("ds_0"));
        assert_eq!(rules.default_database(), "logic_db");
        assert_eq!(
            rules.enhanced_tables(),
            vec!["t_order", "t_order_item", "t_config", "t_user"]
        );
    }

    #[test]
    fn test_derived_data_sources() {
        let mut config = config();
        config.general.data_sources.clear();
        config.general.default_data_source = Some("ds_9".into());
        let rules = RuleSet::from_config(&config, &AlgorithmRegistry::default()).unwrap();
        assert_eq!(rules.data_sources(), &["ds_9", "ds_0", "ds_1"]);
        assert_eq!(rules.default_data_source(), Some("ds_9"));

        let mut config = crate::test::config();
        config.general.default_data_source = Some("ds_9".into());
        let err = RuleSet::from_config(&config, &AlgorithmRegistry::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownDataSource(ds) if ds == "ds_9"));
    }
}
