//! Shadow rule: which statements go to shadow data sources.

pub mod algorithm;

use indexmap::IndexMap;
use serde::Serialize;
use shardline_config::Shadow;
use tracing::debug;

pub use algorithm::{
    ColumnRegexMatchAlgorithm, ColumnShadowAlgorithm, ColumnValueMatchAlgorithm,
    HintShadowAlgorithm, ShadowAlgorithm, ShadowHint, ShadowOperation, SimpleHintAlgorithm,
};

use super::{AlgorithmRegistry, Error};

/// Production data source and its shadow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ShadowDataSourceRule {
    pub name: String,
    pub production: String,
    pub shadow: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowTableRule {
    pub name: String,
    /// Names of [`ShadowDataSourceRule`]s.
    pub data_sources: Vec<String>,
    pub algorithms: Vec<String>,
}

/// Compiled `[shadow]` section.
#[derive(Debug, Clone, Default)]
pub struct ShadowRule {
    enabled: bool,
    data_sources: IndexMap<String, ShadowDataSourceRule>,
    tables: IndexMap<String, ShadowTableRule>,
    algorithms: IndexMap<String, ShadowAlgorithm>,
    default_algorithm: Option<String>,
}

impl ShadowRule {
    pub fn from_config(config: &Shadow, registry: &AlgorithmRegistry) -> Result<Self, Error> {
        let data_sources: IndexMap<String, ShadowDataSourceRule> = config
            .data_sources
            .iter()
            .map(|ds| {
                (
                    ds.name.clone(),
                    ShadowDataSourceRule {
                        name: ds.name.clone(),
                        production: ds.production.clone(),
                        shadow: ds.shadow.clone(),
                    },
                )
            })
            .collect();

        let mut algorithms = IndexMap::new();
        for algorithm in &config.algorithms {
            algorithms.insert(algorithm.name.clone(), registry.shadow(algorithm)?);
        }

        let mut tables = IndexMap::new();
        for table in &config.tables {
            if let Some(name) = table
                .data_sources
                .iter()
                .find(|name| !data_sources.contains_key(*name))
            {
                return Err(Error::UnknownShadowDataSource(name.clone()));
            }
            if let Some(name) = table
                .algorithms
                .iter()
                .find(|name| !algorithms.contains_key(*name))
            {
                return Err(Error::UnknownAlgorithm(name.clone()));
            }

            tables.insert(
                table.name.to_lowercase(),
                ShadowTableRule {
                    name: table.name.clone(),
                    data_sources: table.data_sources.clone(),
                    algorithms: table.algorithms.clone(),
                },
            );
        }

        if let Some(name) = &config.default_algorithm {
            match algorithms.get(name) {
                Some(ShadowAlgorithm::Hint(_)) => (),
                Some(ShadowAlgorithm::Column(_)) => {
                    return Err(Error::WrongAlgorithm {
                        name: name.clone(),
                        expected: "hint",
                    })
                }
                None => return Err(Error::UnknownAlgorithm(name.clone())),
            }
        }

        debug!(
            "shadow rule has {} tables and {} data source mappings",
            tables.len(),
            data_sources.len()
        );

        Ok(Self {
            enabled: config.enabled,
            data_sources,
            tables,
            algorithms,
            default_algorithm: config.default_algorithm.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn table(&self, name: &str) -> Option<&ShadowTableRule> {
        self.tables.get(&name.to_lowercase())
    }

    pub fn is_shadow_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn tables(&self) -> impl Iterator<Item = &ShadowTableRule> {
        self.tables.values()
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &ShadowDataSourceRule> {
        self.data_sources.values()
    }

    /// Data source mappings a shadow table may be diverted through.
    pub fn mappings(&self, table: &str) -> Vec<&ShadowDataSourceRule> {
        self.table(table)
            .map(|table| {
                table
                    .data_sources
                    .iter()
                    .filter_map(|name| self.data_sources.get(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shadow of a production data source.
    pub fn shadow_data_source(&self, production: &str) -> Option<&str> {
        self.data_sources
            .values()
            .find(|ds| ds.production == production)
            .map(|ds| ds.shadow.as_str())
    }

    /// Column algorithms of `table` that apply to `operation`.
    pub fn column_algorithms(
        &self,
        table: &str,
        operation: ShadowOperation,
    ) -> Vec<(&str, &dyn ColumnShadowAlgorithm)> {
        self.table_algorithms(table)
            .filter_map(|(name, algorithm)| match algorithm {
                ShadowAlgorithm::Column(column) if column.operation() == operation => {
                    Some((name, column.as_ref()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn hint_algorithms(&self, table: &str) -> Vec<(&str, &dyn HintShadowAlgorithm)> {
        self.table_algorithms(table)
            .filter_map(|(name, algorithm)| match algorithm {
                ShadowAlgorithm::Hint(hint) => Some((name, hint.as_ref())),
                ShadowAlgorithm::Column(_) => None,
            })
            .collect()
    }

    /// Hint algorithm used when no shadow table is involved.
    pub fn default_algorithm(&self) -> Option<(&str, &dyn HintShadowAlgorithm)> {
        let name = self.default_algorithm.as_deref()?;
        match self.algorithms.get(name)? {
            ShadowAlgorithm::Hint(hint) => Some((name, hint.as_ref())),
            ShadowAlgorithm::Column(_) => None,
        }
    }

    fn table_algorithms(&self, table: &str) -> impl Iterator<Item = (&str, &ShadowAlgorithm)> {
        self.table(table)
            .into_iter()
            .flat_map(|table| table.algorithms.iter())
            .filter_map(|name| {
                self.algorithms
                    .get(name)
                    .map(|algorithm| (name.as_str(), algorithm))
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::config;

    #[test]
    fn test_from_config() {
        let rule = ShadowRule::from_config(&config().shadow, &AlgorithmRegistry::default()).unwrap();
        assert!(rule.is_enabled());
        assert!(rule.is_shadow_table("T_USER"));
        assert_eq!(rule.mappings("t_user").len(), 2);
        assert_eq!(rule.shadow_data_source("ds_1"), Some("ds_shadow_1"));

        let insert = rule.column_algorithms("t_user", ShadowOperation::Insert);
        assert_eq!(insert.len(), 1);
        assert_eq!(insert[0].0, "user_id_insert_match");
        assert!(rule.column_algorithms("t_user", ShadowOperation::Delete).is_empty());
        assert_eq!(rule.hint_algorithms("t_user").len(), 1);
        assert_eq!(rule.default_algorithm().map(|(name, _)| name), Some("simple_hint"));
        assert!(rule.hint_algorithms("t_order").is_empty());
    }

    #[test]
    fn test_config_errors() {
        let mut shadow = config().shadow;
        shadow.tables[0].data_sources.push("missing".into());
        assert!(matches!(
            ShadowRule::from_config(&shadow, &AlgorithmRegistry::default()),
            Err(Error::UnknownShadowDataSource(_))
        ));

        let mut shadow = config().shadow;
        shadow.default_algorithm = Some("user_id_insert_match".into());
        assert!(matches!(
            ShadowRule::from_config(&shadow, &AlgorithmRegistry::default()),
            Err(Error::WrongAlgorithm { .. })
        ));
    }
}
