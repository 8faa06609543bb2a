use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::read_to_string;
use std::path::Path;
use tracing::{info, warn};

use crate::{Error, General, Shadow, Sharding};

/// Router configuration, usually loaded from `shardline.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: General,

    /// Sharding rule.
    #[serde(default)]
    pub sharding: Sharding,

    /// Shadow rule.
    #[serde(default)]
    pub shadow: Shadow,
}

impl std::str::FromStr for Config {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        toml::from_str(source).map_err(|err| Error::parse(source, err))
    }
}

impl Config {
    /// Load configuration from disk. A missing file loads defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let config: Config = if let Ok(source) = read_to_string(path) {
            let config = source.parse()?;
            info!("loaded \"{}\"", path.display());
            config
        } else {
            warn!("\"{}\" doesn't exist, loading defaults instead", path.display());
            Config::default()
        };

        config.check();

        Ok(config)
    }

    /// Log every problem found in the configuration.
    /// The router still starts; broken references fail at rule build time.
    pub fn check(&self) {
        for problem in self.problems() {
            warn!("{}", problem);
        }
    }

    /// Problems that won't stop the config from loading but
    /// will likely break routing.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = vec![];
        let data_sources: HashSet<&str> = self
            .general
            .data_sources
            .iter()
            .map(|ds| ds.as_str())
            .collect();

        if let Some(default) = &self.general.default_data_source {
            if !data_sources.contains(default.as_str()) {
                problems.push(format!(
                    "default_data_source \"{}\" is not listed in data_sources",
                    default
                ));
            }
        }

        let sharding = &self.sharding;
        let mut names = HashSet::new();
        for table in &sharding.tables {
            if !names.insert(table.name.to_lowercase()) {
                problems.push(format!("sharded table \"{}\" is duplicated", table.name));
            }

            if sharding
                .broadcast_tables
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&table.name))
            {
                problems.push(format!(
                    "table \"{}\" is both sharded and broadcast",
                    table.name
                ));
            }

            for strategy in [&table.database_strategy, &table.table_strategy]
                .into_iter()
                .flatten()
            {
                if sharding.algorithm(&strategy.algorithm).is_none() {
                    problems.push(format!(
                        "table \"{}\" uses unknown sharding algorithm \"{}\"",
                        table.name, strategy.algorithm
                    ));
                }
            }
        }

        for strategy in [
            &sharding.default_database_strategy,
            &sharding.default_table_strategy,
        ]
        .into_iter()
        .flatten()
        {
            if sharding.algorithm(&strategy.algorithm).is_none() {
                problems.push(format!(
                    "default strategy uses unknown sharding algorithm \"{}\"",
                    strategy.algorithm
                ));
            }
        }

        for group in &sharding.binding_tables {
            for name in group {
                if sharding.table(name).is_none() {
                    problems.push(format!(
                        "binding table \"{}\" has no sharding rule",
                        name
                    ));
                }
            }
        }

        let shadow = &self.shadow;
        for mapping in &shadow.data_sources {
            for ds in [&mapping.production, &mapping.shadow] {
                if !data_sources.is_empty() && !data_sources.contains(ds.as_str()) {
                    problems.push(format!(
                        "shadow mapping \"{}\" references unknown data source \"{}\"",
                        mapping.name, ds
                    ));
                }
            }
        }

        for table in &shadow.tables {
            for name in &table.data_sources {
                if shadow.data_source(name).is_none() {
                    problems.push(format!(
                        "shadow table \"{}\" references unknown mapping \"{}\"",
                        table.name, name
                    ));
                }
            }
            for name in &table.algorithms {
                if shadow.algorithm(name).is_none() {
                    problems.push(format!(
                        "shadow table \"{}\" uses unknown shadow algorithm \"{}\"",
                        table.name, name
                    ));
                }
            }
        }

        if let Some(name) = &shadow.default_algorithm {
            if shadow.algorithm(name).is_none() {
                problems.push(format!("default shadow algorithm \"{}\" is not defined", name));
            }
        }

        problems
    }
}
