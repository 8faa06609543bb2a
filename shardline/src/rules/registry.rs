//! Algorithm factories, keyed by algorithm type.

use std::fmt::Debug;
use std::sync::Arc;

use fnv::FnvHashMap as HashMap;
use shardline_config::AlgorithmConfig;

use super::shadow::{
    ColumnRegexMatchAlgorithm, ColumnValueMatchAlgorithm, ShadowAlgorithm, SimpleHintAlgorithm,
};
use super::sharding::{
    HashModShardingAlgorithm, InlineShardingAlgorithm, ListShardingAlgorithm,
    ModShardingAlgorithm, ShardingAlgorithm,
};
use super::Error;

type ShardingFactory =
    Arc<dyn Fn(&AlgorithmConfig) -> Result<Arc<dyn ShardingAlgorithm>, Error> + Send + Sync>;
type ShadowFactory = Arc<dyn Fn(&AlgorithmConfig) -> Result<ShadowAlgorithm, Error> + Send + Sync>;

/// Builds algorithms from their configuration.
///
/// [`AlgorithmRegistry::default`] knows every built-in type;
/// applications can register their own on top.
#[derive(Clone)]
pub struct AlgorithmRegistry {
    sharding: HashMap<String, ShardingFactory>,
    shadow: HashMap<String, ShadowFactory>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();

        registry.register_sharding("mod", |config| {
            Ok(Arc::new(ModShardingAlgorithm::new(config)?))
        });
        registry.register_sharding("hash_mod", |config| {
            Ok(Arc::new(HashModShardingAlgorithm::new(config)?))
        });
        registry.register_sharding("inline", |config| {
            Ok(Arc::new(InlineShardingAlgorithm::new(config)?))
        });
        registry.register_sharding("list", |config| {
            Ok(Arc::new(ListShardingAlgorithm::new(config)?))
        });

        registry.register_shadow("column_regex_match", |config| {
            Ok(ShadowAlgorithm::Column(Arc::new(
                ColumnRegexMatchAlgorithm::new(config)?,
            )))
        });
        registry.register_shadow("column_value_match", |config| {
            Ok(ShadowAlgorithm::Column(Arc::new(
                ColumnValueMatchAlgorithm::new(config)?,
            )))
        });
        registry.register_shadow("simple_hint", |config| {
            Ok(ShadowAlgorithm::Hint(Arc::new(SimpleHintAlgorithm::new(
                config,
            )?)))
        });

        registry
    }
}

impl Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sharding: Vec<&String> = self.sharding.keys().collect();
        let mut shadow: Vec<&String> = self.shadow.keys().collect();
        sharding.sort();
        shadow.sort();

        f.debug_struct("AlgorithmRegistry")
            .field("sharding", &sharding)
            .field("shadow", &shadow)
            .finish()
    }
}

impl AlgorithmRegistry {
    /// Registry without any algorithm types.
    pub fn empty() -> Self {
        Self {
            sharding: HashMap::default(),
            shadow: HashMap::default(),
        }
    }

    pub fn register_sharding(
        &mut self,
        kind: &str,
        factory: impl Fn(&AlgorithmConfig) -> Result<Arc<dyn ShardingAlgorithm>, Error>
            + Send
            + Sync
            + 'static,
    ) {
        self.sharding.insert(kind.to_lowercase(), Arc::new(factory));
    }

    pub fn register_shadow(
        &mut self,
        kind: &str,
        factory: impl Fn(&AlgorithmConfig) -> Result<ShadowAlgorithm, Error> + Send + Sync + 'static,
    ) {
        self.shadow.insert(kind.to_lowercase(), Arc::new(factory));
    }

    pub fn sharding(&self, config: &AlgorithmConfig) -> Result<Arc<dyn ShardingAlgorithm>, Error> {
        let factory = self
            .sharding
            .get(&config.kind.to_lowercase())
            .ok_or_else(|| Error::UnknownAlgorithmType {
                name: config.name.clone(),
                kind: config.kind.clone(),
            })?;
        factory(config)
    }

    pub fn shadow(&self, config: &AlgorithmConfig) -> Result<ShadowAlgorithm, Error> {
        let factory = self
            .shadow
            .get(&config.kind.to_lowercase())
            .ok_or_else(|| Error::UnknownAlgorithmType {
                name: config.name.clone(),
                kind: config.kind.clone(),
            })?;
        factory(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::segment::Value;

    #[derive(Debug)]
    struct First;

    impl ShardingAlgorithm for First {
        fn shard<'a>(&self, targets: &[&'a str], _value: &Value) -> Option<&'a str> {
            targets.first().copied()
        }
    }

    #[test]
    fn test_builtin_types() {
        let registry = AlgorithmRegistry::default();
        let algorithm = registry
            .sharding(&AlgorithmConfig::new("m", "MOD").prop("sharding_count", 2))
            .unwrap();
        assert_eq!(algorithm.shard(&["ds_0", "ds_1"], &Value::Integer(3)), Some("ds_1"));

        let err = registry
            .sharding(&AlgorithmConfig::new("x", "column_regex_match"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithmType { .. }));

        let hint = registry
            .shadow(&AlgorithmConfig::new("h", "simple_hint").prop("foo", "bar"))
            .unwrap();
        assert!(matches!(hint, ShadowAlgorithm::Hint(_)));
    }

    #[test]
    fn test_register_custom() {
        let mut registry = AlgorithmRegistry::empty();
        assert!(registry.sharding(&AlgorithmConfig::new("f", "first")).is_err());

        registry.register_sharding("first", |_| Ok(Arc::new(First)));
        let algorithm = registry.sharding(&AlgorithmConfig::new("f", "first")).unwrap();
        assert_eq!(algorithm.shard(&["ds_9"], &Value::Null), Some("ds_9"));
        assert!(format!("{:?}", registry).contains("first"));
    }
}
