//! Built-in sharding algorithms.

use std::collections::HashMap;
use std::fmt::Debug;

use once_cell::sync::Lazy;
use regex::Regex;
use shardline_config::AlgorithmConfig;

use super::super::Error;
use crate::segment::Value;

static INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(.*)\$(?:->)?\{\s*\w+\s*%\s*([0-9]+)\s*\}(.*)$"#).unwrap()
});

/// Picks the data source or table a sharding value belongs to.
pub trait ShardingAlgorithm: Debug + Send + Sync {
    /// Target among `targets` for `value`, or `None` if the value
    /// doesn't belong to any of them.
    fn shard<'a>(&self, targets: &[&'a str], value: &Value) -> Option<&'a str>;
}

/// Target whose name ends with `suffix`, e.g. `t_order_3` for 3.
fn by_suffix<'a>(targets: &[&'a str], suffix: u64) -> Option<&'a str> {
    targets.iter().copied().find(|target| {
        let digits = target
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| &target[i..]);
        digits.and_then(|digits| digits.parse::<u64>().ok()) == Some(suffix)
    })
}

/// `sharding_count`, rejected if it doesn't fit `T`.
fn sharding_count<T: TryFrom<usize>>(config: &AlgorithmConfig) -> Result<T, Error> {
    let count = config.required_usize("sharding_count")?;
    T::try_from(count).map_err(|_| {
        Error::Config(shardline_config::Error::InvalidProperty {
            algorithm: config.name.clone(),
            property: "sharding_count".into(),
            value: count.to_string(),
        })
    })
}

/// `value % sharding_count`, matched against the target's numeric suffix.
#[derive(Debug, Clone)]
pub struct ModShardingAlgorithm {
    count: i64,
}

impl ModShardingAlgorithm {
    pub fn new(config: &AlgorithmConfig) -> Result<Self, Error> {
        Ok(Self {
            count: sharding_count(config)?,
        })
    }
}

impl ShardingAlgorithm for ModShardingAlgorithm {
    fn shard<'a>(&self, targets: &[&'a str], value: &Value) -> Option<&'a str> {
        let value = value.integer()?;
        let suffix = u64::try_from(value.rem_euclid(self.count)).ok()?;
        by_suffix(targets, suffix)
    }
}

/// CRC32C of the value's text, modulo `sharding_count`.
#[derive(Debug, Clone)]
pub struct HashModShardingAlgorithm {
    count: u64,
}

impl HashModShardingAlgorithm {
    pub fn new(config: &AlgorithmConfig) -> Result<Self, Error> {
        Ok(Self {
            count: sharding_count(config)?,
        })
    }
}

impl ShardingAlgorithm for HashModShardingAlgorithm {
    fn shard<'a>(&self, targets: &[&'a str], value: &Value) -> Option<&'a str> {
        if value.is_null() {
            return None;
        }
        let hash = u64::from(crc32c::crc32c(value.to_string().as_bytes()));
        by_suffix(targets, hash % self.count)
    }
}

/// `algorithm_expression = "t_order_${order_id % 4}"`.
#[derive(Debug, Clone)]
pub struct InlineShardingAlgorithm {
    prefix: String,
    modulo: i64,
    suffix: String,
}

impl InlineShardingAlgorithm {
    pub fn new(config: &AlgorithmConfig) -> Result<Self, Error> {
        let expression = config.required("algorithm_expression")?;
        let captures = INLINE
            .captures(&expression)
            .ok_or_else(|| Error::InlineExpression(expression.clone()))?;

        let modulo = captures[2]
            .parse::<i64>()
            .ok()
            .filter(|modulo| *modulo > 0)
            .ok_or_else(|| Error::InlineExpression(expression.clone()))?;

        Ok(Self {
            prefix: captures[1].to_string(),
            modulo,
            suffix: captures[3].to_string(),
        })
    }
}

impl ShardingAlgorithm for InlineShardingAlgorithm {
    fn shard<'a>(&self, targets: &[&'a str], value: &Value) -> Option<&'a str> {
        let value = value.integer()?;
        let name = format!(
            "{}{}{}",
            self.prefix,
            value.rem_euclid(self.modulo),
            self.suffix
        );
        targets
            .iter()
            .copied()
            .find(|target| target.eq_ignore_ascii_case(&name))
    }
}

/// Explicit value lists: `props = { ds_0 = "1,2", ds_1 = "3" }`.
#[derive(Debug, Clone)]
pub struct ListShardingAlgorithm {
    lists: HashMap<String, Vec<String>>,
}

impl ListShardingAlgorithm {
    pub fn new(config: &AlgorithmConfig) -> Result<Self, Error> {
        let lists = config
            .props
            .iter()
            .map(|(target, values)| {
                let values = values
                    .to_string()
                    .split(',')
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .collect();
                (target.to_lowercase(), values)
            })
            .collect::<HashMap<_, Vec<String>>>();

        if lists.is_empty() {
            return Err(shardline_config::Error::MissingProperty {
                algorithm: config.name.clone(),
                property: "<target>".into(),
            }
            .into());
        }

        Ok(Self { lists })
    }
}

impl ShardingAlgorithm for ListShardingAlgorithm {
    fn shard<'a>(&self, targets: &[&'a str], value: &Value) -> Option<&'a str> {
        let value = value.to_string();
        targets.iter().copied().find(|target| {
            self.lists
                .get(&target.to_lowercase())
                .is_some_and(|values| values.iter().any(|v| *v == value))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TABLES: [&str; 4] = ["t_order_0", "t_order_1", "t_order_2", "t_order_3"];

    #[test]
    fn test_mod() {
        let algorithm =
            ModShardingAlgorithm::new(&AlgorithmConfig::new("m", "mod").prop("sharding_count", 4))
                .unwrap();
        assert_eq!(algorithm.shard(&TABLES, &Value::Integer(6)), Some("t_order_2"));
        assert_eq!(algorithm.shard(&TABLES, &Value::from("7")), Some("t_order_3"));
        assert_eq!(algorithm.shard(&TABLES, &Value::Integer(-1)), Some("t_order_3"));
        assert_eq!(algorithm.shard(&TABLES, &Value::from("abc")), None);
        assert_eq!(algorithm.shard(&TABLES[..2], &Value::Integer(3)), None);
    }

    #[test]
    fn test_mod_count_out_of_range() {
        let too_large = u64::MAX.to_string();
        let config = AlgorithmConfig::new("m", "mod").prop("sharding_count", too_large.as_str());
        assert!(matches!(
            ModShardingAlgorithm::new(&config),
            Err(Error::Config(shardline_config::Error::InvalidProperty { .. }))
        ));

        let config = AlgorithmConfig::new("m", "mod").prop("sharding_count", i64::MAX);
        let algorithm = ModShardingAlgorithm::new(&config).unwrap();
        assert_eq!(algorithm.shard(&TABLES, &Value::Integer(2)), Some("t_order_2"));

        let config = AlgorithmConfig::new("m", "mod").prop("sharding_count", 0);
        assert!(ModShardingAlgorithm::new(&config).is_err());
    }

    #[test]
    fn test_hash_mod() {
        let algorithm = HashModShardingAlgorithm::new(
            &AlgorithmConfig::new("h", "hash_mod").prop("sharding_count", 4),
        )
        .unwrap();
        let expected = crc32c::crc32c(b"alice") as u64 % 4;
        let target = algorithm.shard(&TABLES, &Value::from("alice")).unwrap();
        assert_eq!(target, TABLES[expected as usize]);
        assert_eq!(algorithm.shard(&TABLES, &Value::Null), None);
    }

    #[test]
    fn test_inline() {
        let algorithm = InlineShardingAlgorithm::new(
            &AlgorithmConfig::new("i", "inline")
                .prop("algorithm_expression", "t_order_${order_id % 4}"),
        )
        .unwrap();
        assert_eq!(algorithm.shard(&TABLES, &Value::Integer(9)), Some("t_order_1"));

        let invalid = AlgorithmConfig::new("i", "inline").prop("algorithm_expression", "t_order");
        assert!(matches!(
            InlineShardingAlgorithm::new(&invalid),
            Err(Error::InlineExpression(_))
        ));
    }

    #[test]
    fn test_list() {
        let algorithm = ListShardingAlgorithm::new(
            &AlgorithmConfig::new("l", "list")
                .prop("ds_0", "cn, jp")
                .prop("ds_1", "us"),
        )
        .unwrap();
        let targets = ["ds_0", "ds_1"];
        assert_eq!(algorithm.shard(&targets, &Value::from("jp")), Some("ds_0"));
        assert_eq!(algorithm.shard(&targets, &Value::from("us")), Some("ds_1"));
        assert_eq!(algorithm.shard(&targets, &Value::from("fr")), None);
    }
}
