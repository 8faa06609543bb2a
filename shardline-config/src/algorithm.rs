use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

use super::error::Error;

/// Named algorithm, sharding or shadow.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AlgorithmConfig {
    /// Name rules refer to this algorithm by.
    pub name: String,
    /// Algorithm type, e.g. `mod` or `column_regex_match`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific properties.
    #[serde(default)]
    pub props: Props,
}

impl AlgorithmConfig {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            props: Props::default(),
        }
    }

    pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Get a required string property.
    pub fn required(&self, key: &str) -> Result<String, Error> {
        self.props
            .get(key)
            .map(|value| value.to_string())
            .ok_or_else(|| Error::MissingProperty {
                algorithm: self.name.clone(),
                property: key.into(),
            })
    }

    /// Get a required positive integer property.
    pub fn required_usize(&self, key: &str) -> Result<usize, Error> {
        let value = self.required(key)?;
        match value.parse::<usize>() {
            Ok(number) if number > 0 => Ok(number),
            _ => Err(Error::InvalidProperty {
                algorithm: self.name.clone(),
                property: key.into(),
                value,
            }),
        }
    }
}

/// Property value. TOML users can write numbers and booleans
/// without quoting them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum PropValue {
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl Display for PropValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, JsonSchema)]
#[serde(transparent)]
pub struct Props {
    values: BTreeMap<String, PropValue>,
}

impl Props {
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<PropValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropValue)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_required_props() {
        let algorithm = AlgorithmConfig::new("table_mod", "mod").prop("sharding_count", 4);
        assert_eq!(algorithm.required_usize("sharding_count").unwrap(), 4);

        let err = algorithm.required("column").unwrap_err();
        assert!(matches!(err, Error::MissingProperty { .. }));

        let algorithm = AlgorithmConfig::new("table_mod", "mod").prop("sharding_count", "zero");
        let err = algorithm.required_usize("sharding_count").unwrap_err();
        assert!(matches!(err, Error::InvalidProperty { .. }));

        let algorithm = AlgorithmConfig::new("table_mod", "mod").prop("sharding_count", 0);
        assert!(algorithm.required_usize("sharding_count").is_err());
    }

    #[test]
    fn test_untagged_props() {
        let algorithm: AlgorithmConfig = toml::from_str(
            r#"
            name = "hint"
            type = "simple_hint"
            props = { shadow = true, foo = "bar", count = 3 }
            "#,
        )
        .unwrap();

        assert_eq!(algorithm.kind, "simple_hint");
        assert_eq!(algorithm.props.get("shadow"), Some(&PropValue::Boolean(true)));
        assert_eq!(algorithm.required("foo").unwrap(), "bar");
        assert_eq!(algorithm.required("count").unwrap(), "3");
    }
}
