//! Built-in shadow algorithms.

use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use shardline_config::AlgorithmConfig;

use super::super::Error;
use crate::segment::Value;

/// Statement kind a column algorithm applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShadowOperation {
    Insert,
    Delete,
    Update,
    Select,
}

impl FromStr for ShadowOperation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "delete" => Ok(Self::Delete),
            "update" => Ok(Self::Update),
            "select" => Ok(Self::Select),
            _ => Err(()),
        }
    }
}

impl Display for ShadowOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Select => "select",
        };
        write!(f, "{}", name)
    }
}

/// Properties of a `/*shadow:true,key:value*/` comment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ShadowHint {
    pub shadow: bool,
    pub props: IndexMap<String, String>,
}

/// Matches values of one column.
pub trait ColumnShadowAlgorithm: Debug + Send + Sync {
    fn column(&self) -> &str;
    fn operation(&self) -> ShadowOperation;
    fn matches(&self, value: &Value) -> bool;
}

/// Matches SQL hint comments.
pub trait HintShadowAlgorithm: Debug + Send + Sync {
    fn matches(&self, hint: &ShadowHint) -> bool;
}

#[derive(Debug, Clone)]
pub enum ShadowAlgorithm {
    Column(Arc<dyn ColumnShadowAlgorithm>),
    Hint(Arc<dyn HintShadowAlgorithm>),
}

fn column_and_operation(config: &AlgorithmConfig) -> Result<(String, ShadowOperation), Error> {
    let column = config.required("column")?.to_lowercase();
    let operation = config.required("operation")?;
    let operation = operation
        .parse::<ShadowOperation>()
        .map_err(|_| Error::UnknownOperation {
            algorithm: config.name.clone(),
            operation: operation.clone(),
        })?;
    Ok((column, operation))
}

/// Value text fully matches `regex`.
#[derive(Debug, Clone)]
pub struct ColumnRegexMatchAlgorithm {
    column: String,
    operation: ShadowOperation,
    regex: Regex,
}

impl ColumnRegexMatchAlgorithm {
    pub fn new(config: &AlgorithmConfig) -> Result<Self, Error> {
        let (column, operation) = column_and_operation(config)?;
        let regex = config.required("regex")?;
        let regex = Regex::new(&format!("^(?:{})$", regex)).map_err(|source| Error::Regex {
            algorithm: config.name.clone(),
            source,
        })?;

        Ok(Self {
            column,
            operation,
            regex,
        })
    }
}

impl ColumnShadowAlgorithm for ColumnRegexMatchAlgorithm {
    fn column(&self) -> &str {
        &self.column
    }

    fn operation(&self) -> ShadowOperation {
        self.operation
    }

    fn matches(&self, value: &Value) -> bool {
        !value.is_null() && self.regex.is_match(&value.to_string())
    }
}

/// Value text equals `value`.
#[derive(Debug, Clone)]
pub struct ColumnValueMatchAlgorithm {
    column: String,
    operation: ShadowOperation,
    value: String,
}

impl ColumnValueMatchAlgorithm {
    pub fn new(config: &AlgorithmConfig) -> Result<Self, Error> {
        let (column, operation) = column_and_operation(config)?;
        Ok(Self {
            column,
            operation,
            value: config.required("value")?,
        })
    }
}

impl ColumnShadowAlgorithm for ColumnValueMatchAlgorithm {
    fn column(&self) -> &str {
        &self.column
    }

    fn operation(&self) -> ShadowOperation {
        self.operation
    }

    fn matches(&self, value: &Value) -> bool {
        !value.is_null() && value.to_string() == self.value
    }
}

/// Hint says `shadow:true` and carries every configured property.
#[derive(Debug, Clone)]
pub struct SimpleHintAlgorithm {
    props: IndexMap<String, String>,
}

impl SimpleHintAlgorithm {
    pub fn new(config: &AlgorithmConfig) -> Result<Self, Error> {
        let props: IndexMap<String, String> = config
            .props
            .iter()
            .filter(|(key, _)| key.as_str() != "shadow")
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();

        if props.is_empty() {
            return Err(shardline_config::Error::MissingProperty {
                algorithm: config.name.clone(),
                property: "<hint key>".into(),
            }
            .into());
        }

        Ok(Self { props })
    }
}

impl HintShadowAlgorithm for SimpleHintAlgorithm {
    fn matches(&self, hint: &ShadowHint) -> bool {
        hint.shadow
            && self
                .props
                .iter()
                .all(|(key, value)| hint.props.get(key) == Some(value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_regex_full_match() {
        let algorithm = ColumnRegexMatchAlgorithm::new(
            &AlgorithmConfig::new("r", "column_regex_match")
                .prop("column", "USER_ID")
                .prop("operation", "INSERT")
                .prop("regex", "[1]"),
        )
        .unwrap();
        assert_eq!(algorithm.column(), "user_id");
        assert_eq!(algorithm.operation(), ShadowOperation::Insert);
        assert!(algorithm.matches(&Value::Integer(1)));
        assert!(algorithm.matches(&Value::from("1")));
        assert!(!algorithm.matches(&Value::Integer(11)));
        assert!(!algorithm.matches(&Value::Null));
    }

    #[test]
    fn test_config_errors() {
        let bad_regex = AlgorithmConfig::new("r", "column_regex_match")
            .prop("column", "user_id")
            .prop("operation", "insert")
            .prop("regex", "[");
        assert!(matches!(
            ColumnRegexMatchAlgorithm::new(&bad_regex),
            Err(Error::Regex { .. })
        ));

        let bad_operation = AlgorithmConfig::new("v", "column_value_match")
            .prop("column", "user_id")
            .prop("operation", "merge")
            .prop("value", 1);
        assert!(matches!(
            ColumnValueMatchAlgorithm::new(&bad_operation),
            Err(Error::UnknownOperation { .. })
        ));

        let no_props = AlgorithmConfig::new("h", "simple_hint").prop("shadow", true);
        assert!(SimpleHintAlgorithm::new(&no_props).is_err());
    }

    #[test]
    fn test_simple_hint() {
        let algorithm = SimpleHintAlgorithm::new(
            &AlgorithmConfig::new("h", "simple_hint")
                .prop("shadow", true)
                .prop("foo", "bar"),
        )
        .unwrap();

        let mut hint = ShadowHint {
            shadow: true,
            props: IndexMap::from([("foo".to_string(), "bar".to_string())]),
        };
        assert!(algorithm.matches(&hint));

        hint.props.insert("extra".into(), "1".into());
        assert!(algorithm.matches(&hint));

        hint.shadow = false;
        assert!(!algorithm.matches(&hint));

        let other = ShadowHint {
            shadow: true,
            props: IndexMap::from([("foo".to_string(), "baz".to_string())]),
        };
        assert!(!algorithm.matches(&other));
    }
}
