//! Sharding conditions: values a statement pins sharding columns to.
//!
//! Conditions are kept in disjunctive normal form. `None` means the
//! predicate doesn't restrict any sharding column, so every data node
//! has to be visited.

use indexmap::IndexMap;

use crate::binder::{InsertContext, StatementContext};
use crate::router::value_of;
use crate::rules::ShardingRule;
use crate::segment::{BinaryOperator, Expr, Value};

/// Sharding column of a logic table, lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardingKey {
    pub table: String,
    pub column: String,
}

impl ShardingKey {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_lowercase(),
            column: column.to_lowercase(),
        }
    }
}

/// Columns that all hold at once, each to one of its values.
pub type Conjunction = IndexMap<ShardingKey, Vec<Value>>;

/// Alternatives, any of which may hold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShardingConditions {
    alternatives: Option<Vec<Conjunction>>,
}

impl ShardingConditions {
    /// No restriction.
    pub fn unrestricted() -> Self {
        Self { alternatives: None }
    }

    pub fn new(alternatives: Vec<Conjunction>) -> Self {
        Self {
            alternatives: Some(alternatives),
        }
    }

    /// Conditions from every row-filtering predicate of the statement.
    pub fn from_statement(context: &StatementContext, rule: &ShardingRule) -> Self {
        let mut conditions = Self::unrestricted();
        for segment in context
            .where_segments()
            .iter()
            .filter(|segment| segment.filters_rows())
        {
            let extracted = Self {
                alternatives: extract(&segment.expr, context, rule),
            };
            conditions = conditions.and(extracted);
        }
        conditions
    }

    /// Conditions of one INSERT row. Fails with the first column
    /// that has no literal or bound value.
    pub fn from_insert_row(
        insert: &InsertContext,
        row: usize,
        columns: &[&str],
    ) -> Result<Self, String> {
        let mut conjunction = Conjunction::new();
        for column in columns {
            let value = insert
                .column_index(column)
                .and_then(|index| insert.values.get(row)?.value(index))
                .ok_or_else(|| column.to_string())?;
            conjunction.insert(ShardingKey::new(&insert.table, column), vec![value.clone()]);
        }
        Ok(Self::new(vec![conjunction]))
    }

    /// Every alternative must hold.
    pub fn and(self, other: Self) -> Self {
        Self {
            alternatives: conjoin(self.alternatives, other.alternatives),
        }
    }

    /// Alternatives, or `None` when every data node may match.
    /// A contradiction (no alternative left) is treated as unrestricted.
    pub fn alternatives(&self) -> Option<&[Conjunction]> {
        self.alternatives
            .as_deref()
            .filter(|alternatives| !alternatives.is_empty())
    }

    /// Does any alternative restrict a column of `table`?
    pub fn restricts(&self, table: &str) -> bool {
        self.alternatives().is_some_and(|alternatives| {
            alternatives.iter().any(|conjunction| {
                conjunction
                    .keys()
                    .any(|key| key.table.eq_ignore_ascii_case(table))
            })
        })
    }
}

fn extract(
    expr: &Expr,
    context: &StatementContext,
    rule: &ShardingRule,
) -> Option<Vec<Conjunction>> {
    match expr {
        Expr::Binary(binary) => match binary.operator {
            BinaryOperator::And => conjoin(
                extract(&binary.left, context, rule),
                extract(&binary.right, context, rule),
            ),
            BinaryOperator::Or => disjoin(
                extract(&binary.left, context, rule),
                extract(&binary.right, context, rule),
            ),
            BinaryOperator::Eq => {
                let (key, value) = match (
                    sharding_key(&binary.left, context, rule),
                    sharding_key(&binary.right, context, rule),
                ) {
                    (Some(key), None) => (key, value(&binary.right, context)?),
                    (None, Some(key)) => (key, value(&binary.left, context)?),
                    _ => return None,
                };
                Some(vec![Conjunction::from([(key, vec![value])])])
            }
            _ => None,
        },

        Expr::InList(in_list) if !in_list.not => {
            let key = sharding_key(&in_list.left, context, rule)?;
            let values = in_list
                .list
                .iter()
                .map(|expr| value(expr, context))
                .collect::<Option<Vec<_>>>()?;
            Some(vec![Conjunction::from([(key, dedup(values))])])
        }

        _ => None,
    }
}

fn sharding_key(
    expr: &Expr,
    context: &StatementContext,
    rule: &ShardingRule,
) -> Option<ShardingKey> {
    let Expr::Column(column) = expr else {
        return None;
    };
    let binding = context.column_binding(&column.position)?;
    if rule.is_sharding_column(&binding.table, &binding.column) {
        Some(ShardingKey::new(&binding.table, &binding.column))
    } else {
        None
    }
}

fn value(expr: &Expr, context: &StatementContext) -> Option<Value> {
    value_of(expr, context.parameters())
}

fn dedup(values: Vec<Value>) -> Vec<Value> {
    let mut unique = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

fn conjoin(
    left: Option<Vec<Conjunction>>,
    right: Option<Vec<Conjunction>>,
) -> Option<Vec<Conjunction>> {
    let (left, right) = match (left, right) {
        (None, other) | (other, None) => return other,
        (Some(left), Some(right)) => (left, right),
    };

    let mut product = vec![];
    for a in &left {
        for b in &right {
            if let Some(merged) = merge(a, b) {
                product.push(merged);
            }
        }
    }
    Some(product)
}

/// Both conjunctions at once. `None` if they contradict.
fn merge(left: &Conjunction, right: &Conjunction) -> Option<Conjunction> {
    let mut merged = left.clone();
    for (key, values) in right {
        match merged.get_mut(key) {
            Some(existing) => {
                existing.retain(|value| values.contains(value));
                if existing.is_empty() {
                    return None;
                }
            }
            None => {
                merged.insert(key.clone(), values.clone());
            }
        }
    }
    Some(merged)
}

fn disjoin(
    left: Option<Vec<Conjunction>>,
    right: Option<Vec<Conjunction>>,
) -> Option<Vec<Conjunction>> {
    let mut left = left?;
    left.extend(right?);
    Some(left)
}
