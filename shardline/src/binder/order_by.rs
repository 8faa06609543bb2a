//! ORDER BY / GROUP BY item binding.
//!
//! Each item is mapped to a one-based projection index. Precedence,
//! first match wins:
//!
//! 1. `ORDER BY 2` is returned as written.
//! 2. `ORDER BY o.user_id` matches the column projection of that table.
//! 3. `ORDER BY n` matches a projection alias.
//! 4. Otherwise unaliased column projections are matched by name, and
//!    columns that exist in the bound tables but aren't selected get a
//!    derived projection.
//! 5. Expressions match projections by text or get a derived projection.

use serde::Serialize;
use tracing::trace;

use super::error::Clause;
use super::identifier::Scope;
use super::projection::{DerivedKind, ProjectionKind, ProjectionsContext};
use super::{Bindings, Error};
use crate::segment::{
    NullsOrder, OrderByItemSegment, OrderByKind, OrderBySegment, OrderDirection, Position,
};

/// Bound ORDER BY or GROUP BY item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrderByItem {
    pub position: Position,
    /// One-based projection index.
    pub index: usize,
    pub direction: OrderDirection,
    pub nulls_order: Option<NullsOrder>,
}

impl OrderByItem {
    /// What decides whether two items sort the same way.
    pub fn key(&self) -> (usize, OrderDirection, Option<NullsOrder>) {
        (self.index, self.direction, self.nulls_order)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OrderByContext {
    pub items: Vec<OrderByItem>,
    /// Copied from GROUP BY because the statement had no ORDER BY.
    pub generated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GroupByContext {
    pub items: Vec<OrderByItem>,
}

/// GROUP BY present and sorting exactly like ORDER BY.
pub fn same_items(group_by: &GroupByContext, order_by: &OrderByContext) -> bool {
    !group_by.items.is_empty()
        && group_by.items.len() == order_by.items.len()
        && group_by
            .items
            .iter()
            .zip(order_by.items.iter())
            .all(|(group, order)| group.key() == order.key())
}

pub(crate) fn bind_order_by(
    segment: Option<&OrderBySegment>,
    group_by: &GroupByContext,
    projections: &mut ProjectionsContext,
    scope: &Scope<'_>,
    bindings: &mut Bindings,
) -> Result<OrderByContext, Error> {
    match segment {
        Some(segment) if !segment.items.is_empty() => Ok(OrderByContext {
            items: bind_items(Clause::OrderBy, segment, projections, scope, bindings)?,
            generated: false,
        }),
        _ => Ok(OrderByContext {
            items: group_by.items.clone(),
            generated: !group_by.items.is_empty(),
        }),
    }
}

pub(crate) fn bind_group_by(
    segment: Option<&OrderBySegment>,
    projections: &mut ProjectionsContext,
    scope: &Scope<'_>,
    bindings: &mut Bindings,
) -> Result<GroupByContext, Error> {
    let items = match segment {
        Some(segment) => bind_items(Clause::GroupBy, segment, projections, scope, bindings)?,
        None => vec![],
    };
    Ok(GroupByContext { items })
}

fn bind_items(
    clause: Clause,
    segment: &OrderBySegment,
    projections: &mut ProjectionsContext,
    scope: &Scope<'_>,
    bindings: &mut Bindings,
) -> Result<Vec<OrderByItem>, Error> {
    segment
        .items
        .iter()
        .map(|item| {
            let index = bind_item(clause, item, projections, scope, bindings)?;
            trace!("{} \"{}\" bound to projection {}", clause, item.text(), index);
            Ok(OrderByItem {
                position: item.position,
                index,
                direction: item.direction,
                nulls_order: item.nulls_order,
            })
        })
        .collect()
}

fn derived_kind(clause: Clause) -> DerivedKind {
    match clause {
        Clause::OrderBy => DerivedKind::OrderBy,
        Clause::GroupBy => DerivedKind::GroupBy,
    }
}

fn bind_item(
    clause: Clause,
    item: &OrderByItemSegment,
    projections: &mut ProjectionsContext,
    scope: &Scope<'_>,
    bindings: &mut Bindings,
) -> Result<usize, Error> {
    match &item.kind {
        OrderByKind::Index(0) => Err(Error::InvalidPosition { clause, index: 0 }),

        OrderByKind::Index(index) => Ok(*index),

        OrderByKind::Column(column) => {
            if let Some(owner) = &column.owner {
                if scope.tables.find_owner(owner).is_none() {
                    return Err(Error::UnboundItem {
                        clause,
                        item: column.qualified_name(),
                    });
                }
            } else {
                if let Some(index) = projections.find_alias(&column.name) {
                    return Ok(index);
                }
                if let Some(index) = projections.find_column_label(&column.name) {
                    return Ok(index);
                }
            }

            let binding = Scope::new(scope.tables, None).resolve(column)?;
            bindings.insert(column.position, binding.clone());

            if let Some(index) = projections.find_column(&binding) {
                return Ok(index);
            }

            Ok(projections.push_derived(
                column.qualified_name(),
                ProjectionKind::Column {
                    binding,
                    name: column.name.clone(),
                    owner: column.owner.clone(),
                },
                derived_kind(clause),
            ))
        }

        OrderByKind::Expression { text, expr } => {
            if let Some(index) = projections.find_expression(text) {
                return Ok(index);
            }
            if let Some(expr) = expr {
                bindings.resolve(expr, scope)?;
            }
            Ok(projections.push_derived(
                text.clone(),
                ProjectionKind::Expression,
                derived_kind(clause),
            ))
        }
    }
}
