//! Statement binding.
//!
//! Turns a parsed statement into a [`StatementContext`]: tables resolved
//! against metadata, every column reference bound to its table, the
//! select list expanded and ORDER BY / GROUP BY mapped to projections.

pub mod context;
pub mod error;
pub mod identifier;
pub mod insert;
pub mod order_by;
pub mod projection;
pub mod subquery;
pub mod tables;
pub mod where_clause;

pub use context::{bind, StatementContext};
pub use error::{Clause, Error, ErrorKind};
pub use identifier::ColumnBinding;
pub use insert::{InsertContext, InsertValueContext};
pub use order_by::{GroupByContext, OrderByContext, OrderByItem};
pub use projection::{DerivedKind, Projection, ProjectionKind, ProjectionsContext};
pub use subquery::{extract, extract_direct};
pub use tables::{BoundTable, TableSource, TablesContext};
pub use where_clause::{parameter_markers, WhereOrigin, WhereSegmentContext};

use indexmap::IndexMap;

use crate::segment::{Expr, Position};
use identifier::Scope;

/// Column bindings keyed by the position of the column segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Bindings {
    bindings: IndexMap<Position, ColumnBinding>,
}

impl Bindings {
    pub(crate) fn insert(&mut self, position: Position, binding: ColumnBinding) {
        self.bindings.insert(position, binding);
    }

    pub(crate) fn get(&self, position: &Position) -> Option<&ColumnBinding> {
        self.bindings.get(position)
    }

    /// Bind every column referenced by `expr`, subqueries excluded.
    pub(crate) fn resolve(&mut self, expr: &Expr, scope: &Scope<'_>) -> Result<(), Error> {
        for column in expr.columns() {
            let binding = scope.resolve(column)?;
            self.insert(column.position, binding);
        }
        Ok(())
    }
}
