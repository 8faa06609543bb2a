//! Parsed statement segments.
//!
//! These types are produced by an external parser and are never
//! mutated here. Every node keeps the byte offsets it was parsed from
//! so a rewriter can slice or replace the original SQL text.

pub mod expr;
pub mod identifier;
pub mod order_by;
pub mod projection;
pub mod statement;
pub mod table;
pub mod value;

pub use expr::{
    BetweenExpr, BinaryExpr, BinaryOperator, ColumnSegment, CommonExpr, ExistsExpr, Expr,
    FunctionSegment, InListExpr, LiteralSegment, NotExpr, ParameterMarkerSegment,
};
pub use identifier::{Identifier, QuoteCharacter};
pub use order_by::{NullsOrder, OrderByItemSegment, OrderByKind, OrderBySegment, OrderDirection};
pub use projection::{
    AggregationProjectionSegment, AggregationType, ColumnProjectionSegment,
    ExpressionProjectionSegment, ParameterProjectionSegment, ProjectionSegment,
    ProjectionsSegment, ShorthandProjectionSegment, SubqueryProjectionSegment,
};
pub use statement::{
    AssignmentSegment, CombineSegment, CombineType, CommentSegment, DeleteStatement,
    InsertStatement, InsertValuesSegment, LimitSegment, PaginationValue, ParsedStatement,
    SelectStatement, Statement, SubqueryKind, SubquerySegment, UpdateStatement, WhereSegment,
};
pub use table::{
    FunctionTableSegment, JoinTableSegment, JoinType, SimpleTableSegment, SubqueryTableSegment,
    TableSegment,
};
pub use value::{ParameterMarker, ParameterMarkerKind, Value};

use serde::Serialize;

/// Source offsets of a segment. `stop` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    pub start: usize,
    pub stop: usize,
}

impl Position {
    pub fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    /// Text covered by this segment.
    pub fn slice<'a>(&self, sql: &'a str) -> Option<&'a str> {
        sql.get(self.start..=self.stop)
    }

    /// Does this segment fully contain the other one?
    pub fn contains(&self, other: &Position) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slice() {
        let sql = "SELECT id FROM t_order";
        let position = Position::new(7, 8);
        assert_eq!(position.slice(sql), Some("id"));
        assert_eq!(Position::new(20, 40).slice(sql), None);
        assert!(Position::new(0, 21).contains(&position));
        assert!(!position.contains(&Position::new(0, 21)));
    }
}
