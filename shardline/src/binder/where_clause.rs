//! WHERE and JOIN ON predicates, and parameter markers.

use serde::Serialize;

use crate::segment::{
    Expr, JoinType, LimitSegment, OrderByKind, OrderBySegment, PaginationValue, ParameterMarker,
    Position, ProjectionSegment, SelectStatement, Statement, TableSegment,
};

/// Where a predicate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WhereOrigin {
    /// The statement's own WHERE.
    Statement,
    /// WHERE of the subquery at this position.
    Subquery(Position),
    /// ON condition of the join at this position.
    Join { position: Position, inner: bool },
}

/// Predicate root with the tables it constrains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhereSegmentContext {
    pub position: Position,
    pub expr: Expr,
    pub origin: WhereOrigin,
    /// Labels (alias or name) of the tables in scope.
    pub tables: Vec<String>,
    /// Rows failing the predicate are dropped from the top-level result.
    pub restricts: bool,
}

impl WhereSegmentContext {
    /// Rows failing this predicate are dropped from the result.
    ///
    /// ON conditions of outer joins don't filter rows, and neither do
    /// subqueries in the select list, under NOT or OR, or behind
    /// `NOT IN` / `NOT EXISTS`.
    pub fn filters_rows(&self) -> bool {
        self.restricts
    }
}

pub(crate) fn is_inner(join_type: JoinType) -> bool {
    matches!(join_type, JoinType::Inner | JoinType::Cross)
}

/// Every parameter marker in the statement, subqueries included.
pub fn parameter_markers(statement: &Statement) -> Vec<ParameterMarker> {
    let mut markers = vec![];
    match statement {
        Statement::Select(select) => select_markers(select, &mut markers),
        Statement::Insert(insert) => {
            for row in &insert.values {
                for value in &row.values {
                    expr_markers(value, &mut markers);
                }
            }
            if let Some(select) = &insert.select {
                select_markers(&select.select, &mut markers);
            }
        }
        Statement::Update(update) => {
            table_markers(&update.table, &mut markers);
            for assignment in &update.assignments {
                expr_markers(&assignment.value, &mut markers);
            }
            if let Some(where_clause) = &update.where_clause {
                expr_markers(&where_clause.expr, &mut markers);
            }
        }
        Statement::Delete(delete) => {
            table_markers(&delete.table, &mut markers);
            if let Some(where_clause) = &delete.where_clause {
                expr_markers(&where_clause.expr, &mut markers);
            }
        }
    }
    markers
}

fn select_markers(select: &SelectStatement, markers: &mut Vec<ParameterMarker>) {
    for projection in &select.projections.items {
        match projection {
            ProjectionSegment::Parameter(parameter) => markers.push(parameter.marker),
            ProjectionSegment::Expression(expression) => expr_markers(&expression.expr, markers),
            ProjectionSegment::Aggregation(aggregation) => {
                for arg in &aggregation.args {
                    expr_markers(arg, markers);
                }
            }
            ProjectionSegment::Subquery(subquery) => {
                select_markers(&subquery.subquery.select, markers)
            }
            ProjectionSegment::Column(_) | ProjectionSegment::Shorthand(_) => (),
        }
    }
    if let Some(from) = &select.from {
        table_markers(from, markers);
    }
    if let Some(where_clause) = &select.where_clause {
        expr_markers(&where_clause.expr, markers);
    }
    if let Some(group_by) = &select.group_by {
        order_by_markers(group_by, markers);
    }
    if let Some(having) = &select.having {
        expr_markers(having, markers);
    }
    if let Some(order_by) = &select.order_by {
        order_by_markers(order_by, markers);
    }
    if let Some(limit) = &select.limit {
        limit_markers(limit, markers);
    }
    if let Some(combine) = &select.combine {
        select_markers(&combine.right.select, markers);
    }
}

fn order_by_markers(order_by: &OrderBySegment, markers: &mut Vec<ParameterMarker>) {
    for item in &order_by.items {
        if let OrderByKind::Expression {
            expr: Some(expr), ..
        } = &item.kind
        {
            expr_markers(expr, markers);
        }
    }
}

fn limit_markers(limit: &LimitSegment, markers: &mut Vec<ParameterMarker>) {
    for value in [limit.offset, limit.row_count].into_iter().flatten() {
        if let PaginationValue::Parameter(marker) = value {
            markers.push(marker);
        }
    }
}

fn table_markers(table: &TableSegment, markers: &mut Vec<ParameterMarker>) {
    match table {
        TableSegment::Simple(_) => (),
        TableSegment::Subquery(subquery) => select_markers(&subquery.subquery.select, markers),
        TableSegment::Function(function) => {
            for arg in &function.function.args {
                expr_markers(arg, markers);
            }
        }
        TableSegment::Join(join) => {
            table_markers(&join.left, markers);
            table_markers(&join.right, markers);
            if let Some(on) = &join.on {
                expr_markers(on, markers);
            }
        }
    }
}

fn expr_markers(expr: &Expr, markers: &mut Vec<ParameterMarker>) {
    expr.walk(&mut |node| match node {
        Expr::Parameter(parameter) => markers.push(parameter.marker),
        Expr::Subquery(subquery) => select_markers(&subquery.select, markers),
        Expr::Exists(exists) => select_markers(&exists.subquery.select, markers),
        _ => (),
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::segment::{BinaryOperator, OrderByItemSegment, ParameterMarkerKind, SubqueryKind};
    use crate::test::*;

    #[test]
    fn test_origin_serializes_positions() {
        let origin = WhereOrigin::Join {
            position: Position::new(7, 30),
            inner: false,
        };
        let json = serde_json::to_value(origin).unwrap();
        assert_eq!(json["Join"]["position"]["start"], 7);
        assert_eq!(json["Join"]["position"]["stop"], 30);
        assert_eq!(json["Join"]["inner"], false);
    }

    #[test]
    fn test_markers_in_subqueries() {
        // SELECT * FROM t_order WHERE user_id = ? AND order_id IN (SELECT order_id FROM t_order_item WHERE item_id = ?)
        let inner = subquery(
            select(vec![column_projection(column("order_id"))], "t_order_item")
                .where_(eq(column("item_id"), param(1)))
                .build_select(),
            SubqueryKind::In,
        );
        let statement = select(vec![shorthand()], "t_order")
            .where_(and(
                eq(column("user_id"), param(0)),
                in_list(column("order_id"), vec![Expr::Subquery(inner)]),
            ))
            .build()
            .statement;

        let markers = parameter_markers(&statement);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].index, 0);
        assert_eq!(markers[1].index, 1);
        assert!(markers.iter().all(|m| m.kind == ParameterMarkerKind::Question));
    }

    #[test]
    fn test_markers_in_order_by_and_group_by() {
        // SELECT status FROM t_order WHERE user_id = ? GROUP BY amount + ? ORDER BY amount + ?
        let item = |text: &str, marker: usize| {
            let mut item = OrderByItemSegment::expression(pos(), text);
            item.kind = OrderByKind::Expression {
                text: text.into(),
                expr: Some(Expr::binary(
                    Expr::Column(column("amount")),
                    BinaryOperator::Add,
                    param(marker),
                )),
            };
            item
        };
        let statement = select(vec![column_projection(column("status"))], "t_order")
            .where_(eq(column("user_id"), param(0)))
            .group_by(vec![item("amount + ?", 1)])
            .order_by(vec![item("amount + ?", 2)])
            .build()
            .statement;

        let markers = parameter_markers(&statement);
        let indices: Vec<usize> = markers.iter().map(|marker| marker.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_dollar_markers() {
        let statement = select(vec![shorthand()], "t_order")
            .where_(eq(column("user_id"), dollar(1)))
            .build()
            .statement;
        let markers = parameter_markers(&statement);
        assert_eq!(markers, vec![ParameterMarker::dollar(1)]);
    }
}
