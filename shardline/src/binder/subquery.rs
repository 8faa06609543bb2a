//! Subquery extraction.
//!
//! Subqueries are collected in first-occurrence order: WHERE, select
//! list, FROM/JOIN, HAVING, GROUP BY/ORDER BY expressions, then set
//! operation arms. Each subquery is followed by the subqueries nested
//! inside it. A subquery is identified by its position, so the same
//! segment is never collected twice.

use super::where_clause::is_inner;
use crate::segment::{
    BinaryOperator, Expr, OrderByKind, OrderBySegment, ProjectionSegment, SelectStatement,
    Statement, SubquerySegment, TableSegment,
};

/// Every subquery in the statement, at any depth.
pub fn extract(statement: &Statement) -> Vec<&SubquerySegment> {
    let mut extractor = Extractor::new(true);
    extractor.statement(statement);
    extractor.subqueries
}

/// Subqueries directly inside the statement, not nested in another subquery.
pub fn extract_direct(statement: &Statement) -> Vec<&SubquerySegment> {
    let mut extractor = Extractor::new(false);
    extractor.statement(statement);
    extractor.subqueries
}

pub(crate) fn extract_select(select: &SelectStatement, recursive: bool) -> Vec<&SubquerySegment> {
    let mut extractor = Extractor::new(recursive);
    extractor.select(select);
    extractor.subqueries
}

/// Start offsets of direct subqueries whose predicates also drop rows
/// of the statement: derived tables, the INSERT source, and non-negated
/// `IN` / `EXISTS` conjuncts of WHERE or of an inner join's ON.
pub(crate) fn filtering(statement: &Statement) -> Vec<usize> {
    let mut starts = vec![];
    match statement {
        Statement::Select(select) => {
            if let Some(where_clause) = &select.where_clause {
                conjuncts(&where_clause.expr, &mut starts);
            }
            if let Some(from) = &select.from {
                filtering_tables(from, &mut starts);
            }
        }
        Statement::Insert(insert) => {
            if let Some(select) = &insert.select {
                starts.push(select.position.start);
            }
        }
        Statement::Update(update) => {
            if let Some(where_clause) = &update.where_clause {
                conjuncts(&where_clause.expr, &mut starts);
            }
        }
        Statement::Delete(delete) => {
            if let Some(where_clause) = &delete.where_clause {
                conjuncts(&where_clause.expr, &mut starts);
            }
        }
    }
    starts
}

fn filtering_tables(table: &TableSegment, starts: &mut Vec<usize>) {
    match table {
        TableSegment::Subquery(derived) => starts.push(derived.subquery.position.start),
        TableSegment::Join(join) => {
            filtering_tables(&join.left, starts);
            filtering_tables(&join.right, starts);
            if is_inner(join.join_type) {
                if let Some(on) = &join.on {
                    conjuncts(on, starts);
                }
            }
        }
        TableSegment::Simple(_) | TableSegment::Function(_) => (),
    }
}

fn conjuncts(expr: &Expr, starts: &mut Vec<usize>) {
    match expr {
        Expr::Binary(binary) if matches!(binary.operator, BinaryOperator::And) => {
            conjuncts(&binary.left, starts);
            conjuncts(&binary.right, starts);
        }
        Expr::InList(in_list) if !in_list.not => {
            for item in &in_list.list {
                if let Expr::Subquery(subquery) = item {
                    starts.push(subquery.position.start);
                }
            }
        }
        Expr::Exists(exists) if !exists.not => starts.push(exists.subquery.position.start),
        _ => (),
    }
}

struct Extractor<'a> {
    recursive: bool,
    subqueries: Vec<&'a SubquerySegment>,
}

impl<'a> Extractor<'a> {
    fn new(recursive: bool) -> Self {
        Self {
            recursive,
            subqueries: vec![],
        }
    }

    fn statement(&mut self, statement: &'a Statement) {
        match statement {
            Statement::Select(select) => self.select(select),

            Statement::Insert(insert) => {
                for row in &insert.values {
                    for value in &row.values {
                        self.expr(value);
                    }
                }
                if let Some(select) = &insert.select {
                    self.subquery(select);
                }
            }

            Statement::Update(update) => {
                if let Some(where_clause) = &update.where_clause {
                    self.expr(&where_clause.expr);
                }
                for assignment in &update.assignments {
                    self.expr(&assignment.value);
                }
                self.table(&update.table);
            }

            Statement::Delete(delete) => {
                if let Some(where_clause) = &delete.where_clause {
                    self.expr(&where_clause.expr);
                }
                self.table(&delete.table);
            }
        }
    }

    fn select(&mut self, select: &'a SelectStatement) {
        if let Some(where_clause) = &select.where_clause {
            self.expr(&where_clause.expr);
        }

        for projection in &select.projections.items {
            match projection {
                ProjectionSegment::Subquery(subquery) => self.subquery(&subquery.subquery),
                ProjectionSegment::Expression(expression) => self.expr(&expression.expr),
                ProjectionSegment::Aggregation(aggregation) => {
                    for arg in &aggregation.args {
                        self.expr(arg);
                    }
                }
                ProjectionSegment::Column(_)
                | ProjectionSegment::Shorthand(_)
                | ProjectionSegment::Parameter(_) => (),
            }
        }

        if let Some(from) = &select.from {
            self.table(from);
        }

        if let Some(having) = &select.having {
            self.expr(having);
        }

        for clause in [&select.group_by, &select.order_by].into_iter().flatten() {
            self.order_by(clause);
        }

        if let Some(combine) = &select.combine {
            self.subquery(&combine.right);
        }
    }

    fn order_by(&mut self, clause: &'a OrderBySegment) {
        for item in &clause.items {
            if let OrderByKind::Expression {
                expr: Some(expr), ..
            } = &item.kind
            {
                self.expr(expr);
            }
        }
    }

    fn table(&mut self, table: &'a TableSegment) {
        match table {
            TableSegment::Simple(_) => (),
            TableSegment::Subquery(subquery) => self.subquery(&subquery.subquery),
            TableSegment::Function(function) => {
                for arg in &function.function.args {
                    self.expr(arg);
                }
            }
            TableSegment::Join(join) => {
                self.table(&join.left);
                self.table(&join.right);
                if let Some(on) = &join.on {
                    self.expr(on);
                }
            }
        }
    }

    fn expr(&mut self, expr: &'a Expr) {
        expr.walk(&mut |node| match node {
            Expr::Subquery(subquery) => self.subquery(subquery),
            Expr::Exists(exists) => self.subquery(&exists.subquery),
            _ => (),
        });
    }

    fn subquery(&mut self, subquery: &'a SubquerySegment) {
        if self
            .subqueries
            .iter()
            .any(|seen| seen.position == subquery.position)
        {
            return;
        }
        self.subqueries.push(subquery);

        if self.recursive {
            self.select(&subquery.select);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::segment::SubqueryKind;
    use crate::test::*;

    /// SELECT (SELECT max(order_id) FROM t_order) AS m
    /// FROM (SELECT * FROM t_order) a
    /// JOIN (SELECT * FROM t_order_item WHERE order_id IN (SELECT order_id FROM t_order)) b
    ///   ON a.order_id = b.order_id
    /// WHERE a.user_id IN (SELECT user_id FROM t_user)
    fn nested() -> Statement {
        let in_subquery = subquery(
            select(vec![column_projection(column("order_id"))], "t_order").build_select(),
            SubqueryKind::In,
        );
        let right = subquery(
            select(vec![shorthand()], "t_order_item")
                .where_(in_list(column("order_id"), vec![Expr::Subquery(in_subquery)]))
                .build_select(),
            SubqueryKind::Table,
        );
        let left = subquery(
            select(vec![shorthand()], "t_order").build_select(),
            SubqueryKind::Table,
        );
        let projection = subquery(
            select(
                vec![aggregation(crate::segment::AggregationType::Max, false, "order_id")],
                "t_order",
            )
            .build_select(),
            SubqueryKind::Projection,
        );
        let predicate = subquery(
            select(vec![column_projection(column("user_id"))], "t_user").build_select(),
            SubqueryKind::In,
        );

        select_from(
            vec![subquery_projection(projection, "m")],
            join(
                derived(left, "a"),
                derived(right, "b"),
                Some(eq(qualified("a", "order_id"), qualified("b", "order_id"))),
            ),
        )
        .where_(in_list(
            qualified("a", "user_id"),
            vec![Expr::Subquery(predicate)],
        ))
        .build()
        .statement
    }

    #[test]
    fn test_extract_order_and_nesting() {
        let statement = nested();
        let subqueries = extract(&statement);
        assert_eq!(subqueries.len(), 5);

        let kinds: Vec<_> = subqueries.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SubqueryKind::In,
                SubqueryKind::Projection,
                SubqueryKind::Table,
                SubqueryKind::Table,
                SubqueryKind::In,
            ]
        );

        // The IN subquery nested in the right join arm follows its parent.
        let nested = extract_select(&subqueries[3].select, false);
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].position, subqueries[4].position);
        assert_eq!(extract_direct(&statement).len(), 4);
    }

    #[test]
    fn test_no_subqueries() {
        let statement = select(vec![shorthand()], "t_order").build().statement;
        assert!(extract(&statement).is_empty());
    }

    #[test]
    fn test_combine_arm() {
        let right = subquery(
            select(vec![column_projection(column("user_id"))], "t_user").build_select(),
            SubqueryKind::Combine,
        );
        let statement = select(vec![column_projection(column("user_id"))], "t_order")
            .union(right)
            .build()
            .statement;
        let subqueries = extract(&statement);
        assert_eq!(subqueries.len(), 1);
        assert_eq!(subqueries[0].kind, SubqueryKind::Combine);
    }
}
