//! Values of shadow columns, per statement shape.

use serde::Serialize;

use crate::binder::StatementContext;
use crate::router::value_of;
use crate::segment::{BinaryOperator, Expr, Value};

/// Values a statement gives a shadow column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadowColumnCondition {
    pub table: String,
    pub column: String,
    pub values: Vec<Value>,
}

/// Value of `column` in every INSERT row. `None` if the column isn't
/// inserted or a row has no literal or bound value for it.
pub fn insert_values(context: &StatementContext, table: &str, column: &str) -> Option<Vec<Value>> {
    let insert = context.insert()?;
    if !insert.table.eq_ignore_ascii_case(table) {
        return None;
    }
    insert
        .column_values(column)?
        .into_iter()
        .map(|value| value.cloned())
        .collect()
}

/// Values of the first `column = value` or `column IN (...)` predicate
/// on `table`.`column`. Only AND and OR are descended; predicates under
/// NOT and in `NOT IN` lists are skipped.
pub fn predicate_values(
    context: &StatementContext,
    table: &str,
    column: &str,
) -> Option<Vec<Value>> {
    let target = Target {
        context,
        table,
        column,
    };

    context
        .where_segments()
        .iter()
        .filter(|segment| segment.filters_rows())
        .find_map(|segment| target.values(&segment.expr))
}

struct Target<'a> {
    context: &'a StatementContext,
    table: &'a str,
    column: &'a str,
}

impl Target<'_> {
    fn values(&self, expr: &Expr) -> Option<Vec<Value>> {
        let parameters = self.context.parameters();
        match expr {
            Expr::Binary(binary) => match binary.operator {
                BinaryOperator::And | BinaryOperator::Or => self
                    .values(&binary.left)
                    .or_else(|| self.values(&binary.right)),
                BinaryOperator::Eq if self.is_column(&binary.left) => {
                    value_of(&binary.right, parameters).map(|value| vec![value])
                }
                BinaryOperator::Eq if self.is_column(&binary.right) => {
                    value_of(&binary.left, parameters).map(|value| vec![value])
                }
                _ => None,
            },
            Expr::InList(in_list) if !in_list.not && self.is_column(&in_list.left) => in_list
                .list
                .iter()
                .map(|expr| value_of(expr, parameters))
                .collect(),
            _ => None,
        }
    }

    fn is_column(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Column(segment) => self
                .context
                .column_binding(&segment.position)
                .is_some_and(|binding| {
                    binding.table.eq_ignore_ascii_case(self.table)
                        && binding.column.eq_ignore_ascii_case(self.column)
                }),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binder::bind;
    use crate::segment::{InListExpr, NotExpr};
    use crate::test::*;

    #[test]
    fn test_insert_values() {
        let statement = insert("t_user", &["user_id", "username"])
            .row(vec![lit(1), lit("a")])
            .row(vec![param(0), lit("b")])
            .build();
        let context = bind(&statement, &metadata(), &[Value::Integer(2)], "logic_db").unwrap();
        assert_eq!(
            insert_values(&context, "T_USER", "user_id"),
            Some(vec![Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(insert_values(&context, "t_user", "pwd"), None);
        assert_eq!(insert_values(&context, "t_order", "user_id"), None);
    }

    #[test]
    fn test_predicate_values() {
        let statement = select(vec![shorthand()], "t_user")
            .where_(and(
                eq(column("username"), lit("a")),
                in_list(column("user_id"), vec![lit(1), param(0)]),
            ))
            .build();
        let context = bind(&statement, &metadata(), &[Value::Integer(3)], "logic_db").unwrap();
        assert_eq!(
            predicate_values(&context, "t_user", "user_id"),
            Some(vec![Value::Integer(1), Value::Integer(3)])
        );
        assert_eq!(
            predicate_values(&context, "t_user", "username"),
            Some(vec![Value::from("a")])
        );
        assert_eq!(predicate_values(&context, "t_user", "pwd"), None);
    }

    #[test]
    fn test_negated_predicates_give_no_values() {
        // WHERE NOT (user_id = 1)
        let negated = Expr::Not(NotExpr {
            position: pos(),
            expr: Box::new(eq(column("user_id"), lit(1))),
        });
        let statement = select(vec![shorthand()], "t_user").where_(negated).build();
        let context = bind(&statement, &metadata(), &[], "logic_db").unwrap();
        assert_eq!(predicate_values(&context, "t_user", "user_id"), None);

        // WHERE user_id NOT IN (1, 2) OR user_id = 3
        let not_in = Expr::InList(InListExpr {
            position: pos(),
            left: Box::new(Expr::Column(column("user_id"))),
            list: vec![lit(1), lit(2)],
            not: true,
        });
        let statement = select(vec![shorthand()], "t_user")
            .where_(or(not_in, eq(column("user_id"), lit(3))))
            .build();
        let context = bind(&statement, &metadata(), &[], "logic_db").unwrap();
        assert_eq!(
            predicate_values(&context, "t_user", "user_id"),
            Some(vec![Value::Integer(3)])
        );
    }
}
