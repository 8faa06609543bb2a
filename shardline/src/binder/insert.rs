//! INSERT column and value alignment.

use serde::Serialize;

use super::tables::BoundTable;
use super::Error;
use crate::segment::{Expr, InsertStatement, ParameterMarker, Position, Value};

/// One row of `VALUES`, with literals and bound parameters resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InsertValueContext {
    pub position: Position,
    /// One entry per target column. `None` when the value
    /// is an expression or a missing parameter.
    pub values: Vec<Option<Value>>,
    pub parameter_markers: Vec<ParameterMarker>,
}

impl InsertValueContext {
    pub fn value(&self, column: usize) -> Option<&Value> {
        self.values.get(column).and_then(|value| value.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InsertContext {
    pub table: String,
    /// Target columns: as listed, or every declared column when omitted.
    pub columns: Vec<String>,
    pub explicit_columns: bool,
    pub values: Vec<InsertValueContext>,
    /// `INSERT ... SELECT` subquery position.
    pub select: Option<Position>,
}

impl InsertContext {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
    }

    /// Value of `column` in every row, in row order.
    pub fn column_values(&self, column: &str) -> Option<Vec<Option<&Value>>> {
        let index = self.column_index(column)?;
        Some(self.values.iter().map(|row| row.value(index)).collect())
    }

    pub(crate) fn bind(
        insert: &InsertStatement,
        table: &BoundTable,
        parameters: &[Value],
    ) -> Result<Self, Error> {
        let (columns, explicit_columns) = match &insert.columns {
            Some(columns) => {
                let columns = columns
                    .iter()
                    .map(|column| {
                        table
                            .column(&column.name)
                            .map(|name| name.to_string())
                            .ok_or_else(|| Error::UnknownTableColumn {
                                table: table.name.clone(),
                                column: column.name.value.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (columns, true)
            }
            None => (table.visible_columns().cloned().collect(), false),
        };

        let mut values = vec![];
        for row in &insert.values {
            if row.values.len() != columns.len() {
                return Err(Error::InsertValueCount {
                    columns: columns.len(),
                    values: row.values.len(),
                });
            }

            let mut parameter_markers = vec![];
            let resolved = row
                .values
                .iter()
                .map(|value| match value {
                    Expr::Literal(literal) => Some(literal.value.clone()),
                    Expr::Parameter(parameter) => {
                        parameter_markers.push(parameter.marker);
                        parameter.marker.value(parameters).cloned()
                    }
                    _ => None,
                })
                .collect();

            values.push(InsertValueContext {
                position: row.position,
                values: resolved,
                parameter_markers,
            });
        }

        Ok(Self {
            table: table.name.clone(),
            columns,
            explicit_columns,
            values,
            select: insert.select.as_ref().map(|select| select.position),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binder::bind;
    use crate::test::*;

    #[test]
    fn test_explicit_columns() {
        // INSERT INTO t_user (user_id, username) VALUES (1, 'a'), (?, 'b')
        let statement = insert("t_user", &["USER_ID", "username"])
            .row(vec![lit(1), lit("a")])
            .row(vec![param(0), lit("b")])
            .build();
        let context = bind(&statement, &metadata(), &[Value::Integer(2)], "logic_db").unwrap();
        let insert = context.insert().unwrap();
        assert_eq!(insert.columns, vec!["user_id", "username"]);
        assert_eq!(
            insert.column_values("user_id").unwrap(),
            vec![Some(&Value::Integer(1)), Some(&Value::Integer(2))]
        );
        assert_eq!(insert.values[1].parameter_markers.len(), 1);
    }

    #[test]
    fn test_omitted_columns() {
        let statement = insert("t_user", &[])
            .row(vec![lit(7), lit("bob"), lit("secret")])
            .build();
        let context = bind(&statement, &metadata(), &[], "logic_db").unwrap();
        let insert = context.insert().unwrap();
        assert!(!insert.explicit_columns);
        assert_eq!(insert.column_index("username"), Some(1));
        assert_eq!(insert.values[0].value(2), Some(&Value::from("secret")));
    }

    #[test]
    fn test_mismatch() {
        let statement = insert("t_user", &["user_id"])
            .row(vec![lit(1), lit("a")])
            .build();
        let err = bind(&statement, &metadata(), &[], "logic_db").unwrap_err();
        assert_eq!(
            err,
            Error::InsertValueCount {
                columns: 1,
                values: 2
            }
        );

        let statement = insert("t_user", &["nope"]).row(vec![lit(1)]).build();
        assert!(bind(&statement, &metadata(), &[], "logic_db").is_err());
    }
}
