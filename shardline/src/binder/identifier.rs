//! Column reference resolution.

use serde::Serialize;

use super::tables::{BoundTable, TableSource, TablesContext};
use super::Error;
use crate::segment::{ColumnSegment, Identifier};

/// Canonical location of a column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnBinding {
    pub database: String,
    pub schema: String,
    /// Declared table name (alias for derived tables).
    pub table: String,
    /// Alias or name the query uses for the table.
    pub owner: String,
    /// Declared column name.
    pub column: String,
    pub source: TableSource,
    /// Resolved from an enclosing query.
    pub outer: bool,
}

impl ColumnBinding {
    fn new(table: &BoundTable, column: &str, outer: bool) -> Self {
        Self {
            database: table.database.clone(),
            schema: table.schema.clone(),
            table: table.name.clone(),
            owner: table.label().to_string(),
            column: column.to_string(),
            source: table.source,
            outer,
        }
    }

    /// Column of a physical table called `table`.
    pub fn is_column_of(&self, table: &str, column: &str) -> bool {
        self.source == TableSource::Physical
            && self.table.eq_ignore_ascii_case(table)
            && self.column.eq_ignore_ascii_case(column)
    }

    /// Same column of the same table reference.
    pub fn same_column(&self, other: &ColumnBinding) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner)
            && self.table.eq_ignore_ascii_case(&other.table)
            && self.column.eq_ignore_ascii_case(&other.column)
    }
}

/// Tables visible to a query, chained to the enclosing query's scope
/// for correlated subqueries.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub(crate) tables: &'a TablesContext,
    pub(crate) outer: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(tables: &'a TablesContext, outer: Option<&'a Scope<'a>>) -> Self {
        Self { tables, outer }
    }

    /// Resolve a column reference, innermost scope first.
    pub(crate) fn resolve(&self, column: &ColumnSegment) -> Result<ColumnBinding, Error> {
        match &column.owner {
            Some(owner) => self.resolve_qualified(owner, &column.name),
            None => self.resolve_unqualified(&column.name),
        }
    }

    fn resolve_qualified(
        &self,
        owner: &Identifier,
        name: &Identifier,
    ) -> Result<ColumnBinding, Error> {
        let mut scope = Some(self);
        let mut outer = false;

        while let Some(current) = scope {
            if let Some(table) = current.tables.find_owner(owner) {
                if let Some(column) = table.column(name) {
                    return Ok(ColumnBinding::new(table, column, outer));
                }
                if table.is_open() {
                    return Ok(ColumnBinding::new(table, &name.value, outer));
                }
                return Err(Error::UnknownTableColumn {
                    table: table.label().to_string(),
                    column: name.value.clone(),
                });
            }
            scope = current.outer;
            outer = true;
        }

        Err(Error::UnknownTable(owner.value.clone()))
    }

    fn resolve_unqualified(&self, name: &Identifier) -> Result<ColumnBinding, Error> {
        let mut scope = Some(self);
        let mut outer = false;

        while let Some(current) = scope {
            let candidates: Vec<(&BoundTable, &str)> = current
                .tables
                .tables()
                .iter()
                .filter_map(|table| table.column(name).map(|column| (table, column)))
                .collect();

            match candidates.as_slice() {
                [] => {
                    if let Some(table) = current.tables.tables().iter().find(|t| t.is_open()) {
                        return Ok(ColumnBinding::new(table, &name.value, outer));
                    }
                }
                [(table, column)] => return Ok(ColumnBinding::new(table, column, outer)),
                [(table, column), ..] => {
                    if current.tables.is_merged(name) {
                        return Ok(ColumnBinding::new(table, column, outer));
                    }
                    return Err(Error::AmbiguousColumn {
                        column: name.value.clone(),
                        tables: candidates
                            .iter()
                            .map(|(table, _)| table.label().to_string())
                            .collect(),
                    });
                }
            }

            scope = current.outer;
            outer = true;
        }

        Err(Error::UnknownColumn {
            column: name.value.clone(),
        })
    }
}
