//! Tables a statement reads or writes.

use std::collections::HashSet;

use serde::Serialize;

use super::Error;
use crate::metadata::{MetadataProvider, TableMetadata};
use crate::segment::{Identifier, Position, SimpleTableSegment};

/// Where a bound table's rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TableSource {
    /// Table in the metadata snapshot.
    Physical,
    /// `(SELECT ...) AS alias`, identified by the subquery's start offset.
    Derived { start: usize },
    /// Table function; its columns are unknown.
    Function,
}

/// Table reference resolved against metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BoundTable {
    pub position: Position,
    pub database: String,
    pub schema: String,
    /// Declared name for physical tables, alias for derived ones.
    pub name: String,
    pub alias: Option<Identifier>,
    /// Column names, declared order.
    pub columns: Vec<String>,
    /// Columns left out of `*`. Still resolvable by name.
    pub hidden: Vec<String>,
    pub source: TableSource,
}

impl BoundTable {
    pub(crate) fn physical(
        segment: &SimpleTableSegment,
        database: &str,
        schema: &str,
        metadata: &TableMetadata,
    ) -> Self {
        Self {
            position: segment.position,
            database: database.into(),
            schema: schema.into(),
            name: metadata.name.clone(),
            alias: segment.alias.clone(),
            columns: metadata.columns().map(|column| column.name.clone()).collect(),
            hidden: metadata
                .columns()
                .filter(|column| !column.visible)
                .map(|column| column.name.clone())
                .collect(),
            source: TableSource::Physical,
        }
    }

    pub fn is_physical(&self) -> bool {
        self.source == TableSource::Physical
    }

    /// Name other clauses refer to this table by.
    pub fn label(&self) -> &str {
        self.alias
            .as_ref()
            .map(|alias| alias.value.as_str())
            .unwrap_or(&self.name)
    }

    /// Does `owner.column` refer to this table?
    pub fn owner_matches(&self, owner: &Identifier) -> bool {
        match &self.alias {
            Some(alias) => alias.matches(owner),
            None => owner.matches_name(&self.name),
        }
    }

    /// Declared column name for `name`, if the table has it.
    pub fn column(&self, name: &Identifier) -> Option<&str> {
        self.columns
            .iter()
            .find(|column| name.matches_name(column))
            .map(|column| column.as_str())
    }

    /// Columns `*` and `table.*` expand to, declared order.
    pub fn visible_columns(&self) -> impl Iterator<Item = &String> {
        self.columns.iter().filter(|column| {
            !self
                .hidden
                .iter()
                .any(|hidden| hidden.eq_ignore_ascii_case(column))
        })
    }

    /// Table functions accept any qualified column.
    pub(crate) fn is_open(&self) -> bool {
        self.source == TableSource::Function
    }
}

/// Tables in a FROM clause (or the target of a DML statement),
/// left to right.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TablesContext {
    tables: Vec<BoundTable>,
    /// Columns merged by `USING (...)` or `NATURAL JOIN`.
    #[serde(skip)]
    merged_columns: HashSet<String>,
}

impl TablesContext {
    pub fn tables(&self) -> &[BoundTable] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Declared names of physical tables, without duplicates.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = vec![];
        for table in self.tables.iter().filter(|table| table.is_physical()) {
            if !names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&table.name))
            {
                names.push(&table.name);
            }
        }
        names
    }

    pub fn find_owner(&self, owner: &Identifier) -> Option<&BoundTable> {
        self.tables.iter().find(|table| table.owner_matches(owner))
    }

    pub(crate) fn push(&mut self, table: BoundTable) {
        self.tables.push(table);
    }

    pub(crate) fn merge_column(&mut self, column: &Identifier) {
        self.merged_columns.insert(column.normalized());
    }

    pub(crate) fn is_merged(&self, column: &Identifier) -> bool {
        self.merged_columns.contains(&column.normalized())
    }

    /// Tables in `range`, used for join scopes.
    pub(crate) fn labels(&self, range: std::ops::Range<usize>) -> Vec<String> {
        self.tables[range]
            .iter()
            .map(|table| table.label().to_string())
            .collect()
    }
}

/// Look up a simple table reference.
pub(crate) fn bind_simple(
    segment: &SimpleTableSegment,
    database: &str,
    metadata: &(impl MetadataProvider + ?Sized),
) -> Result<BoundTable, Error> {
    let default_schema = metadata
        .default_schema(database)
        .ok_or_else(|| Error::UnknownDatabase(database.into()))?;
    let schema = segment
        .owner
        .as_ref()
        .map(|owner| owner.normalized())
        .unwrap_or_else(|| default_schema.to_string());

    let table = metadata
        .table(database, &schema, &segment.name.value)
        .filter(|table| segment.name.matches_name(&table.name))
        .ok_or_else(|| Error::UnknownTable(segment.name.value.clone()))?;

    Ok(BoundTable::physical(segment, database, &schema, table))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::segment::QuoteCharacter;
    use crate::test::metadata;

    #[test]
    fn test_bind_simple() {
        let metadata = metadata();
        let segment = SimpleTableSegment::new(Position::new(14, 20), "T_ORDER").with_alias("o");
        let table = bind_simple(&segment, "logic_db", &metadata).unwrap();
        assert_eq!(table.name, "t_order");
        assert_eq!(table.schema, "public");
        assert_eq!(table.label(), "o");
        assert!(table.owner_matches(&Identifier::new("O")));
        assert!(!table.owner_matches(&Identifier::new("t_order")));
        assert_eq!(table.column(&Identifier::new("USER_ID")), Some("user_id"));
    }

    #[test]
    fn test_bind_unknown() {
        let metadata = metadata();
        let segment = SimpleTableSegment::new(Position::new(14, 20), "t_missing");
        assert_eq!(
            bind_simple(&segment, "logic_db", &metadata),
            Err(Error::UnknownTable("t_missing".into()))
        );
        assert_eq!(
            bind_simple(&segment, "other_db", &metadata),
            Err(Error::UnknownDatabase("other_db".into()))
        );

        let mut quoted = SimpleTableSegment::new(Position::new(14, 20), "T_ORDER");
        quoted.name.quote = QuoteCharacter::Quote;
        assert!(bind_simple(&quoted, "logic_db", &metadata).is_err());
    }
}
