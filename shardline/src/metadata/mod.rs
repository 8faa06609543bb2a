//! Database metadata snapshot.
//!
//! Loaded by an external collaborator and swapped in as a whole,
//! see [`MetadataStore`]. Lookups never do I/O.

pub mod store;

use std::collections::HashSet;

use indexmap::IndexMap;

pub use store::MetadataStore;

/// Column, as declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: String,
    /// One-based position in the table definition.
    pub ordinal_position: usize,
    pub primary_key: bool,
    /// Hidden columns are not expanded by `*`.
    pub visible: bool,
}

impl ColumnMetadata {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ordinal_position: 0,
            primary_key: false,
            visible: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Table with columns in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableMetadata {
    pub name: String,
    columns: IndexMap<String, ColumnMetadata>,
}

impl TableMetadata {
    pub fn new(name: &str, columns: Vec<ColumnMetadata>) -> Self {
        let mut table = Self {
            name: name.into(),
            columns: IndexMap::new(),
        };
        for column in columns {
            table.add_column(column);
        }
        table
    }

    pub fn add_column(&mut self, mut column: ColumnMetadata) {
        column.ordinal_position = self.columns.len() + 1;
        self.columns.insert(column.name.to_lowercase(), column);
    }

    /// Case-insensitive lookup.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.get(&name.to_lowercase())
    }

    /// All columns, declared order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.values()
    }

    /// Columns `*` expands to.
    pub fn visible_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.values().filter(|column| column.visible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaMetadata {
    pub name: String,
    tables: IndexMap<String, TableMetadata>,
}

impl SchemaMetadata {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            tables: IndexMap::new(),
        }
    }

    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self.tables.insert(table.name.to_lowercase(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.get(&name.to_lowercase())
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableMetadata> {
        self.tables.values()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatabaseMetadata {
    pub name: String,
    pub default_schema: String,
    schemas: IndexMap<String, SchemaMetadata>,
}

impl DatabaseMetadata {
    pub fn new(name: &str, default_schema: &str) -> Self {
        Self {
            name: name.into(),
            default_schema: default_schema.into(),
            schemas: IndexMap::new(),
        }
    }

    pub fn with_schema(mut self, schema: SchemaMetadata) -> Self {
        self.schemas.insert(schema.name.to_lowercase(), schema);
        self
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaMetadata> {
        self.schemas.get(&name.to_lowercase())
    }
}

/// Read-only view of the metadata snapshot used while binding.
pub trait MetadataProvider {
    /// Look up a table. `schema` is already defaulted by the caller.
    fn table(&self, database: &str, schema: &str, name: &str) -> Option<&TableMetadata>;

    /// Schema unqualified tables live in.
    fn default_schema(&self, database: &str) -> Option<&str>;

    /// Table needs special handling, e.g. it's sharded or broadcast.
    fn is_enhanced_table(&self, database: &str, name: &str) -> bool;

    /// Snapshot version. Changes whenever the snapshot is replaced.
    fn version(&self) -> u64 {
        0
    }
}

/// All databases plus the tables routing rules care about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    pub(crate) version: u64,
    databases: IndexMap<String, DatabaseMetadata>,
    enhanced_tables: HashSet<String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: DatabaseMetadata) -> Self {
        self.databases
            .insert(database.name.to_lowercase(), database);
        self
    }

    /// Mark tables as enhanced. Names are matched case-insensitively
    /// in every database.
    pub fn with_enhanced_tables<'a>(mut self, tables: impl IntoIterator<Item = &'a str>) -> Self {
        self.enhanced_tables
            .extend(tables.into_iter().map(|table| table.to_lowercase()));
        self
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseMetadata> {
        self.databases.get(&name.to_lowercase())
    }
}

impl MetadataProvider for Metadata {
    fn table(&self, database: &str, schema: &str, name: &str) -> Option<&TableMetadata> {
        self.database(database)?.schema(schema)?.table(name)
    }

    fn default_schema(&self, database: &str) -> Option<&str> {
        self.database(database)
            .map(|database| database.default_schema.as_str())
    }

    fn is_enhanced_table(&self, _database: &str, name: &str) -> bool {
        self.enhanced_tables.contains(&name.to_lowercase())
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn metadata() -> Metadata {
        Metadata::new()
            .with_database(
                DatabaseMetadata::new("logic_db", "public").with_schema(
                    SchemaMetadata::new("public").with_table(TableMetadata::new(
                        "t_order",
                        vec![
                            ColumnMetadata::new("order_id", "bigint").primary_key(),
                            ColumnMetadata::new("user_id", "bigint"),
                            ColumnMetadata::new("status", "varchar").hidden(),
                        ],
                    )),
                ),
            )
            .with_enhanced_tables(["T_ORDER"])
    }

    #[test]
    fn test_lookup() {
        let metadata = metadata();
        let table = metadata.table("LOGIC_DB", "public", "T_Order").unwrap();
        assert_eq!(table.column("USER_ID").unwrap().ordinal_position, 2);
        assert!(table.column("missing").is_none());
        assert_eq!(table.visible_columns().count(), 2);
        assert_eq!(metadata.default_schema("logic_db"), Some("public"));
        assert!(metadata.table("logic_db", "other", "t_order").is_none());
        assert!(metadata.is_enhanced_table("logic_db", "t_order"));
    }
}
