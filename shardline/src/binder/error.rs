//! Binding errors.

use std::fmt::Display;

use thiserror::Error;

/// ORDER BY or GROUP BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    OrderBy,
    GroupBy,
}

impl Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderBy => write!(f, "ORDER BY"),
            Self::GroupBy => write!(f, "GROUP BY"),
        }
    }
}

/// Stable error category, for mapping to protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnresolvedReference,
    MalformedOrderBy,
    MalformedStatement,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("database \"{0}\" doesn't exist")]
    UnknownDatabase(String),

    #[error("table \"{0}\" doesn't exist")]
    UnknownTable(String),

    #[error("column \"{column}\" doesn't exist")]
    UnknownColumn { column: String },

    #[error("column \"{column}\" of \"{table}\" doesn't exist")]
    UnknownTableColumn { table: String, column: String },

    #[error("column reference \"{column}\" is ambiguous, it exists in {}", .tables.join(", "))]
    AmbiguousColumn { column: String, tables: Vec<String> },

    #[error("{clause} position {index} is not in select list")]
    InvalidPosition { clause: Clause, index: usize },

    #[error("{clause} item \"{item}\" doesn't match any table in FROM")]
    UnboundItem { clause: Clause, item: String },

    #[error("INSERT has {columns} target columns but a row has {values} values")]
    InsertValueCount { columns: usize, values: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownDatabase(_)
            | Self::UnknownTable(_)
            | Self::UnknownColumn { .. }
            | Self::UnknownTableColumn { .. }
            | Self::AmbiguousColumn { .. } => ErrorKind::UnresolvedReference,
            Self::InvalidPosition { .. } | Self::UnboundItem { .. } => ErrorKind::MalformedOrderBy,
            Self::InsertValueCount { .. } => ErrorKind::MalformedStatement,
        }
    }
}
