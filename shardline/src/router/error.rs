//! Routing errors.

use thiserror::Error;

/// Stable error category, for mapping to protocol error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RoutingExhaustion,
    UnsupportedShadowConfiguration,
    UnsupportedStatement,
    Configuration,
    AlreadyRouted,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("no data node of \"{table}\" matches {column} = {value}")]
    NoDataNode {
        table: String,
        column: String,
        value: String,
    },

    #[error("INSERT into \"{table}\" has no value for sharding column \"{column}\"")]
    MissingShardingValue { table: String, column: String },

    #[error("sharded tables {} have no data source in common", .tables.join(", "))]
    NoCommonDataSource { tables: Vec<String> },

    #[error("\"{table}\" has no data node at position {position} in \"{data_source}\"")]
    UnalignedBindingTable {
        table: String,
        data_source: String,
        position: usize,
    },

    #[error("INSERT row into \"{table}\" routes to more than one data node")]
    MultiNodeInsert { table: String },

    #[error("INSERT ... SELECT into sharded table \"{0}\" is not supported")]
    InsertSelect(String),

    #[error("UPDATE can't change sharding column \"{column}\" of \"{table}\"")]
    ShardingColumnUpdate { table: String, column: String },

    #[error("shadow algorithm \"{algorithm}\" needs a value for \"{table}\".\"{column}\"")]
    UnsupportedShadowColumn {
        table: String,
        column: String,
        algorithm: String,
    },

    #[error("no default data source configured")]
    NoDefaultDataSource,

    #[error("route context was already routed with different rules or statement")]
    AlreadyRouted,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoDataNode { .. }
            | Self::MissingShardingValue { .. }
            | Self::NoCommonDataSource { .. }
            | Self::UnalignedBindingTable { .. } => ErrorKind::RoutingExhaustion,
            Self::MultiNodeInsert { .. }
            | Self::InsertSelect(_)
            | Self::ShardingColumnUpdate { .. } => ErrorKind::UnsupportedStatement,
            Self::UnsupportedShadowColumn { .. } => ErrorKind::UnsupportedShadowConfiguration,
            Self::NoDefaultDataSource => ErrorKind::Configuration,
            Self::AlreadyRouted => ErrorKind::AlreadyRouted,
        }
    }
}
