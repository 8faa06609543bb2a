//! Rule compilation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] shardline_config::Error),

    #[error("algorithm \"{name}\" has unknown type \"{kind}\"")]
    UnknownAlgorithmType { name: String, kind: String },

    #[error("algorithm \"{0}\" is not defined")]
    UnknownAlgorithm(String),

    #[error("algorithm \"{name}\" can't be used as a {expected} algorithm")]
    WrongAlgorithm { name: String, expected: &'static str },

    #[error("algorithm \"{algorithm}\": {source}")]
    Regex {
        algorithm: String,
        #[source]
        source: regex::Error,
    },

    #[error("algorithm \"{algorithm}\" has unknown operation \"{operation}\"")]
    UnknownOperation {
        algorithm: String,
        operation: String,
    },

    #[error("invalid inline expression \"{0}\"")]
    InlineExpression(String),

    #[error("invalid data node \"{0}\", expected \"data_source.table\"")]
    DataNode(String),

    #[error("data source \"{0}\" is not configured")]
    UnknownDataSource(String),

    #[error("shadow data source \"{0}\" is not configured")]
    UnknownShadowDataSource(String),
}
