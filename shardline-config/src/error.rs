//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error, line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0}")]
    Toml(#[from] toml::de::Error),

    #[error("algorithm \"{algorithm}\" is missing property \"{property}\"")]
    MissingProperty { algorithm: String, property: String },

    #[error("algorithm \"{algorithm}\" has invalid property \"{property}\": {value}")]
    InvalidProperty {
        algorithm: String,
        property: String,
        value: String,
    },
}

impl Error {
    /// Attach the line number of the offending TOML to a parse error.
    pub fn parse(source: &str, err: toml::de::Error) -> Self {
        let line = err
            .span()
            .map(|span| {
                let prefix = source.get(..span.start).unwrap_or(source);
                prefix.matches('\n').count() + 1
            })
            .unwrap_or(0);

        Self::Parse {
            line,
            message: err.message().to_string(),
        }
    }
}
