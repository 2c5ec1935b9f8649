//! Error types for loading and aggregating listening histories.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The history was read but does not have the expected shape.
    #[error("malformed listening history in {origin}: {message}")]
    DataFormat { origin: String, message: String },

    /// The history could not be read or fetched at all.
    #[error("listening history unavailable at {origin}: {message}")]
    SourceUnavailable { origin: String, message: String },

    /// A background load ended without reporting an outcome.
    #[error("history loader stopped before reporting a result")]
    LoaderDisconnected,
}

impl Error {
    pub fn data_format(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::DataFormat {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    pub fn source_unavailable(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceUnavailable {
            origin: origin.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
