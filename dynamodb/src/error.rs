use thiserror::Error;

/// The primary error type for the DynamoDB sink.
#[derive(Error, Debug)]
pub enum Error {
    /// A conditional write lost to an item with a newer modification time.
    /// Expected under replay; callers log and move on.
    #[error("Existing item for key {key} has last modified >= {last_modified}")]
    Stale { key: String, last_modified: String },

    /// The record lacks a field the item layout needs.
    #[error("Record has no {0}")]
    Missing(&'static str),

    /// The record value is valid JSON but not a JSON object.
    #[error("Record value is not a JSON object")]
    NotAnObject,

    /// The record value failed to parse as JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The table did not become active after creation.
    #[error("Table {0} did not become active")]
    TableNotActive(String),

    /// Any other failure from the DynamoDB API.
    #[error("DynamoDB request failed: {source}")]
    Request {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub(crate) fn request(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Request {
            source: source.into(),
        }
    }
}
