use replsink_record::{Format, Record};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub queue: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8098,
            queue: "q1_ttaaefs".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// The queue endpoint answered with a non-OK status.
    #[error("Queue returned http status {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Record(#[from] replsink_record::Error),
}

/// Client for the store's replication queue endpoint.
///
/// Each fetch returns the next queued mutation, or a record with `empty`
/// set when the queue has nothing to replicate.
pub struct Client {
    url: String,
    format: Format,
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: &Config, format: Format) -> Self {
        Self {
            url: format!(
                "http://{}:{}/queuename/{}?object_format=internal",
                config.host, config.port, config.queue
            ),
            format,
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Record, Error> {
        let response = self.http.get(&self.url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::Status(response.status()));
        }
        Ok(Record::parse(&response.bytes().await?, self.format)?)
    }
}
