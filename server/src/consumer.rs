/*!
The consume loop: poll the replication queue, decode, and route each
mutation to the sink table.

Queue transport failures back off and retry; decode failures do not (the
same bytes fail the same way), so they are logged and the loop moves on.
*/

use crate::queue;
use replsink_dynamodb::{Error as SinkError, Table};
use replsink_record::Record;
use tracing::{error, info, warn};

const IDLE_DELAY: std::time::Duration = std::time::Duration::from_millis(100);
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// What to do with a decoded record.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Put,
    Delete,
    /// Not for this consumer; logged and dropped.
    Skip,
}

fn route(record: &Record, bucket_filter: &str) -> Action {
    if record.bucket.as_deref() != Some(bucket_filter.as_bytes()) {
        return Action::Skip;
    }
    if record.is_delete {
        Action::Delete
    } else if record.has_metadata(b"content-type", b"application/json") {
        Action::Put
    } else {
        Action::Skip
    }
}

pub struct Consumer {
    queue: queue::Client,
    table: Table,
    bucket_filter: String,
}

impl Consumer {
    pub fn new(queue: queue::Client, table: Table, bucket_filter: String) -> Self {
        Self {
            queue,
            table,
            bucket_filter,
        }
    }

    pub async fn run(&self, cancel_token: &tokio_util::sync::CancellationToken) {
        info!("Starting consume from queue");

        let mut queue_failure = false;
        loop {
            let fetched = tokio::select! {
                _ = cancel_token.cancelled() => break,
                fetched = self.queue.fetch() => fetched,
            };

            match fetched {
                Err(queue::Error::Record(e)) => {
                    // Deterministic for these bytes; never retried
                    warn!("Failed to decode record: {e}");
                }
                Err(e) => {
                    error!("{e}");
                    warn!(
                        "Queue failure, backing off for {} seconds",
                        RETRY_DELAY.as_secs()
                    );
                    queue_failure = true;
                    tokio::select! {
                        _ = cancel_token.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
                Ok(record) => {
                    if queue_failure {
                        info!("Recovered from queue failure");
                        queue_failure = false;
                    }
                    if record.empty {
                        tokio::select! {
                            _ = cancel_token.cancelled() => break,
                            _ = tokio::time::sleep(IDLE_DELAY) => {}
                        }
                    } else {
                        self.process(&record).await;
                    }
                }
            }
        }

        info!("Stopped consuming from queue");
    }

    async fn process(&self, record: &Record) {
        let bucket = String::from_utf8_lossy(record.bucket.as_deref().unwrap_or_default());
        let Some(key) = record
            .key
            .as_deref()
            .and_then(|key| std::str::from_utf8(key).ok())
        else {
            warn!("Record in bucket {bucket} has no usable key");
            return;
        };

        match route(record, &self.bucket_filter) {
            Action::Skip => warn!("Key not JSON or wrong bucket {bucket} {key}"),
            Action::Put => match self.table.put_record(key, record).await {
                Ok(()) => info!("Put item {key}"),
                Err(SinkError::Stale { last_modified, .. }) => warn!(
                    "Put for key={key} failed due to existing last modified > {last_modified}"
                ),
                Err(e) => error!("{e}"),
            },
            Action::Delete => match self.table.delete_record(key, record).await {
                Ok(()) => info!("Deleted item {key}"),
                Err(SinkError::Stale { last_modified, .. }) => warn!(
                    "Delete for key={key} failed due to existing last modified > {last_modified}"
                ),
                Err(e) => error!("{e}"),
            },
        }
    }
}
