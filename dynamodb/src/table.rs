use crate::{
    config::Config,
    error::Error,
    item::{self, LAST_MODIFIED, PARTITION_KEY},
};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType, TableStatus,
};
use replsink_record::Record;
use tracing::{debug, info};

/// Writes win only when their source record is newer than the stored
/// item. Modification times are strings and compare lexicographically.
const LWW_CONDITION: &str = "attribute_not_exists(#lm) OR #lm < :lm";

const TABLE_WAIT_ATTEMPTS: usize = 25;
const TABLE_WAIT_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// One DynamoDB table receiving replicated records.
pub struct Table {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl Table {
    /// Builds a client from ambient AWS credentials plus the configured
    /// endpoint, timeout and retry overrides.
    pub async fn connect(config: &Config) -> Self {
        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout))
            .read_timeout(std::time::Duration::from_secs(config.read_timeout))
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .timeout_config(timeouts)
            .retry_config(
                aws_config::retry::RetryConfig::standard().with_max_attempts(config.retries),
            );
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        Self {
            client: aws_sdk_dynamodb::Client::new(&loader.load().await),
            table: config.table.clone(),
        }
    }

    /// Creates the table if it does not exist and waits for it to become
    /// active.
    pub async fn ensure_table(&self) -> Result<(), Error> {
        match self
            .client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
        {
            Ok(_) => return Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) => {}
            Err(e) => return Err(Error::request(e)),
        }

        info!("Table {} does not exist, creating", self.table);
        self.client
            .create_table()
            .table_name(&self.table)
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(PARTITION_KEY)
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .map_err(Error::request)?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(PARTITION_KEY)
                    .key_type(KeyType::Hash)
                    .build()
                    .map_err(Error::request)?,
            )
            .provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(5)
                    .write_capacity_units(5)
                    .build()
                    .map_err(Error::request)?,
            )
            .send()
            .await
            .map_err(Error::request)?;

        for _ in 0..TABLE_WAIT_ATTEMPTS {
            let table = self
                .client
                .describe_table()
                .table_name(&self.table)
                .send()
                .await
                .map_err(Error::request)?;
            if table
                .table()
                .and_then(|t| t.table_status())
                .is_some_and(|status| *status == TableStatus::Active)
            {
                return Ok(());
            }
            tokio::time::sleep(TABLE_WAIT_DELAY).await;
        }
        Err(Error::TableNotActive(self.table.clone()))
    }

    /// Writes the record's JSON object value as an item, unless the
    /// stored item is newer.
    pub async fn put_record(&self, key: &str, record: &Record) -> Result<(), Error> {
        let item = item::item_for(key, record)?;
        let last_modified = item::last_modified(record)?;

        debug!("Putting item {key}");
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .condition_expression(LWW_CONDITION)
            .expression_attribute_names("#lm", LAST_MODIFIED)
            .expression_attribute_values(":lm", AttributeValue::S(last_modified.to_string()))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception())
                {
                    Error::Stale {
                        key: key.to_string(),
                        last_modified: last_modified.to_string(),
                    }
                } else {
                    Error::request(e)
                }
            })?;
        Ok(())
    }

    /// Removes the item for a delete record, unless the stored item is
    /// newer than the tombstone.
    pub async fn delete_record(&self, key: &str, record: &Record) -> Result<(), Error> {
        let last_modified = item::last_modified(record)?;

        debug!("Deleting item {key}");
        self.client
            .delete_item()
            .table_name(&self.table)
            .key(PARTITION_KEY, AttributeValue::S(key.to_string()))
            .condition_expression(LWW_CONDITION)
            .expression_attribute_names("#lm", LAST_MODIFIED)
            .expression_attribute_values(":lm", AttributeValue::S(last_modified.to_string()))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception())
                {
                    Error::Stale {
                        key: key.to_string(),
                        last_modified: last_modified.to_string(),
                    }
                } else {
                    Error::request(e)
                }
            })?;
        Ok(())
    }
}
