#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Override the endpoint, e.g. for a local DynamoDB instance.
    pub endpoint_url: Option<String>,
    pub table: String,
    /// Connect timeout in seconds.
    pub connect_timeout: u64,
    /// Read timeout in seconds.
    pub read_timeout: u64,
    /// Maximum request attempts, including the first.
    pub retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            table: "test".to_string(),
            connect_timeout: 1,
            read_timeout: 1,
            retries: 1,
        }
    }
}
