use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum DatasetError {
    #[display("failed to open dataset file")]
    OpenFile,
    #[display("failed to read row {row}")]
    ReadRow { row: usize },
}

#[derive(Debug, Display, Error)]
pub enum AssistantError {
    #[display("request to {provider} failed")]
    Request { provider: String },
    #[display("failed to parse response from {provider}")]
    ResponseParse { provider: String },
    #[display("{provider} returned no answer text")]
    EmptyAnswer { provider: String },
}
