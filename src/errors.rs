use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Webhook error: {0}")]
    WebhookError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, ReporterError>;

// 用于从字符串创建错误
impl From<String> for ReporterError {
    fn from(s: String) -> Self {
        ReporterError::Unknown(s)
    }
}

// 用于从&str创建错误
impl From<&str> for ReporterError {
    fn from(s: &str) -> Self {
        ReporterError::Unknown(s.to_string())
    }
}
