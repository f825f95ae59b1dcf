//! Metrics exposition errors.

use thiserror::Error;

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("encoded metrics are not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
