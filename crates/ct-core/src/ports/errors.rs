use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataSharingError {
    #[error("not a data sharing url: {0}")]
    InvalidUrl(String),

    #[error("failed to read group from the data sharing backend: {0}")]
    ReadGroupFailed(String),
}
