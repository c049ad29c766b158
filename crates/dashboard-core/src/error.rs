use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Mutation failed: {0}")]
    Mutation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
