use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarehouseError {
    #[error("dataset '{0}' not found or not readable")]
    DatasetNotFound(String),

    #[error("table '{dataset}.{table}' not found")]
    TableNotFound { dataset: String, table: String },

    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("catalog error: {0}")]
    Catalog(String),
}
