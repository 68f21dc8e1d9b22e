//! Worker-local error type: store failures and the one domain conflict
//! the outbox store itself detects (idempotency collision).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("idempotency key already in use: {0}")]
    IdempotencyConflict(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
