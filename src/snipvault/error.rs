use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Identity already exists: {0}")]
    DuplicateIdentity(String),

    #[error("No record with identity: {0}")]
    UnknownIdentity(String),

    #[error("Record schema does not match the {0} store")]
    SchemaMismatch(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
