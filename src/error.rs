use thiserror::Error;

pub type Result<T> = std::result::Result<T, MerkleError>;

#[derive(Error, Debug)]
pub enum MerkleError {
    #[error("Cannot build a Merkle tree from zero leaves")]
    EmptyInput,

    #[error("Index {index} out of bounds (tree has {leaf_count} leaves)")]
    IndexOutOfRange { index: usize, leaf_count: usize },

    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    #[error("Caller {caller} is not authorized to replace the root")]
    Unauthorized { caller: String },

    #[error("Registry holds no root yet")]
    Uninitialized,

    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
