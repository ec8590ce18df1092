//! Merkle commitments over ordered transaction identifiers.
//!
//! - [`digest`]: 32-byte SHA-256 digests and leaf canonicalization
//! - [`tree`]: bottom-up tree construction and proof generation
//! - [`proof`]: proof types, boundary parsing and stateless verification
//! - [`registry`]: the single trusted root and who may replace it
//! - [`config`]: file and environment configuration

pub mod config;
pub mod digest;
pub mod error;
pub mod proof;
pub mod registry;
pub mod tree;

pub use config::{Config, IdentifierEncoding};
pub use digest::{canonicalize, canonicalize_hex, hash_pair, Digest, DIGEST_LEN};
pub use error::{MerkleError, Result};
pub use proof::{verify, verify_entries, InclusionProof, Proof, ProofStep, Side};
pub use registry::{Principal, RegistryState, RootRegistry};
pub use tree::{merkle_root, prove, MerkleTree};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use crate::digest::{canonicalize, Digest};
    pub use crate::error::{MerkleError, Result};
    pub use crate::proof::{verify, Proof, ProofStep, Side};
    pub use crate::registry::{Principal, RootRegistry};
    pub use crate::tree::{prove, MerkleTree};
}
