use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::digest::Digest;
use crate::error::{MerkleError, Result};
use crate::proof::{verify, Proof};

/// Identity of a caller, usually an account address.
///
/// Hex addresses (`0x...`) compare case-insensitively; anything else compares
/// exactly after trimming.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            Principal(trimmed.to_ascii_lowercase())
        } else {
            Principal(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Principal {
    fn from(s: String) -> Self {
        Principal::new(s)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Principal::new(s)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryState {
    Uninitialized,
    Initialized,
}

/// Thread-safe holder of the single trusted root.
///
/// Anyone may read; only the authorized principal may replace. The root is
/// swapped whole under a write lock, so readers see either the old or the new
/// digest. Clones share the same underlying root.
#[derive(Clone)]
pub struct RootRegistry {
    root: Arc<RwLock<Option<Digest>>>,
    authorized: Principal,
}

impl RootRegistry {
    pub fn new(authorized: impl Into<Principal>) -> Self {
        Self {
            root: Arc::new(RwLock::new(None)),
            authorized: authorized.into(),
        }
    }

    /// Create registry already holding a genesis root
    pub fn with_genesis(authorized: impl Into<Principal>, genesis: Digest) -> Self {
        let registry = Self {
            root: Arc::new(RwLock::new(Some(genesis))),
            authorized: authorized.into(),
        };
        info!("Root registry initialized with genesis root {}", genesis);
        registry
    }

    pub fn current(&self) -> Option<Digest> {
        *self.root.read()
    }

    pub fn authorized(&self) -> &Principal {
        &self.authorized
    }

    pub fn state(&self) -> RegistryState {
        match *self.root.read() {
            Some(_) => RegistryState::Initialized,
            None => RegistryState::Uninitialized,
        }
    }

    /// Replace the current root. Rejected callers leave the prior root visible.
    pub fn replace(&self, new_root: Digest, caller: &Principal) -> Result<()> {
        if *caller != self.authorized {
            warn!("Rejected root replacement from unauthorized caller {}", caller);
            return Err(MerkleError::Unauthorized {
                caller: caller.to_string(),
            });
        }

        let previous = self.root.write().replace(new_root);
        match previous {
            Some(old) => info!("Merkle root replaced: {} -> {}", old, new_root),
            None => info!("Merkle root set: {}", new_root),
        }
        Ok(())
    }

    /// Verify a leaf against whatever root is current at call time.
    pub fn verify_current(&self, leaf: &Digest, proof: &Proof) -> Result<bool> {
        let root = self.current().ok_or(MerkleError::Uninitialized)?;
        Ok(verify(leaf, proof, &root))
    }
}

impl fmt::Debug for RootRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootRegistry")
            .field("root", &self.current())
            .field("authorized", &self.authorized)
            .finish()
    }
}
