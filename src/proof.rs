//! Inclusion proofs and their stateless verification.
//!
//! A [`Proof`] is the ordered sibling path from a leaf to the root. Checking
//! it needs only `(leaf, proof, root)`; the tree that produced it is never
//! consulted. Untrusted textual input goes through [`Proof::parse_entries`]
//! (or [`verify_entries`]) so that structural problems surface as
//! [`MerkleError::MalformedProof`] instead of a plain `false`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

use crate::digest::{hash_pair, Digest};
use crate::error::{MerkleError, Result};

/// Which side of the running hash the sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl FromStr for Side {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Ok(Side::Left),
            "r" | "right" => Ok(Side::Right),
            other => Err(MerkleError::MalformedProof(format!(
                "unknown side '{}', expected left or right",
                other
            ))),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Digest,
    pub side: Side,
}

impl ProofStep {
    pub fn new(sibling: Digest, side: Side) -> Self {
        Self { sibling, side }
    }

    /// Hash the running value with this sibling on its recorded side.
    pub fn fold(&self, current: &Digest) -> Digest {
        match self.side {
            Side::Right => hash_pair(current, &self.sibling),
            Side::Left => hash_pair(&self.sibling, current),
        }
    }
}

impl fmt::Display for ProofStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.side, self.sibling)
    }
}

/// Entry form `side:digest`, e.g. `right:0x1f..` or `l:1f..`.
impl FromStr for ProofStep {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self> {
        let (side, sibling) = s.trim().split_once(':').ok_or_else(|| {
            MerkleError::MalformedProof(format!("entry '{}' is not of the form side:digest", s))
        })?;
        let side: Side = side.parse()?;
        let sibling = Digest::from_hex(sibling)
            .map_err(|e| MerkleError::MalformedProof(format!("entry '{}': {}", s, e)))?;
        Ok(ProofStep { sibling, side })
    }
}

/// Ordered sibling path, leaf level first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proof {
    steps: Vec<ProofStep>,
}

impl Proof {
    pub fn new(steps: Vec<ProofStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[ProofStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Recompute the root implied by `leaf` and this path.
    pub fn compute_root(&self, leaf: &Digest) -> Digest {
        self.steps
            .iter()
            .fold(*leaf, |current, step| step.fold(&current))
    }

    /// Map free-form entries (one `side:digest` string each) into a proof.
    ///
    /// A single blank entry (the whole input was empty) is the empty proof.
    /// Any blank slot inside a longer list is malformed.
    pub fn parse_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: Vec<S> = entries.into_iter().collect();
        if let [only] = entries.as_slice() {
            if only.as_ref().trim().is_empty() {
                return Ok(Self::default());
            }
        }

        let steps = entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let e = e.as_ref();
                if e.trim().is_empty() {
                    return Err(MerkleError::MalformedProof(format!("entry {} is empty", i)));
                }
                e.parse::<ProofStep>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    /// JSON array of `{"sibling": "0x..", "side": "left"|"right"}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MerkleError::MalformedProof(e.to_string()))
    }

    pub fn to_entries(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.to_string()).collect()
    }

    /// Reject a proof whose length does not match the expected tree height.
    pub fn expect_height(self, height: usize) -> Result<Self> {
        if self.steps.len() != height {
            return Err(MerkleError::MalformedProof(format!(
                "expected {} steps, got {}",
                height,
                self.steps.len()
            )));
        }
        Ok(self)
    }

    /// Length check against the height implied by a claimed leaf count.
    pub fn expect_leaf_count(self, leaf_count: usize) -> Result<Self> {
        let height = tree_height(leaf_count).ok_or_else(|| {
            MerkleError::MalformedProof(format!("no tree has {} leaves", leaf_count))
        })?;
        self.expect_height(height)
    }
}

impl FromStr for Proof {
    type Err = MerkleError;

    /// Comma separated entries, as typed into a form field.
    fn from_str(s: &str) -> Result<Self> {
        Proof::parse_entries(s.split(','))
    }
}

/// Height of a tree with `leaf_count` leaves: `ceil(log2(leaf_count))`.
///
/// `None` for zero leaves, or a count whose padded width overflows `usize`.
pub fn tree_height(leaf_count: usize) -> Option<usize> {
    if leaf_count == 0 {
        return None;
    }
    leaf_count
        .checked_next_power_of_two()
        .map(|width| width.trailing_zeros() as usize)
}

/// True iff folding `proof` over `leaf` reproduces `root`.
pub fn verify(leaf: &Digest, proof: &Proof, root: &Digest) -> bool {
    let computed = proof.compute_root(leaf);
    computed.as_bytes().ct_eq(root.as_bytes()).into()
}

/// Boundary form of [`verify`] for untrusted textual entries.
///
/// Structural problems are errors; a well-formed proof that does not lead to
/// `root` is `Ok(false)`.
pub fn verify_entries<I, S>(leaf: &Digest, entries: I, root: &Digest) -> Result<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let proof = Proof::parse_entries(entries)?;
    Ok(verify(leaf, &proof, root))
}

/// Self-contained proof bundle: everything a requester needs to check one
/// leaf, plus the position data used to sanity check the path's shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Index of the leaf in the tree
    pub index: usize,
    /// Number of leaves committed by `root`
    pub leaf_count: usize,
    pub leaf: Digest,
    pub proof: Proof,
    pub root: Digest,
}

impl InclusionProof {
    /// Checks the path's length and sides against `index`/`leaf_count`, then verifies.
    pub fn verify(&self) -> Result<bool> {
        if self.leaf_count == 0 || self.index >= self.leaf_count {
            return Err(MerkleError::MalformedProof(format!(
                "index {} outside a tree of {} leaves",
                self.index, self.leaf_count
            )));
        }
        let height = tree_height(self.leaf_count).ok_or_else(|| {
            MerkleError::MalformedProof(format!("no tree has {} leaves", self.leaf_count))
        })?;
        if self.proof.len() != height {
            return Err(MerkleError::MalformedProof(format!(
                "expected {} steps for {} leaves, got {}",
                height,
                self.leaf_count,
                self.proof.len()
            )));
        }
        for (level, step) in self.proof.steps().iter().enumerate() {
            let expected = if (self.index >> level) & 1 == 0 {
                Side::Right
            } else {
                Side::Left
            };
            if step.side != expected {
                return Err(MerkleError::MalformedProof(format!(
                    "step {} has side {}, index {} implies {}",
                    level, step.side, self.index, expected
                )));
            }
        }
        Ok(verify(&self.leaf, &self.proof, &self.root))
    }
}
