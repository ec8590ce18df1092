use log::debug;

use crate::digest::{canonicalize_all, hash_pair, Digest};
use crate::error::{MerkleError, Result};
use crate::proof::{InclusionProof, Proof, ProofStep, Side};

/// Binary Merkle tree over an ordered list of leaf digests.
///
/// Levels are stored leaf level first and unpadded; an odd trailing node is
/// paired with itself when the parent level is computed, and the same rule is
/// applied when a proof path is read back out.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build the tree bottom-up. Fails on an empty leaf list.
    pub fn build(leaves: &[Digest]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut levels = vec![leaves.to_vec()];
        while levels[levels.len() - 1].len() > 1 {
            let next = next_level(&levels[levels.len() - 1]);
            levels.push(next);
        }

        let tree = MerkleTree { levels };
        debug!(
            "Built Merkle tree: {} leaves, height {}, root {}",
            tree.leaf_count(),
            tree.height(),
            tree.root()
        );
        Ok(tree)
    }

    /// Canonicalize raw transaction identifiers, then build.
    pub fn from_identifiers<I, T>(identifiers: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self::build(&canonicalize_all(identifiers))
    }

    pub fn root(&self) -> Digest {
        // build() guarantees a non-empty top level
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels above the leaves, i.e. the length of every proof.
    pub fn height(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn leaf(&self, index: usize) -> Option<&Digest> {
        self.levels[0].get(index)
    }

    pub fn leaves(&self) -> &[Digest] {
        &self.levels[0]
    }

    pub fn levels(&self) -> &[Vec<Digest>] {
        &self.levels
    }

    /// Sibling path from the leaf at `index` up to the root.
    pub fn generate_proof(&self, index: usize) -> Result<Proof> {
        let leaf_count = self.leaf_count();
        if index >= leaf_count {
            return Err(MerkleError::IndexOutOfRange { index, leaf_count });
        }

        let mut steps = Vec::with_capacity(self.height());
        let mut idx = index;
        for level in &self.levels[..self.height()] {
            let step = if idx % 2 == 0 {
                // padded level: the last node is its own sibling
                let sibling = level.get(idx + 1).unwrap_or(&level[idx]);
                ProofStep::new(*sibling, Side::Right)
            } else {
                ProofStep::new(level[idx - 1], Side::Left)
            };
            steps.push(step);
            idx /= 2;
        }

        Ok(Proof::new(steps))
    }

    /// Proof bundled with the leaf, root and position it was generated for.
    pub fn inclusion_proof(&self, index: usize) -> Result<InclusionProof> {
        let proof = self.generate_proof(index)?;
        Ok(InclusionProof {
            index,
            leaf_count: self.leaf_count(),
            leaf: self.levels[0][index],
            proof,
            root: self.root(),
        })
    }
}

fn next_level(prev: &[Digest]) -> Vec<Digest> {
    prev.chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_pair(left, right)
        })
        .collect()
}

/// Root only, without retaining the intermediate levels.
pub fn merkle_root(leaves: &[Digest]) -> Result<Digest> {
    if leaves.is_empty() {
        return Err(MerkleError::EmptyInput);
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    Ok(level[0])
}

/// Free-function form of [`MerkleTree::generate_proof`].
pub fn prove(tree: &MerkleTree, index: usize) -> Result<Proof> {
    tree.generate_proof(index)
}
