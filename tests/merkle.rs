// tests/merkle.rs
use merkle_verifier::digest::sha256;
use merkle_verifier::{
    canonicalize, hash_pair, prove, verify, verify_entries, Digest, MerkleError, MerkleTree,
    ProofStep, Side,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

fn tx_leaves(n: usize) -> Vec<Digest> {
    (0..n)
        .map(|i| canonicalize(format!("tx{}", i + 1).as_bytes()))
        .collect()
}

#[test]
fn three_leaf_scenario() {
    let h1 = canonicalize(b"tx1");
    let h2 = canonicalize(b"tx2");
    let h3 = canonicalize(b"tx3");
    let tree = MerkleTree::build(&[h1, h2, h3]).unwrap();

    let h33 = hash_pair(&h3, &h3);
    let expected_root = hash_pair(&hash_pair(&h1, &h2), &h33);
    assert_eq!(tree.root(), expected_root);

    // Root spelled out as raw concatenations
    let mut inner = Vec::new();
    inner.extend_from_slice(h1.as_bytes());
    inner.extend_from_slice(h2.as_bytes());
    let h12 = sha256(&inner);
    let mut outer = Vec::new();
    outer.extend_from_slice(h12.as_bytes());
    outer.extend_from_slice(h33.as_bytes());
    assert_eq!(tree.root(), sha256(&outer));

    let proof = prove(&tree, 0).unwrap();
    assert_eq!(
        proof.steps(),
        &[
            ProofStep::new(h2, Side::Right),
            ProofStep::new(h33, Side::Right)
        ]
    );
    assert!(verify(&h1, &proof, &tree.root()));
}

#[test]
fn build_is_deterministic() {
    for n in [1, 2, 3, 7, 8, 33] {
        let leaves = tx_leaves(n);
        let a = MerkleTree::build(&leaves).unwrap().root();
        let b = MerkleTree::build(&leaves).unwrap().root();
        assert_eq!(a, b);
    }
}

#[test]
fn root_is_order_sensitive() {
    let mut rng = StdRng::seed_from_u64(7);
    let leaves = tx_leaves(9);
    let root = MerkleTree::build(&leaves).unwrap().root();

    for _ in 0..50 {
        let mut shuffled = leaves.clone();
        shuffled.shuffle(&mut rng);
        let shuffled_root = MerkleTree::build(&shuffled).unwrap().root();
        if shuffled == leaves {
            assert_eq!(shuffled_root, root);
        } else {
            assert_ne!(shuffled_root, root, "permutation kept the same root");
        }
    }

    let mut swapped = leaves.clone();
    swapped.swap(0, 1);
    assert_ne!(MerkleTree::build(&swapped).unwrap().root(), root);
}

#[test]
fn every_leaf_proof_verifies() {
    for n in 1..=20 {
        let leaves = tx_leaves(n);
        let tree = MerkleTree::build(&leaves).unwrap();
        let root = tree.root();
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = prove(&tree, i).unwrap();
            assert!(verify(leaf, &proof, &root), "n={} i={}", n, i);
        }
    }
}

#[test]
fn single_bit_mutation_fails() {
    let mut rng = StdRng::seed_from_u64(42);
    let leaves: Vec<Digest> = (0..11).map(|_| Digest::new(rng.gen())).collect();
    let tree = MerkleTree::build(&leaves).unwrap();
    let root = tree.root();

    for (i, leaf) in leaves.iter().enumerate() {
        let proof = prove(&tree, i).unwrap();
        for bit in [0usize, 7, 100, 255] {
            let mut bytes = *leaf.as_bytes();
            bytes[bit / 8] ^= 1 << (bit % 8);
            let mutated = Digest::new(bytes);
            assert!(!verify(&mutated, &proof, &root), "leaf {} bit {}", i, bit);
        }
    }
}

#[test]
fn proof_for_one_leaf_does_not_verify_another() {
    let leaves = tx_leaves(8);
    let tree = MerkleTree::build(&leaves).unwrap();
    let proof = prove(&tree, 3).unwrap();
    assert!(!verify(&leaves[4], &proof, &tree.root()));
}

#[test]
fn replaced_root_invalidates_old_proofs() {
    let leaves = tx_leaves(4);
    let tree = MerkleTree::build(&leaves).unwrap();
    let proof = prove(&tree, 2).unwrap();

    let mut next = leaves.clone();
    next.push(canonicalize(b"tx5"));
    let new_root = MerkleTree::build(&next).unwrap().root();
    assert!(!verify(&leaves[2], &proof, &new_root));
}

#[test]
fn single_leaf_tree() {
    let leaf = canonicalize(b"only");
    let tree = MerkleTree::build(&[leaf]).unwrap();
    assert_eq!(tree.root(), leaf);
    assert!(verify(&leaf, &prove(&tree, 0).unwrap(), &tree.root()));
}

#[test]
fn malformed_entries_are_errors_not_false() {
    let leaves = tx_leaves(4);
    let tree = MerkleTree::build(&leaves).unwrap();
    let root = tree.root();
    let entries = prove(&tree, 1).unwrap().to_entries();

    assert!(verify_entries(&leaves[1], &entries, &root).unwrap());
    // well formed, wrong leaf
    assert!(!verify_entries(&leaves[0], &entries, &root).unwrap());

    let mut bad = entries.clone();
    bad[0] = bad[0].replacen("left", "above", 1);
    assert!(matches!(
        verify_entries(&leaves[1], &bad, &root),
        Err(MerkleError::MalformedProof(_))
    ));
}

#[test]
fn empty_and_out_of_range_errors() {
    assert!(matches!(
        MerkleTree::build(&[]),
        Err(MerkleError::EmptyInput)
    ));
    let tree = MerkleTree::build(&tx_leaves(3)).unwrap();
    assert!(matches!(
        prove(&tree, 3),
        Err(MerkleError::IndexOutOfRange {
            index: 3,
            leaf_count: 3
        })
    ));
}

#[test]
fn inclusion_bundle_survives_json() {
    let tree = MerkleTree::build(&tx_leaves(5)).unwrap();
    let bundle = tree.inclusion_proof(4).unwrap();
    let json = serde_json::to_string(&bundle).unwrap();
    let back: merkle_verifier::InclusionProof = serde_json::from_str(&json).unwrap();
    assert_eq!(back, bundle);
    assert!(back.verify().unwrap());
}

#[test]
fn bundle_with_absurd_leaf_count_is_malformed() {
    let tree = MerkleTree::build(&tx_leaves(5)).unwrap();
    let bundle = tree.inclusion_proof(1).unwrap();
    let mut json = serde_json::to_value(&bundle).unwrap();

    for leaf_count in [usize::MAX, (1usize << (usize::BITS - 1)) + 1] {
        json["leaf_count"] = serde_json::json!(leaf_count);
        let forged: merkle_verifier::InclusionProof = serde_json::from_value(json.clone()).unwrap();
        assert!(matches!(
            forged.verify(),
            Err(MerkleError::MalformedProof(_))
        ));
    }
}

#[test]
fn empty_slots_in_entry_list_are_malformed() {
    let leaves = tx_leaves(4);
    let tree = MerkleTree::build(&leaves).unwrap();
    let root = tree.root();
    let entries = prove(&tree, 1).unwrap().to_entries();

    let with_gap = vec![entries[0].clone(), String::new(), entries[1].clone()];
    let trailing = vec![entries[0].clone(), entries[1].clone(), " ".to_string()];
    for bad in [with_gap, trailing] {
        assert!(matches!(
            verify_entries(&leaves[1], &bad, &root),
            Err(MerkleError::MalformedProof(_))
        ));
    }

    let joined = entries.join(",");
    assert!(matches!(
        format!("{},", joined).parse::<merkle_verifier::Proof>(),
        Err(MerkleError::MalformedProof(_))
    ));
    assert!(matches!(
        joined.replacen(',', ",,", 1).parse::<merkle_verifier::Proof>(),
        Err(MerkleError::MalformedProof(_))
    ));
}
