//! Merkle batch engine for bot assignment commitments
//!
//! Leaf encoding is fixed: `keccak256(keccak256(abi.encode(address bot,
//! string oracle, uint256 issue)))`, the OpenZeppelin standard-tree
//! convention. Interior nodes hash the sorted pair of their children for
//! second-preimage resistance; an odd trailing node is carried up unchanged.
//! Any deviation from this encoding changes the root, so it must not change.

use alloy::primitives::{keccak256, B256, U256};
use alloy::sol_types::SolValue;
use thiserror::Error;

use crate::models::Assignment;

#[derive(Error, Debug)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree over an empty assignment list")]
    EmptyBatch,
}

/// Outcome of checking a client-claimed root against an independently
/// recomputed one. A root is only ever accepted through `Verified`; there is
/// no trusted-blindly path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootCheck {
    Verified(B256),
    Mismatch { claimed: B256, computed: B256 },
}

/// Canonical leaf hash for one assignment.
pub fn leaf_hash(assignment: &Assignment) -> B256 {
    let encoded = (
        assignment.bot,
        assignment.oracle.clone(),
        U256::from(assignment.issue),
    )
        .abi_encode();
    keccak256(keccak256(encoded))
}

fn hash_pair(a: B256, b: B256) -> B256 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

fn next_level(level: &[B256]) -> Vec<B256> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => hash_pair(*a, *b),
            [odd] => *odd,
            _ => unreachable!(),
        })
        .collect()
}

/// Root of the tree over the encoded leaves, in list order.
pub fn compute_root(assignments: &[Assignment]) -> Result<B256, MerkleError> {
    if assignments.is_empty() {
        return Err(MerkleError::EmptyBatch);
    }

    let mut level: Vec<B256> = assignments.iter().map(leaf_hash).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    Ok(level[0])
}

/// Sibling path for the leaf at `index`. Proof indices are order-sensitive;
/// duplicate leaves each get their own valid proof.
pub fn proof_for(assignments: &[Assignment], index: usize) -> Result<Vec<B256>, MerkleError> {
    if assignments.is_empty() || index >= assignments.len() {
        return Err(MerkleError::EmptyBatch);
    }

    let mut level: Vec<B256> = assignments.iter().map(leaf_hash).collect();
    let mut idx = index;
    let mut proof = Vec::new();

    while level.len() > 1 {
        let sibling = idx ^ 1;
        if sibling < level.len() {
            proof.push(level[sibling]);
        }
        idx /= 2;
        level = next_level(&level);
    }

    Ok(proof)
}

/// Recompute the path from `leaf` through `proof` and compare to `root`.
pub fn verify_proof(root: B256, leaf: B256, proof: &[B256]) -> bool {
    let computed = proof.iter().fold(leaf, |acc, sibling| hash_pair(acc, *sibling));
    computed == root
}

/// Independently recompute the root of `assignments` and compare it to the
/// client-claimed root.
pub fn check_root(claimed: B256, assignments: &[Assignment]) -> Result<RootCheck, MerkleError> {
    let computed = compute_root(assignments)?;
    if computed == claimed {
        Ok(RootCheck::Verified(computed))
    } else {
        Ok(RootCheck::Mismatch { claimed, computed })
    }
}
