//! Sorted-pair Merkle proof verification.
//!
//! Interior nodes hash the concatenation of the two child hashes in
//! lexicographic order, so proofs carry no left/right position bits. The
//! off-chain aggregator must build its tree with the same rule, bit for bit:
//! `parent = sha256(min(l, r) || max(l, r))`.

use soroban_sdk::{Bytes, BytesN, Env, Vec};

/// Walk `proof` upward from `leaf` and compare the result against `root`.
pub fn verify(env: &Env, root: &BytesN<32>, leaf: BytesN<32>, proof: &Vec<BytesN<32>>) -> bool {
    let mut node = leaf;
    for sibling in proof.iter() {
        node = hash_pair(env, &node, &sibling);
    }
    node == *root
}

/// Canonical parent hash of two sibling nodes.
pub fn hash_pair(env: &Env, a: &BytesN<32>, b: &BytesN<32>) -> BytesN<32> {
    let mut data = [0u8; 64];
    if a.to_array() <= b.to_array() {
        data[..32].copy_from_slice(&a.to_array());
        data[32..].copy_from_slice(&b.to_array());
    } else {
        data[..32].copy_from_slice(&b.to_array());
        data[32..].copy_from_slice(&a.to_array());
    }
    env.crypto()
        .sha256(&Bytes::from_array(env, &data))
        .to_bytes()
}
