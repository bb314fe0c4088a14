use crate::core::types::PartitionId;

/// Route a term to one of `num_reducers` partitions.
///
/// MD5 of the term's UTF-8 bytes, read as a big-endian 128-bit integer, modulo
/// `num_reducers`. Depends on nothing but its arguments, so every mapper
/// agrees on where a term goes without coordination.
pub fn partition(term: &str, num_reducers: usize) -> PartitionId {
    assert!(num_reducers > 0, "num_reducers must be at least 1");

    let digest = md5::compute(term.as_bytes());
    let value = u128::from_be_bytes(digest.0);
    PartitionId((value % num_reducers as u128) as usize)
}
