//! N-gram bucket addressing.
//!
//! 32-bit FNV-1a over the UTF-8 bytes of the n-gram, reduced modulo the
//! bucket count. No seed and no process state, so indices are stable
//! across save/load and restarts.

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of `bytes`.
#[must_use]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Maps an n-gram to its bucket in a table of `bucket_count` rows.
///
/// # Panics
/// Panics if `bucket_count` is zero. `ModelConfig::validate` rejects that.
#[must_use]
pub fn bucket_index(ngram: &str, bucket_count: usize) -> usize {
    assert!(bucket_count > 0, "bucket_count must be > 0");
    fnv1a_32(ngram.as_bytes()) as usize % bucket_count
}
