//! Deterministic percentage rollout bucketing.
//!
//! A user identity is hashed with MurmurHash3 (x86, 32-bit, seed 0) and the
//! hash is reduced modulo 100. The hash depends only on the UTF-8 bytes of the
//! identity, so a user lands in the same bucket in every process, on every
//! platform and across configuration refreshes.
//!
//! Because membership is `bucket < percentage`, raising the percentage only
//! ever adds users: the enabled population at 20% is a subset of the one at 30%.

/// Number of rollout buckets.
pub const BUCKET_COUNT: u32 = 100;

const HASH_SEED: u32 = 0;

/// MurmurHash3 32-bit implementation for consistent hashing.
///
/// # Arguments
/// * `key` - The byte slice to hash
/// * `seed` - Seed value for the hash
pub fn murmurhash3_32(key: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;
    const R1: u32 = 15;
    const R2: u32 = 13;
    const M: u32 = 5;
    const N: u32 = 0xe6546b64;

    let mut hash = seed;
    let len = key.len();

    let mut blocks = key.chunks_exact(4);
    for block in &mut blocks {
        let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);

        k = k.wrapping_mul(C1);
        k = k.rotate_left(R1);
        k = k.wrapping_mul(C2);

        hash ^= k;
        hash = hash.rotate_left(R2);
        hash = hash.wrapping_mul(M).wrapping_add(N);
    }

    let tail = blocks.remainder();
    let mut k1: u32 = 0;

    if tail.len() >= 3 {
        k1 ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k1 ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k1 ^= tail[0] as u32;
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(R1);
        k1 = k1.wrapping_mul(C2);
        hash ^= k1;
    }

    // Finalization
    hash ^= len as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85ebca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2ae35);
    hash ^= hash >> 16;

    hash
}

/// Returns the rollout bucket of a user, in `[0, 100)`.
///
/// # Example
///
/// ```
/// use appconfig_evaluator::bucket::bucket;
///
/// let first = bucket("user-42");
/// assert!(first < 100);
/// assert_eq!(first, bucket("user-42"));
/// ```
pub fn bucket(user_id: &str) -> u32 {
    murmurhash3_32(user_id.as_bytes(), HASH_SEED) % BUCKET_COUNT
}

/// Decides whether a user falls inside a rollout percentage.
///
/// `100` and above include everyone and `0` and below include no one without
/// hashing, so the boundaries are exact regardless of hash distribution.
pub fn in_rollout(user_id: &str, rollout_percentage: i64) -> bool {
    if rollout_percentage >= i64::from(BUCKET_COUNT) {
        return true;
    }
    if rollout_percentage <= 0 {
        return false;
    }
    i64::from(bucket(user_id)) < rollout_percentage
}
