//! Hash functions for data sketches
//!
//! Provides high-quality, non-cryptographic hash functions optimized for
//! probabilistic data structures.

use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

/// MurmurHash3 32-bit implementation
///
/// MurmurHash3 is a non-cryptographic hash function designed by Austin Appleby.
/// It provides excellent distribution and speed for hash table and sketch applications.
///
/// # Arguments
/// * `data` - The data to hash
/// * `seed` - The hash seed for independent hash functions
///
/// # Returns
/// A 32-bit hash value
///
/// # Examples
/// ```
/// use goph_sketch::common::hash::murmur3_hash;
///
/// let hash = murmur3_hash(b"hello world", 0);
/// println!("Hash: {}", hash);
/// ```
pub fn murmur3_hash(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;
    let len = data.len();

    // Process 4-byte blocks
    let chunks = len / 4;
    for i in 0..chunks {
        let k = u32::from_le_bytes([
            data[i * 4],
            data[i * 4 + 1],
            data[i * 4 + 2],
            data[i * 4 + 3],
        ]);

        let k = k.wrapping_mul(0xcc9e2d51);
        let k = k.rotate_left(15);
        let k = k.wrapping_mul(0x1b873593);

        hash ^= k;
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    // Process remaining bytes
    let remainder = len % 4;
    if remainder > 0 {
        let offset = chunks * 4;
        let mut k: u32 = 0;

        if remainder >= 3 {
            k ^= (data[offset + 2] as u32) << 16;
        }
        if remainder >= 2 {
            k ^= (data[offset + 1] as u32) << 8;
        }
        k ^= data[offset] as u32;

        k = k.wrapping_mul(0xcc9e2d51);
        k = k.rotate_left(15);
        k = k.wrapping_mul(0x1b873593);
        hash ^= k;
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

/// XXHash 64-bit implementation
///
/// XXHash is an extremely fast non-cryptographic hash function designed by Yann Collet.
/// It offers excellent speed and distribution properties.
///
/// # Arguments
/// * `data` - The data to hash
/// * `seed` - The hash seed for independent hash functions
///
/// # Returns
/// A 64-bit hash value
///
/// # Examples
/// ```
/// use goph_sketch::common::hash::xxhash;
///
/// let hash = xxhash(b"hello world", 0);
/// println!("Hash: {}", hash);
/// ```
pub fn xxhash(data: &[u8], seed: u64) -> u64 {
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(data);
    hasher.finish()
}

/// MurmurHash3 64-bit implementation
///
/// Extended version of MurmurHash3 that produces 64-bit hashes.
///
/// # Arguments
/// * `data` - The data to hash
/// * `seed` - The hash seed for independent hash functions
///
/// # Returns
/// A 64-bit hash value
pub fn murmur3_hash64(data: &[u8], seed: u64) -> u64 {
    // Use xxhash for 64-bit hashing (it's faster and better distributed)
    xxhash(data, seed)
}

/// Generic 64-bit hash function
///
/// Convenience alias for murmur3_hash64
///
/// # Arguments
/// * `data` - The data to hash
/// * `seed` - The hash seed
///
/// # Returns
/// A 64-bit hash value
pub fn hash_64(data: &[u8], seed: u64) -> u64 {
    xxhash(data, seed)
}

/// MurmurHash3's 32-bit single-integer specialization
///
/// Equivalent to hashing the little-endian bytes of `value` with
/// [`murmur3_hash`], exposed directly so callers hashing a stream of
/// already-integer keys (as GOPH sketch construction does, keyed by group
/// index) don't need to round-trip through a byte buffer themselves.
///
/// # Examples
/// ```
/// use goph_sketch::common::hash::murmur3_32_u32;
///
/// let h1 = murmur3_32_u32(42, 0);
/// let h2 = murmur3_32_u32(42, 1);
/// assert_ne!(h1, h2, "different seeds should (almost always) diverge");
/// ```
pub fn murmur3_32_u32(value: u32, seed: u32) -> u32 {
    murmur3_hash(&value.to_le_bytes(), seed)
}

/// FNV-1a 32-bit implementation
///
/// A simple, fast non-cryptographic hash with decent avalanche behavior for
/// short keys; offered alongside MurmurHash3 and xxHash for ergonomic parity
/// with the consumers this crate's sketches are typically wired up to.
///
/// # Examples
/// ```
/// use goph_sketch::common::hash::fnv1a_32;
///
/// let hash = fnv1a_32(b"hello world");
/// println!("Hash: {}", hash);
/// ```
pub fn fnv1a_32(data: &[u8]) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let mut hash = FNV_OFFSET_BASIS;
    for &byte in data {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// MurmurHash3's 32-bit avalanche finalizer (`fmix32`)
///
/// Mixes the bits of `x` without changing its width; used on its own (rather
/// than as the tail of the full MurmurHash3 block algorithm) by sketches that
/// already have a well-distributed 32-bit value and just need a second,
/// independent mixing round.
pub fn fmix32(x: u32) -> u32 {
    let mut h = x;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Finalize `x` into a nonzero value that fits in `width` bits
///
/// Applies [`fmix32`], masks to the low `width` bits, and substitutes `1` for
/// a masked result of `0`. This is the secondary hash used by GOPH sketch
/// construction (see [`crate::similarity::goph`]) to turn a slot's base hash
/// into a per-slot minimum candidate: slot value `0` is reserved to mean
/// "no element landed here", so a legitimate minimum can never be allowed to
/// collide with it.
///
/// # Panics
/// Does not panic for any `u8` width; widths above 32 behave as if clamped
/// to 32 (no masking is applied).
///
/// # Examples
/// ```
/// use goph_sketch::common::hash::secondary_hash;
///
/// let h = secondary_hash(123_456, 8);
/// assert!(h >= 1 && h <= 0xFF);
/// ```
pub fn secondary_hash(x: u32, width: u8) -> u32 {
    let mixed = fmix32(x);
    let mask = if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    };
    let masked = mixed & mask;
    if masked == 0 {
        1
    } else {
        masked
    }
}

/// Hash any value that implements Hash trait using MurmurHash3
///
/// This is a convenience function for hashing Rust types.
///
/// # Arguments
/// * `value` - The value to hash
/// * `seed` - The hash seed
///
/// # Returns
/// A 32-bit hash value
pub fn hash_value<T: Hash>(value: &T, seed: u32) -> u32 {
    use std::hash::Hasher as StdHasher;

    // Use a simple hasher to convert T to bytes
    struct ByteHasher {
        bytes: Vec<u8>,
    }

    impl StdHasher for ByteHasher {
        fn finish(&self) -> u64 {
            0 // Not used
        }

        fn write(&mut self, bytes: &[u8]) {
            self.bytes.extend_from_slice(bytes);
        }
    }

    let mut hasher = ByteHasher { bytes: Vec::new() };
    value.hash(&mut hasher);
    murmur3_hash(&hasher.bytes, seed)
}
