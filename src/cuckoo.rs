//! Context-frequency cuckoo hash for the PPM model.
//!
//! Fixed-capacity mapping from packed context keys to 16-bit frequency
//! counts, with a per-context 256-bit follower bitmap recording which bytes
//! have been seen to extend the context. Without the bitmaps, enumerating the
//! symbols of a context would mean probing all 256 possible children; with
//! them it is a handful of word scans.
//!
//! Two hash functions, displacement on collision, no rehash path: when an
//! insertion cannot find a home within [`MAX_KICKS`] displacements, or the
//! follower pool runs dry, the table flags itself saturated and the model is
//! expected to [`reset`](CuckooTable::reset) it (optionally replaying recent
//! history afterwards). Two-function cuckoo saturates near 50% load, which is
//! why the follower pool holds half as many slots as the key array.
//!
//! ## Context keys
//!
//! A context of length `len` (0..=7) packs into one word:
//!
//! ```text
//! bits 63..56   0x80 | len       (keys are nonzero and self-tagging)
//! bits 55..0    up to 7 context bytes, most recent in bits 7..0
//! ```
//!
//! The empty (root) context is `0x80 << 56`. The parent of a key drops its
//! most recent byte and decrements the length tag. The layout is private to
//! this module and the model; nothing else inspects it.

use std::marker::PhantomData;

use crate::error::{PompomError, Result};

/// Key of the zero-length root context.
pub const ROOT_KEY: u64 = 0x80 << 56;

/// Maximum number of displacements before an insert gives up.
const MAX_KICKS: u32 = 10000;

/// 64-bit words per follower bitmap.
const FOLLOWER_WORDS: usize = 4;

/// First usable follower slot; slot 0 stays all-zero and stands for "none".
const FOLLOWERS_BASE: u32 = 1;

/// Bytes of table memory per entry: key + count + follower index + half a
/// 32-byte bitmap.
const ENTRY_COST: usize = 8 + 2 + 4 + 16;

const LEN_MASK: u64 = 0xFF00_0000_0000_0000;
const CTX_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Key of the parent context: one byte shorter, most recent byte dropped.
#[inline(always)]
pub fn parent_key(key: u64) -> u64 {
    ((key & LEN_MASK) - (1 << 56)) | ((key & CTX_MASK) >> 8)
}

/// Key of the context extended by byte `c`: one byte longer, `c` most recent.
#[inline(always)]
pub fn child_key(key: u64, c: u8) -> u64 {
    (((key >> 56) + 1) << 56) | ((key << 8) & CTX_MASK) | c as u64
}

/// Pluggable hash pair over packed context keys.
///
/// The two functions must disagree on at least one bit for substantially all
/// keys, otherwise displacement has nowhere to go. Selected at compile time
/// via [`DefaultContextHash`].
pub trait ContextHash {
    fn h1(key: u64) -> u64;
    fn h2(key: u64) -> u64;
}

/// CRC-32C lookup table (polynomial 0x82F63B78).
const CRC32C_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = (crc >> 1) ^ (0x82F63B78 & 0u32.wrapping_sub(crc & 1));
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

#[inline(always)]
fn crc32c_word(mut crc: u32, word: u32) -> u32 {
    for b in word.to_le_bytes() {
        crc = (crc >> 8) ^ CRC32C_TABLE[((crc ^ b as u32) & 0xFF) as usize];
    }
    crc
}

/// Two CRC-32C evaluations that fold the key's 32-bit halves in opposite
/// orders.
pub struct Crc32cHash;

impl ContextHash for Crc32cHash {
    #[inline(always)]
    fn h1(key: u64) -> u64 {
        let crc = crc32c_word(0xFFFF_FFFF, (key >> 32) as u32);
        crc32c_word(crc, key as u32) as u64
    }

    #[inline(always)]
    fn h2(key: u64) -> u64 {
        let crc = crc32c_word(0xFFFF_FFFF, key as u32);
        crc32c_word(crc, (key >> 32) as u32) as u64
    }
}

/// Software fallback: FNV-1a for h1, Jenkins one-at-a-time for h2.
pub struct FnvJenkinsHash;

const FNV_OFFSET_BASIS: u64 = 14695981039346656037;
const FNV_PRIME: u64 = 1099511628211;

impl ContextHash for FnvJenkinsHash {
    #[inline(always)]
    fn h1(key: u64) -> u64 {
        let mut hash = FNV_OFFSET_BASIS;
        for i in 0..8 {
            hash = (hash ^ ((key >> (i << 3)) & 0xFF)).wrapping_mul(FNV_PRIME);
        }
        hash
    }

    #[inline(always)]
    fn h2(key: u64) -> u64 {
        let mut hash: u32 = 0;
        for i in 0..8 {
            hash = hash.wrapping_add(((key >> (i << 3)) & 0xFF) as u32);
            hash = hash.wrapping_add(hash << 10);
            hash ^= hash >> 6;
        }
        hash = hash.wrapping_add(hash << 3);
        hash ^= hash >> 11;
        hash = hash.wrapping_add(hash << 15);
        hash as u64
    }
}

/// Hash pair used by the model.
pub type DefaultContextHash = Crc32cHash;

/// Fixed-capacity context → (count, follower bitmap) store.
pub struct CuckooTable<H: ContextHash = DefaultContextHash> {
    /// Packed context keys; 0 marks an empty slot.
    keys: Vec<u64>,
    /// Context frequency counts, parallel to `keys`.
    counts: Vec<u16>,
    /// Index into the follower pool, parallel to `keys`; 0 means none.
    followers: Vec<u32>,
    /// Segregated pool of 256-bit follower bitmaps, 4 words each.
    follower_vecs: Vec<u64>,
    /// Next unallocated follower slot.
    follower_at: u32,
    /// Number of slots in the follower pool.
    follower_slots: u32,
    /// A recent insert terminated its kick loop or drained the pool.
    is_full: bool,
    /// Last key whose follower index was looked up, to skip hash calls on
    /// repeated bitmap access for the same context.
    cached_key: u64,
    cached_idx: u32,
    _hash: PhantomData<H>,
}

impl<H: ContextHash> CuckooTable<H> {
    /// Build a table sized to a memory limit in MiB.
    ///
    /// Allocation happens once; the capacity never changes afterwards.
    pub fn new(mem_mib: u16) -> Result<Self> {
        Self::with_capacity(((mem_mib as usize) << 20) / ENTRY_COST)
    }

    /// Build a table with an explicit entry count. Small capacities are
    /// useful for exercising saturation without a multi-megabyte corpus.
    pub fn with_capacity(entries: usize) -> Result<Self> {
        debug_assert!(entries >= 4, "table too small to hold the root context");
        let follower_slots = (entries >> 1) as u32;
        let mut table = Self {
            keys: alloc_zeroed(entries)?,
            counts: alloc_zeroed(entries)?,
            followers: alloc_zeroed(entries)?,
            follower_vecs: alloc_zeroed(follower_slots as usize * FOLLOWER_WORDS)?,
            follower_at: FOLLOWERS_BASE,
            follower_slots,
            is_full: false,
            cached_key: 0,
            cached_idx: 0,
            _hash: PhantomData,
        };
        table.reset();
        Ok(table)
    }

    /// Number of key slots.
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Number of occupied key slots.
    pub fn occupied(&self) -> usize {
        self.keys.iter().filter(|&&k| k != 0).count()
    }

    /// Size allocated for hash data is exhausted.
    #[inline]
    pub fn full(&self) -> bool {
        self.is_full
    }

    #[inline(always)]
    fn slot1(&self, key: u64) -> usize {
        (H::h1(key) % self.keys.len() as u64) as usize
    }

    #[inline(always)]
    fn slot2(&self, key: u64) -> usize {
        (H::h2(key) % self.keys.len() as u64) as usize
    }

    /// Frequency of a context, 0 if absent.
    #[inline]
    pub fn count(&self, key: u64) -> u16 {
        let a = self.slot1(key);
        if self.keys[a] == key {
            return self.counts[a];
        }
        let b = self.slot2(key);
        if self.keys[b] == key {
            return self.counts[b];
        }
        0
    }

    /// Whether a context is present.
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        self.keys[self.slot1(key)] == key || self.keys[self.slot2(key)] == key
    }

    /// Ensure a context is present with a zero count and a fresh follower
    /// slot. Returns false and flags saturation when no home can be found
    /// within [`MAX_KICKS`] displacements or the follower pool is dry; the
    /// entry displaced on the final kick is dropped, and no write guarantees
    /// hold until [`reset`](Self::reset).
    pub fn insert(&mut self, key: u64) -> bool {
        if self.contains(key) {
            return true;
        }
        if self.is_full {
            return false;
        }
        if self.follower_at >= self.follower_slots - 1 {
            self.is_full = true;
            return false;
        }

        let mut key = key;
        let mut count: u16 = 0;
        let mut follower = self.follower_at;
        self.follower_at += 1;

        let mut pos = self.slot1(key);
        for _ in 0..MAX_KICKS {
            if self.keys[pos] == 0 {
                self.keys[pos] = key;
                self.counts[pos] = count;
                self.followers[pos] = follower;
                return true;
            }

            // Kick the occupant over to its alternate slot
            std::mem::swap(&mut key, &mut self.keys[pos]);
            std::mem::swap(&mut count, &mut self.counts[pos]);
            std::mem::swap(&mut follower, &mut self.followers[pos]);
            pos = if pos == self.slot1(key) {
                self.slot2(key)
            } else {
                self.slot1(key)
            };
        }

        self.is_full = true;
        false
    }

    /// Record one occurrence of a context: insert if needed, bump its count,
    /// and mark it in its parent's follower bitmap. Returns false when the
    /// table is saturated and the occurrence could not be recorded.
    pub fn seen(&mut self, key: u64) -> bool {
        if !self.contains(key) && !self.insert(key) {
            return false;
        }

        // The root has no frequency of its own and no parent
        if key == ROOT_KEY {
            return true;
        }

        let a = self.slot1(key);
        if self.keys[a] == key {
            self.counts[a] = self.counts[a].saturating_add(1);
        } else {
            let b = self.slot2(key);
            self.counts[b] = self.counts[b].saturating_add(1);
        }

        self.set_follower(parent_key(key), (key & 0xFF) as u8);
        true
    }

    /// The 256-bit follower bitmap of a context; all zero if the context is
    /// absent (slot 0 of the pool is reserved and never written).
    #[inline]
    pub fn follower_vec(&mut self, key: u64) -> [u64; FOLLOWER_WORDS] {
        let off = self.follower_idx(key) as usize * FOLLOWER_WORDS;
        [
            self.follower_vecs[off],
            self.follower_vecs[off + 1],
            self.follower_vecs[off + 2],
            self.follower_vecs[off + 3],
        ]
    }

    /// Whether byte `c` is marked as a follower of the context.
    pub fn has_follower(&mut self, key: u64, c: u8) -> bool {
        let p = self.follower_idx(key);
        if p == 0 {
            return false;
        }
        self.follower_vecs[Self::follower_off(p, c)] & follower_mask(c) != 0
    }

    fn set_follower(&mut self, key: u64, c: u8) -> bool {
        let p = self.follower_idx(key);
        if p == 0 {
            return false;
        }
        self.follower_vecs[Self::follower_off(p, c)] |= follower_mask(c);
        true
    }

    #[inline(always)]
    fn follower_off(p: u32, c: u8) -> usize {
        p as usize * FOLLOWER_WORDS + (c >> 6) as usize
    }

    #[inline(always)]
    fn follower_idx(&mut self, key: u64) -> u32 {
        if key == self.cached_key {
            return self.cached_idx;
        }
        let a = self.slot1(key);
        if self.keys[a] == key {
            self.cached_key = key;
            self.cached_idx = self.followers[a];
            return self.cached_idx;
        }
        let b = self.slot2(key);
        if self.keys[b] == key {
            self.cached_key = key;
            self.cached_idx = self.followers[b];
            return self.cached_idx;
        }
        0
    }

    /// Halve every count. Keys and follower bitmaps are untouched; counts
    /// may floor at 0, which the model treats as "not present" when it
    /// builds a distribution.
    pub fn rescale(&mut self) {
        for count in &mut self.counts {
            *count >>= 1;
        }
    }

    /// Drop every entry and bitmap, clear the saturation flag, and re-seed
    /// the root context. The only path out of saturation.
    pub fn reset(&mut self) {
        self.keys.fill(0);
        self.counts.fill(0);
        self.followers.fill(0);
        self.follower_vecs.fill(0);
        self.follower_at = FOLLOWERS_BASE;
        self.cached_key = 0;
        self.cached_idx = 0;
        self.is_full = false;

        self.seen(ROOT_KEY);
    }
}

#[inline(always)]
fn follower_mask(c: u8) -> u64 {
    1 << (0x3F - (c & 0x3F))
}

fn alloc_zeroed<T: Clone + Default>(n: usize) -> Result<Vec<T>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(n).map_err(|_| PompomError::AllocationFailed {
        bytes: n * std::mem::size_of::<T>(),
    })?;
    v.resize(n, T::default());
    Ok(v)
}
