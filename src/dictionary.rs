//! Sharded frequency dictionary mapping tokens to dense integer ids.
//!
//! Counting happens in parallel into `capacity` ordered maps, each behind
//! its own mutex; a token always lands in shard `hash(token) % capacity`.
//! [`CountDictionary::finalize`] ranks every token by count and hands out
//! ids `1..=vocab_size`, after which [`CountDictionary::translate`] maps
//! tokens to ids, with [`UNK`] for everything outside the vocabulary.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DictionaryError, Result};
use crate::util::{self, hash_bytes, par_ranges, Stopwatch};

/// Id of every token outside the vocabulary.
pub const UNK: u64 = 0;

const SAMPLE_FRACTION: f64 = 0.05;
const CAPACITY_FACTOR: f64 = 2.0;

/// Hash used to pick a token's shard.
pub trait KeyHasher<K: ?Sized> {
    fn hash_key(key: &K) -> u64;
}

/// [`hash_bytes`] over the key's bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringHash;

impl<K: AsRef<[u8]> + ?Sized> KeyHasher<K> for StringHash {
    fn hash_key(key: &K) -> u64 {
        hash_bytes(key.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryOptions {
    /// Seed of the sampler used to estimate the shard count.
    pub seed: u64,
    /// Fixed shard count, skipping the estimate.
    pub capacity: Option<usize>,
}

type Shard<K> = Mutex<BTreeMap<K, u64>>;

pub struct CountDictionary<K, H = StringHash> {
    vocab_size: u64,
    options: DictionaryOptions,
    num_keys: AtomicU64,
    counts: OnceLock<Vec<Shard<K>>>,
    word2int: Vec<BTreeMap<K, u64>>,
    finalized: bool,
    hasher: PhantomData<fn() -> H>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shard count for a first batch: `2 · u / 0.05`, where `u` is the number
/// of distinct tokens among `floor(0.05 · |tokens|)` positions drawn with
/// replacement.
pub fn estimate_capacity<K: Ord>(tokens: &[K], seed: u64) -> usize {
    let samples = (tokens.len() as f64 * SAMPLE_FRACTION) as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    let unique: BTreeSet<&K> = (0..samples)
        .map(|_| &tokens[rng.gen_range(0..tokens.len())])
        .collect();
    let capacity = (CAPACITY_FACTOR * unique.len() as f64 / SAMPLE_FRACTION).ceil() as usize;
    capacity.max(1)
}

impl<K, H> CountDictionary<K, H>
    where
        K: Ord + Clone + Send + Sync,
        H: KeyHasher<K>,
{
    pub fn new(vocab_size: u64) -> Self {
        Self::with_options(vocab_size, DictionaryOptions::default())
    }

    pub fn with_options(vocab_size: u64, options: DictionaryOptions) -> Self {
        CountDictionary {
            vocab_size,
            options,
            num_keys: AtomicU64::new(0),
            counts: OnceLock::new(),
            word2int: Vec::new(),
            finalized: false,
            hasher: PhantomData,
        }
    }

    fn shard_of(&self, key: &K, capacity: usize) -> usize {
        (H::hash_key(key) % capacity as u64) as usize
    }

    fn new_shards(capacity: usize) -> Vec<Shard<K>> {
        (0..capacity).map(|_| Mutex::new(BTreeMap::new())).collect()
    }

    /// Counts every token of the batch. The first non-empty batch fixes the
    /// shard count.
    pub fn process_tokens(&self, tokens: &[K]) -> Result<(), DictionaryError> {
        if self.finalized {
            return Err(DictionaryError::AlreadyFinalized);
        }
        if tokens.is_empty() {
            return Ok(());
        }
        let shards = self.counts.get_or_init(|| {
            let capacity = self.options.capacity
                .unwrap_or_else(|| estimate_capacity(tokens, self.options.seed))
                .max(1);
            debug!(capacity, "allocating dictionary shards");
            Self::new_shards(capacity)
        });
        par_ranges(tokens.len(), |range| {
            for token in &tokens[range] {
                let mut shard = lock(&shards[self.shard_of(token, shards.len())]);
                match shard.get_mut(token) {
                    Some(count) => *count += 1,
                    None => {
                        shard.insert(token.clone(), 1);
                        self.num_keys.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });
        Ok(())
    }

    /// Assigns ids `1..=min(num_keys, vocab_size)` by descending count, ties
    /// broken by ascending key.
    pub fn finalize(&mut self) -> Result<(), DictionaryError> {
        if self.finalized {
            return Err(DictionaryError::AlreadyFinalized);
        }
        let sw = Stopwatch::start("finalize dictionary");
        if self.counts.get().is_none() {
            let _ = self.counts.set(Self::new_shards(1));
        }
        let capacity = self.capacity();
        let mut pairs: Vec<(K, u64)> = match self.counts.get_mut() {
            Some(shards) => shards.iter_mut()
                .flat_map(|m| {
                    let map = m.get_mut().unwrap_or_else(PoisonError::into_inner);
                    map.iter().map(|(k, &c)| (k.clone(), c)).collect::<Vec<_>>()
                })
                .collect(),
            None => Vec::new(),
        };
        pairs.par_sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let kept = pairs.len().min(self.vocab_size as usize);
        let mut word2int: Vec<BTreeMap<K, u64>> = (0..capacity).map(|_| BTreeMap::new()).collect();
        for (i, (key, _)) in pairs.into_iter().take(kept).enumerate() {
            let shard = self.shard_of(&key, capacity);
            word2int[shard].insert(key, i as u64 + 1);
        }
        self.word2int = word2int;
        self.finalized = true;
        sw.stop();
        info!(num_keys = self.num_keys(), vocab_size = self.vocab_size, ids = kept, "dictionary finalized");
        Ok(())
    }

    fn lookup(&self, key: &K) -> u64 {
        if self.word2int.is_empty() {
            return UNK;
        }
        let shard = &self.word2int[self.shard_of(key, self.word2int.len())];
        match shard.get(key) {
            Some(&id) if id < self.vocab_size => id,
            _ => UNK,
        }
    }

    pub fn translate(&self, tokens: &[K]) -> Result<Vec<u64>, DictionaryError> {
        if !self.finalized {
            return Err(DictionaryError::NotFinalized);
        }
        let parts = par_ranges(tokens.len(), |range| {
            tokens[range].iter().map(|t| self.lookup(t)).collect::<Vec<_>>()
        });
        Ok(parts.concat())
    }

    pub fn translate_nested(&self, nested: &[Vec<K>]) -> Result<Vec<Vec<u64>>, DictionaryError> {
        if !self.finalized {
            return Err(DictionaryError::NotFinalized);
        }
        let parts = par_ranges(nested.len(), |range| {
            nested[range].iter()
                .map(|tokens| tokens.iter().map(|t| self.lookup(t)).collect())
                .collect::<Vec<Vec<u64>>>()
        });
        Ok(parts.into_iter().flatten().collect())
    }

    /// Times `key` was counted, zero if never seen.
    pub fn count(&self, key: &K) -> u64 {
        match self.counts.get() {
            Some(shards) => lock(&shards[self.shard_of(key, shards.len())])
                .get(key)
                .copied()
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Raw assigned id, before the `< vocab_size` gate of `translate`.
    pub fn word2int(&self, key: &K) -> Option<u64> {
        if self.word2int.is_empty() {
            return None;
        }
        self.word2int[self.shard_of(key, self.word2int.len())].get(key).copied()
    }

    pub fn num_keys(&self) -> u64 {
        self.num_keys.load(Ordering::Relaxed)
    }

    pub fn vocab_size(&self) -> u64 {
        self.vocab_size
    }

    /// Number of shards, zero before the first batch.
    pub fn capacity(&self) -> usize {
        self.counts.get().map_or(0, Vec::len)
    }

    pub fn total_count(&self) -> u64 {
        self.counts.get().map_or(0, |shards| {
            shards.par_iter().map(|m| lock(m).values().sum::<u64>()).sum()
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.counts.get().is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

#[derive(Serialize)]
struct ArchiveRef<'a, K: Ord> {
    num_keys: u64,
    vocab_size: u64,
    capacity: u64,
    counts: Vec<&'a BTreeMap<K, u64>>,
    word2int: &'a [BTreeMap<K, u64>],
    initialized: bool,
    finalized: bool,
}

#[derive(Deserialize)]
struct Archive<K: Ord> {
    num_keys: u64,
    vocab_size: u64,
    capacity: u64,
    counts: Vec<BTreeMap<K, u64>>,
    word2int: Vec<BTreeMap<K, u64>>,
    initialized: bool,
    finalized: bool,
}

impl<K, H> CountDictionary<K, H>
    where
        K: Ord + Clone + Send + Sync + Serialize + DeserializeOwned,
        H: KeyHasher<K>,
{
    pub fn save(&self, path: &Path) -> Result<()> {
        let guards: Vec<_> = self.counts.get()
            .map(|shards| shards.iter().map(lock).collect())
            .unwrap_or_default();
        let archive = ArchiveRef {
            num_keys: self.num_keys(),
            vocab_size: self.vocab_size,
            capacity: self.capacity() as u64,
            counts: guards.iter().map(|g| &**g).collect(),
            word2int: &self.word2int,
            initialized: self.is_initialized(),
            finalized: self.finalized,
        };
        util::save_archive(&archive, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let archive: Archive<K> = util::load_archive(path)?;
        debug!(path = %path.display(), capacity = archive.capacity, finalized = archive.finalized, "restored dictionary");
        let counts = if archive.initialized {
            OnceLock::from(archive.counts.into_iter().map(Mutex::new).collect::<Vec<_>>())
        } else {
            OnceLock::new()
        };
        Ok(CountDictionary {
            vocab_size: archive.vocab_size,
            options: DictionaryOptions::default(),
            num_keys: AtomicU64::new(archive.num_keys),
            counts,
            word2int: archive.word2int,
            finalized: archive.finalized,
            hasher: PhantomData,
        })
    }
}
