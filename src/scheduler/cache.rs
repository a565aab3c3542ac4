use crate::algebra::{Element, MatrixId, Tile, TileRef};
use indexmap::IndexMap;
use parking_lot::Mutex;
use siphasher::sip128::{Hasher128, SipHasher13};
use std::collections::HashMap;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SPILL_FILE: AtomicU64 = AtomicU64::new(0);

/// Identity of a cached tile result: the primary output tile and a
/// signature of the operation and all of its operand regions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub matrix: MatrixId,
    pub region: (usize, usize, usize, usize),
    pub signature: u128,
}

impl CacheKey {
    pub fn new(primary: &Tile, signature: u128) -> Self {
        Self {
            matrix: primary.matrix,
            region: (primary.row0, primary.col0, primary.nrows, primary.ncols),
            signature,
        }
    }
}

fn hash128(h: SipHasher13) -> u128 {
    let h = h.finish128();
    ((h.h1 as u128) << 64) | (h.h2 as u128)
}

/// Signature of an operation: its tag, scalar argument bytes and the
/// storage regions of its operands in argument order.
pub(crate) fn signature(tag: u8, scalar: &[u8], operands: &[Tile]) -> u128 {
    let mut h = SipHasher13::new();
    h.write_u8(tag);
    h.write(scalar);
    for t in operands {
        h.write_u64(t.matrix.as_u64());
        for v in [t.row0, t.col0, t.nrows, t.ncols] {
            h.write_usize(v);
        }
    }
    hash128(h)
}

/// Fingerprint of the current contents of a set of tiles.
pub(crate) fn fingerprint<T: Element>(views: &[TileRef<'_, T>]) -> u128 {
    let mut h = SipHasher13::new();
    let mut buf = Vec::new();
    for v in views {
        h.write_usize(v.nrows());
        h.write_usize(v.ncols());
        for j in 0..v.ncols() {
            buf.clear();
            for i in 0..v.nrows() {
                v[(i, j)].write_le_bytes(&mut buf);
            }
            h.write(&buf);
        }
    }
    hash128(h)
}

/// Counters describing cache activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub insertions: usize,
    pub evictions: usize,
    pub spills: usize,
    pub spill_errors: usize,
    pub resident_bytes: usize,
    pub resident_entries: usize,
    pub spilled_entries: usize,
}

struct Resident<T> {
    fingerprint: u128,
    matrices: Vec<MatrixId>,
    tiles: Vec<Vec<T>>,
}

impl<T: Element> Resident<T> {
    fn bytes(&self) -> usize {
        self.tiles.iter().map(|t| t.len()).sum::<usize>() * T::DATATYPE.size_of()
    }
}

struct Spilled {
    fingerprint: u128,
    matrices: Vec<MatrixId>,
    path: PathBuf,
    lens: Vec<usize>,
}

struct CacheInner<T> {
    // least recently used first
    resident: IndexMap<CacheKey, Resident<T>>,
    spilled: HashMap<CacheKey, Spilled>,
    resident_bytes: usize,
    stats: CacheStats,
}

/// Memoized tile task results.
///
/// Entries are validated against a fingerprint of the operand contents, so
/// a hit is only reported when the same operation is applied to tiles
/// holding the same values.  The in-memory store is bounded by a byte
/// budget; least recently used entries beyond the budget are written to
/// the spill directory, or dropped if there is none.  Spill files are
/// removed when the cache is dropped.
///
/// A cache outlives the scheduler that filled it and can be handed to the
/// next one (see [`TileScheduler::take_cache`](crate::scheduler::TileScheduler::take_cache)).
pub struct TileCache<T> {
    capacity: usize,
    spill_dir: Option<PathBuf>,
    inner: Mutex<CacheInner<T>>,
}

impl<T> std::fmt::Debug for TileCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("capacity", &self.capacity)
            .field("spill_dir", &self.spill_dir)
            .finish()
    }
}

impl<T> TileCache<T>
where
    T: Element,
{
    /// Cache holding at most `capacity` bytes in memory.  The spill
    /// directory is created if it does not exist.
    pub fn new(capacity: usize, spill_dir: Option<PathBuf>) -> std::io::Result<Self> {
        if let Some(ref dir) = spill_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self {
            capacity,
            spill_dir,
            inner: Mutex::new(CacheInner {
                resident: IndexMap::new(),
                spilled: HashMap::new(),
                resident_bytes: 0,
                stats: CacheStats::default(),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn spill_dir(&self) -> Option<&Path> {
        self.spill_dir.as_deref()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            resident_bytes: inner.resident_bytes,
            resident_entries: inner.resident.len(),
            spilled_entries: inner.spilled.len(),
            ..inner.stats
        }
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.resident.len() + inner.spilled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry that involves `matrix` as an operand.
    /// Returns the number of entries removed.
    pub fn invalidate(&self, matrix: MatrixId) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.resident.len() + inner.spilled.len();

        let mut freed = 0;
        inner.resident.retain(|_, e| {
            let keep = !e.matrices.contains(&matrix);
            if !keep {
                freed += e.bytes();
            }
            keep
        });
        inner.resident_bytes -= freed;
        inner.spilled.retain(|_, s| {
            let keep = !s.matrices.contains(&matrix);
            if !keep {
                let _ = std::fs::remove_file(&s.path);
            }
            keep
        });

        before - (inner.resident.len() + inner.spilled.len())
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.resident.clear();
        inner.resident_bytes = 0;
        for (_, s) in inner.spilled.drain() {
            let _ = std::fs::remove_file(&s.path);
        }
    }

    pub(crate) fn lookup(&self, key: &CacheKey, fingerprint: u128) -> Option<Vec<Vec<T>>> {
        let mut inner = self.inner.lock();

        if let Some(idx) = inner.resident.get_index_of(key) {
            if inner.resident[idx].fingerprint != fingerprint {
                inner.stats.misses += 1;
                return None;
            }
            let tiles = inner.resident[idx].tiles.clone();
            let last = inner.resident.len() - 1;
            inner.resident.move_index(idx, last);
            inner.stats.hits += 1;
            return Some(tiles);
        }

        let Some(spilled) = inner.spilled.remove(key) else {
            inner.stats.misses += 1;
            return None;
        };
        if spilled.fingerprint != fingerprint {
            inner.spilled.insert(key.clone(), spilled);
            inner.stats.misses += 1;
            return None;
        }
        let loaded = read_spill_file::<T>(&spilled.path, &spilled.lens);
        let _ = std::fs::remove_file(&spilled.path);
        match loaded {
            Ok(tiles) => {
                inner.stats.hits += 1;
                let entry = Resident {
                    fingerprint,
                    matrices: spilled.matrices,
                    tiles: tiles.clone(),
                };
                self.make_resident(&mut inner, key.clone(), entry);
                Some(tiles)
            }
            Err(_) => {
                inner.stats.spill_errors += 1;
                inner.stats.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(
        &self,
        key: CacheKey,
        fingerprint: u128,
        matrices: Vec<MatrixId>,
        tiles: Vec<Vec<T>>,
    ) {
        let mut inner = self.inner.lock();

        if let Some(old) = inner.resident.shift_remove(&key) {
            inner.resident_bytes -= old.bytes();
        }
        if let Some(old) = inner.spilled.remove(&key) {
            let _ = std::fs::remove_file(&old.path);
        }

        inner.stats.insertions += 1;
        let entry = Resident {
            fingerprint,
            matrices,
            tiles,
        };
        self.make_resident(&mut inner, key, entry);
    }

    // insert as most recently used, then evict down to capacity
    fn make_resident(&self, inner: &mut CacheInner<T>, key: CacheKey, entry: Resident<T>) {
        inner.resident_bytes += entry.bytes();
        inner.resident.insert(key, entry);

        while inner.resident_bytes > self.capacity {
            let Some((key, victim)) = inner.resident.shift_remove_index(0) else {
                break;
            };
            inner.resident_bytes -= victim.bytes();
            inner.stats.evictions += 1;
            self.spill(inner, key, victim);
        }
    }

    fn spill(&self, inner: &mut CacheInner<T>, key: CacheKey, victim: Resident<T>) {
        let Some(ref dir) = self.spill_dir else {
            return;
        };
        let seq = NEXT_SPILL_FILE.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("tessera-{}-{}.tile", std::process::id(), seq));

        let mut bytes = Vec::with_capacity(victim.bytes());
        for t in &victim.tiles {
            for v in t {
                v.write_le_bytes(&mut bytes);
            }
        }
        match std::fs::write(&path, &bytes) {
            Ok(()) => {
                inner.stats.spills += 1;
                let lens = victim.tiles.iter().map(|t| t.len()).collect();
                inner.spilled.insert(
                    key,
                    Spilled {
                        fingerprint: victim.fingerprint,
                        matrices: victim.matrices,
                        path,
                        lens,
                    },
                );
            }
            Err(_) => {
                inner.stats.spill_errors += 1;
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

fn read_spill_file<T: Element>(path: &Path, lens: &[usize]) -> std::io::Result<Vec<Vec<T>>> {
    let bytes = std::fs::read(path)?;
    let size = T::DATATYPE.size_of();
    if bytes.len() != lens.iter().sum::<usize>() * size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "truncated tile spill file",
        ));
    }
    let mut chunks = bytes.chunks_exact(size);
    let tiles = lens
        .iter()
        .map(|&len| chunks.by_ref().take(len).map(T::read_le_bytes).collect())
        .collect();
    Ok(tiles)
}

impl<T> Drop for TileCache<T> {
    fn drop(&mut self) {
        for s in self.inner.get_mut().spilled.values() {
            let _ = std::fs::remove_file(&s.path);
        }
    }
}
