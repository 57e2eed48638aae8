use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{ArchiveError, Error, Result};

/// Worker count used to partition every parallel loop.
static NUM_THREADS: AtomicUsize = AtomicUsize::new(1);

/// Sets how many contiguous ranges parallel loops split their input into.
/// Values below one are treated as one.
pub fn set_num_threads(n: usize) {
    NUM_THREADS.store(n.max(1), Ordering::Relaxed);
}

pub fn num_threads() -> usize {
    NUM_THREADS.load(Ordering::Relaxed)
}

/// The `stream_id`-th of `num_streams` near-equal contiguous slices of
/// `0..num_elements`. The last slice always ends at `num_elements`.
pub fn block_range(num_elements: usize, stream_id: usize, num_streams: usize) -> Range<usize> {
    let step = num_elements as f64 / num_streams as f64;
    let beg = (step * stream_id as f64) as usize;
    let end = if stream_id + 1 < num_streams {
        (step * (stream_id + 1) as f64) as usize
    } else {
        num_elements
    };
    beg..end
}

pub fn partition(num_elements: usize, num_streams: usize) -> Vec<Range<usize>> {
    let num_streams = num_streams.max(1);
    (0..num_streams)
        .map(|i| block_range(num_elements, i, num_streams))
        .collect()
}

/// Runs `f` over `num_threads()` contiguous ranges of `0..len` in parallel,
/// returning the results in range order.
pub fn par_ranges<T, F>(len: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(Range<usize>) -> T + Sync + Send,
{
    partition(len, num_threads())
        .into_par_iter()
        .map(f)
        .collect()
}

/// Joins the inner vectors into one, preserving order.
pub fn flatten<T: Clone + Send + Sync>(vec: &[Vec<T>]) -> Vec<T> {
    let total: usize = vec.par_iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    out.par_extend(vec.par_iter().flat_map_iter(|v| v.iter().cloned()));
    out
}

/// Polynomial string hash: `h = b + (h << 6) + (h << 16) - h`.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |h, &b| {
        (b as u64)
            .wrapping_add(h << 6)
            .wrapping_add(h << 16)
            .wrapping_sub(h)
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes through a sibling `.tmp` file and renames it over `path`; the
/// temporary file is removed if `write` fails.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
    where F: FnOnce(&mut BufWriter<File>) -> Result<()>
{
    let tmp = tmp_path(path);
    let written: Result<()> = (|| {
        let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush().map_err(|e| Error::io(&tmp, e))
    })();
    match written {
        Ok(()) => fs::rename(&tmp, path).map_err(|e| Error::io(path, e)),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Writes `values` as a tight array of little-endian u64.
pub fn write_binary(values: &[u64], path: &Path) -> Result<()> {
    write_atomic(path, |w| {
        for &v in values {
            w.write_u64::<LittleEndian>(v).map_err(|e| Error::io(path, e))?;
        }
        Ok(())
    })
}

pub fn read_binary(path: &Path) -> Result<Vec<u64>> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    if bytes.len() % 8 != 0 {
        return Err(ArchiveError::Misaligned {
            path: path.to_path_buf(),
            len: bytes.len() as u64,
        }.into());
    }
    Ok(bytes.chunks_exact(8).map(LittleEndian::read_u64).collect())
}

pub fn save_archive<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    write_atomic(path, |w| {
        bincode::serialize_into(w, value).map_err(|source| {
            ArchiveError::Bincode { path: path.to_path_buf(), source }.into()
        })
    })
}

pub fn load_archive<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    bincode::deserialize_from(BufReader::new(file))
        .map_err(|source| ArchiveError::Bincode { path: path.to_path_buf(), source }.into())
}

/// Logs the wall time of a stage at DEBUG level when stopped.
pub struct Stopwatch {
    label: &'static str,
    start: Instant,
}

impl Stopwatch {
    pub fn start(label: &'static str) -> Self {
        Self { label, start: Instant::now() }
    }

    pub fn stop(self) -> f64 {
        let seconds = self.start.elapsed().as_secs_f64();
        debug!("{}: {:.3} seconds", self.label, seconds);
        seconds
    }
}
