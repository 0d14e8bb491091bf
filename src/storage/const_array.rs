use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::handle_pool::HandlePool;

const OFFSETS_FILENAME: &str = "offsets";
const DATA_FILENAME: &str = "data";

/// Read handles opened per array; bounds concurrent readers and descriptors.
const DEFAULT_POOL_HANDLES: usize = 10;

/// Appends records to an on-disk constant array: a `data` file holding the
/// concatenated records and an `offsets` file of 8-byte big-endian integers,
/// one per record plus a terminating total length.
pub struct ConstArrayWriter {
    count: usize,
    offset: i64,
    offsets_file: File,
    data_file: File,
}

impl ConstArrayWriter {
    /// Creates `dir` if needed and starts a fresh array in it, truncating
    /// any previous one.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let offsets_file = File::create(dir.join(OFFSETS_FILENAME))?;
        let data_file = File::create(dir.join(DATA_FILENAME))?;
        Ok(ConstArrayWriter {
            count: 0,
            offset: 0,
            offsets_file,
            data_file,
        })
    }

    /// Appends one record and returns its dense index, starting at 0.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        self.offsets_file.write_all(&self.offset.to_be_bytes())?;
        self.data_file.write_all(bytes)?;
        self.count += 1;
        self.offset += bytes.len() as i64;
        Ok(self.count - 1)
    }

    /// Serializes `value` and appends it as one record.
    pub fn append_value<T: Serialize>(&mut self, value: &T) -> Result<usize> {
        let bytes = bincode::serialize(value)?;
        self.append_bytes(&bytes)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Writes the terminating offset and closes both files. The last error
    /// encountered wins.
    pub fn close(mut self) -> Result<()> {
        let mut result = Ok(());
        if let Err(err) = self.offsets_file.write_all(&self.offset.to_be_bytes()) {
            result = Err(Error::from(err));
        }
        if let Err(err) = self.offsets_file.sync_all() {
            result = Err(Error::from(err));
        }
        if let Err(err) = self.data_file.sync_all() {
            result = Err(Error::from(err));
        }
        result
    }
}

/// Random-access reader over a constant array written by
/// [`ConstArrayWriter`].
///
/// The offsets table is loaded whole at open and immutable afterwards; data
/// reads go through a bounded pool of independent handles, so up to the pool
/// capacity of operations proceed concurrently with no locking.
#[derive(Debug)]
pub struct ConstArrayReader {
    offsets: Vec<i64>,
    pool: HandlePool,
}

impl ConstArrayReader {
    /// Opens the array in `dir` with the default pool of read handles.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with_handles(dir, DEFAULT_POOL_HANDLES)
    }

    /// Opens the array with `handles` pooled read handles.
    pub fn open_with_handles<P: AsRef<Path>>(dir: P, handles: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let mut raw = Vec::new();
        File::open(dir.join(OFFSETS_FILENAME))?.read_to_end(&mut raw)?;
        if raw.len() % 8 != 0 {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("offsets file length {} is not a multiple of 8", raw.len()),
            ));
        }
        let offsets = raw
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                i64::from_be_bytes(buf)
            })
            .collect();

        let mut files = Vec::with_capacity(handles);
        for _ in 0..handles {
            files.push(File::open(dir.join(DATA_FILENAME))?);
        }
        Ok(ConstArrayReader {
            offsets,
            pool: HandlePool::new(files),
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_record(&self, file: &mut File, index: usize) -> Result<Vec<u8>> {
        file.seek(SeekFrom::Start(self.offsets[index] as u64))?;
        let length = (self.offsets[index + 1] - self.offsets[index]) as usize;
        let mut bytes = vec![0u8; length];
        file.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads record `index`. The caller must keep `index` within `[0, len)`.
    pub fn get_bytes(&self, index: usize) -> Result<Vec<u8>> {
        let mut handle = self.pool.acquire()?;
        self.read_record(&mut handle, index)
    }

    /// Reads the given records on one handle, in the given order (callers
    /// sort for locality if they want it). An `output` error aborts.
    pub fn fetch_bytes<F>(&self, indexes: &[usize], mut output: F) -> Result<()>
    where
        F: FnMut(usize, &[u8]) -> Result<()>,
    {
        let mut handle = self.pool.acquire()?;
        for &index in indexes {
            let bytes = self.read_record(&mut handle, index)?;
            output(index, &bytes)?;
        }
        Ok(())
    }

    /// Visits every record in append order with a single sequential pass.
    pub fn for_each_bytes<F>(&self, mut output: F) -> Result<()>
    where
        F: FnMut(usize, &[u8]) -> Result<()>,
    {
        let mut handle = self.pool.acquire()?;
        handle.seek(SeekFrom::Start(0))?;
        for index in 0..self.len() {
            let length = (self.offsets[index + 1] - self.offsets[index]) as usize;
            let mut bytes = vec![0u8; length];
            handle.read_exact(&mut bytes)?;
            output(index, &bytes)?;
        }
        Ok(())
    }

    /// Reads and deserializes record `index`.
    pub fn get_value<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let bytes = self.get_bytes(index)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// [`Self::fetch_bytes`] with deserialized records.
    pub fn fetch_values<T, F>(&self, indexes: &[usize], mut output: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(usize, T) -> Result<()>,
    {
        let mut handle = self.pool.acquire()?;
        for &index in indexes {
            let bytes = self.read_record(&mut handle, index)?;
            output(index, bincode::deserialize(&bytes)?)?;
        }
        Ok(())
    }

    /// [`Self::for_each_bytes`] with deserialized records.
    pub fn for_each_value<T, F>(&self, mut output: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(usize, T) -> Result<()>,
    {
        let mut handle = self.pool.acquire()?;
        handle.seek(SeekFrom::Start(0))?;
        for index in 0..self.len() {
            let length = (self.offsets[index + 1] - self.offsets[index]) as usize;
            let mut bytes = vec![0u8; length];
            handle.read_exact(&mut bytes)?;
            output(index, bincode::deserialize(&bytes)?)?;
        }
        Ok(())
    }

    /// Waits for in-flight reads and closes every pooled handle. Releasing
    /// a read-only handle cannot itself fail, so the last error that can
    /// surface here is a pool drain failure.
    pub fn close(self) -> Result<()> {
        self.pool.drain().map(drop)
    }
}
