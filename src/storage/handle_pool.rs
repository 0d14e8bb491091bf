use std::fs::File;
use std::ops::{Deref, DerefMut};

use crossbeam::channel::{Receiver, Sender, bounded};

use crate::core::error::{Error, ErrorKind, Result};

/// Bounded pool of independent handles to the same file.
///
/// At most `capacity` operations run at once; acquisition blocks while every
/// handle is checked out. The guard returns its handle when dropped, on
/// success and error paths alike.
#[derive(Debug)]
pub struct HandlePool {
    slots: Receiver<File>,
    returns: Sender<File>,
    capacity: usize,
}

impl HandlePool {
    pub fn new(handles: Vec<File>) -> Self {
        let capacity = handles.len();
        let (returns, slots) = bounded(capacity);
        for handle in handles {
            // the channel was sized for exactly these handles
            let _ = returns.send(handle);
        }
        HandlePool {
            slots,
            returns,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Checks a handle out, blocking until one is free.
    pub fn acquire(&self) -> Result<PooledFile<'_>> {
        let file = self
            .slots
            .recv()
            .map_err(|_| Error::new(ErrorKind::Io, "handle pool disconnected".to_string()))?;
        Ok(PooledFile {
            file: Some(file),
            returns: &self.returns,
        })
    }

    /// Takes every handle back, waiting for in-flight guards to finish.
    /// Fails if the pool lost a handle instead of getting it returned.
    pub fn drain(self) -> Result<Vec<File>> {
        let mut handles = Vec::with_capacity(self.capacity);
        for _ in 0..self.capacity {
            let file = self.slots.recv().map_err(|_| {
                Error::new(
                    ErrorKind::Io,
                    "handle pool disconnected before drain finished".to_string(),
                )
            })?;
            handles.push(file);
        }
        Ok(handles)
    }
}

/// A checked-out file handle; re-queued on drop.
pub struct PooledFile<'a> {
    file: Option<File>,
    returns: &'a Sender<File>,
}

impl Deref for PooledFile<'_> {
    type Target = File;

    fn deref(&self) -> &File {
        self.file.as_ref().expect("handle present until drop")
    }
}

impl DerefMut for PooledFile<'_> {
    fn deref_mut(&mut self) -> &mut File {
        self.file.as_mut().expect("handle present until drop")
    }
}

impl Drop for PooledFile<'_> {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = self.returns.send(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pool_of(handles: usize) -> (tempfile::TempDir, HandlePool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::File::create(&path).unwrap().write_all(b"x").unwrap();
        let files = (0..handles)
            .map(|_| File::open(&path).unwrap())
            .collect();
        (dir, HandlePool::new(files))
    }

    #[test]
    fn acquire_blocks_at_capacity() {
        let (_dir, pool) = pool_of(2);
        let first = pool.acquire().unwrap();
        let second = pool.acquire().unwrap();
        assert!(
            pool.slots.is_empty(),
            "both handles should be checked out"
        );
        drop(first);
        let third = pool.acquire().unwrap();
        drop(second);
        drop(third);
        assert_eq!(pool.drain().unwrap().len(), 2);
    }

    #[test]
    fn guard_returns_handle_on_drop() {
        let (_dir, pool) = pool_of(1);
        for _ in 0..10 {
            let handle = pool.acquire().unwrap();
            drop(handle);
        }
        assert_eq!(pool.drain().unwrap().len(), 1);
    }
}
