//! A single in-memory file: block list, open-handle registry, share modes,
//! and a change stream (spec §4.2).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::block_pool::{Block, BlockSource};
use crate::error::{Error, Result};

/// The access bits a [`StreamHandle`] wants to exercise, or the access
/// bits it grants other handles to hold concurrently (a share grant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMode {
    pub read: bool,
    pub write: bool,
}

impl AccessMode {
    pub const NONE: AccessMode = AccessMode { read: false, write: false };
    pub const READ: AccessMode = AccessMode { read: true, write: false };
    pub const WRITE: AccessMode = AccessMode { read: false, write: true };
    pub const READ_WRITE: AccessMode = AccessMode { read: true, write: true };

    fn intersect(self, other: AccessMode) -> AccessMode {
        AccessMode { read: self.read && other.read, write: self.write && other.write }
    }

    /// True iff every bit set in `self` is also set in `other`.
    fn subset_of(self, other: AccessMode) -> bool {
        (!self.read || other.read) && (!self.write || other.write)
    }
}

/// Kind of event published on a file's change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Modified,
    Disposed,
}

/// An event published to a file's subscribers.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub kind: FileChangeKind,
    pub new_length: u64,
    pub timestamp: SystemTime,
}

type Subscriber = Box<dyn FnMut(FileChangeEvent) + Send>;

struct Inner {
    length: u64,
    blocks: Vec<Block>,
    open_handles: HashMap<u64, (AccessMode, AccessMode)>,
    next_handle: u64,
    attributes: u32,
    last_modified: SystemTime,
    last_access: SystemTime,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber: u64,
}

/// One logical file's contents and concurrent-access discipline.
///
/// Lifetime is the union of "linked in its parent directory" and "at least
/// one open handle": the directory holds one `Arc<MemoryFile>` while
/// linked, each [`StreamHandle`] holds its own. When the strong count
/// drops to zero — unlinked and every handle closed — [`Drop`] returns the
/// file's blocks to the pool and notifies subscribers of disposal.
pub struct MemoryFile {
    inner: Mutex<Inner>,
    block_source: Arc<dyn BlockSource>,
}

impl MemoryFile {
    pub fn new(block_source: Arc<dyn BlockSource>) -> Arc<Self> {
        let now = SystemTime::now();
        Arc::new(Self {
            inner: Mutex::new(Inner {
                length: 0,
                blocks: Vec::new(),
                open_handles: HashMap::new(),
                next_handle: 0,
                attributes: 0,
                last_modified: now,
                last_access: now,
                subscribers: HashMap::new(),
                next_subscriber: 0,
            }),
            block_source,
        })
    }

    pub fn length(&self) -> u64 {
        self.inner.lock().expect("memory file lock poisoned").length
    }

    pub fn attributes(&self) -> u32 {
        self.inner.lock().expect("memory file lock poisoned").attributes
    }

    pub fn set_attributes(&self, attrs: u32) {
        let mut inner = self.inner.lock().expect("memory file lock poisoned");
        inner.attributes = attrs;
        inner.last_modified = SystemTime::now();
    }

    pub fn last_modified(&self) -> SystemTime {
        self.inner.lock().expect("memory file lock poisoned").last_modified
    }

    pub fn last_access(&self) -> SystemTime {
        self.inner.lock().expect("memory file lock poisoned").last_access
    }

    /// Opens a new handle on this file, applying the access/share matrix
    /// of spec §4.2. The very first open has no constraint.
    pub fn open(self: &Arc<Self>, access: AccessMode, share: AccessMode) -> Result<StreamHandle> {
        let mut inner = self.inner.lock().expect("memory file lock poisoned");

        if !inner.open_handles.is_empty() {
            let current_share = inner
                .open_handles
                .values()
                .map(|(_, s)| *s)
                .fold(AccessMode::READ_WRITE, AccessMode::intersect);

            if !access.subset_of(current_share) {
                return Err(Error::FileLocked(Default::default()));
            }
            if inner.open_handles.values().any(|(a, _)| !a.subset_of(share)) {
                return Err(Error::FileLocked(Default::default()));
            }
        }

        let id = inner.next_handle;
        inner.next_handle += 1;
        inner.open_handles.insert(id, (access, share));

        Ok(StreamHandle {
            file: self.clone(),
            id,
            access,
            share,
            position: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        })
    }

    fn close_handle(&self, id: u64) {
        self.inner.lock().expect("memory file lock poisoned").open_handles.remove(&id);
    }

    /// Registers a subscriber to the file's change stream, returning an id
    /// usable with [`Self::unsubscribe`].
    pub fn subscribe(&self, callback: impl FnMut(FileChangeEvent) + Send + 'static) -> u64 {
        let mut inner = self.inner.lock().expect("memory file lock poisoned");
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner.subscribers.insert(id, Box::new(callback));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner.lock().expect("memory file lock poisoned").subscribers.remove(&id);
    }

    fn notify(inner: &mut Inner, kind: FileChangeKind) {
        let event = FileChangeEvent { kind, new_length: inner.length, timestamp: SystemTime::now() };
        for subscriber in inner.subscribers.values_mut() {
            subscriber(event.clone());
        }
    }

    fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock().expect("memory file lock poisoned");
        inner.last_access = SystemTime::now();
        if pos >= inner.length {
            return Ok(0);
        }
        let available = (inner.length - pos) as usize;
        let to_read = buf.len().min(available);
        let block_size = self.block_source.block_size();
        copy_from_blocks(&inner.blocks, block_size, pos as usize, &mut buf[..to_read]);
        Ok(to_read)
    }

    fn write_at(&self, pos: u64, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock().expect("memory file lock poisoned");
        let block_size = self.block_source.block_size();
        let end = pos + data.len() as u64;
        let needed_blocks = div_ceil(end, block_size as u64) as usize;

        if needed_blocks > inner.blocks.len() {
            let mut newly = Vec::with_capacity(needed_blocks - inner.blocks.len());
            let mut failed = false;
            for _ in inner.blocks.len()..needed_blocks {
                match self.block_source.try_allocate()? {
                    Some(block) => newly.push(block),
                    None => {
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                for block in newly {
                    self.block_source.return_block(block);
                }
                return Err(Error::OutOfSpace);
            }
            inner.blocks.extend(newly);
        }

        copy_into_blocks(&mut inner.blocks, block_size, pos as usize, data);

        if end > inner.length {
            inner.length = end;
        }
        inner.last_modified = SystemTime::now();
        Self::notify(&mut inner, FileChangeKind::Modified);
        Ok(data.len())
    }

    /// Grows (zero-filling) or shrinks (releasing now-unused blocks) the
    /// file to exactly `new_len` bytes.
    pub fn set_length(&self, new_len: u64) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory file lock poisoned");
        let block_size = self.block_source.block_size() as u64;

        if new_len < inner.length {
            let needed_blocks = div_ceil(new_len, block_size) as usize;
            while inner.blocks.len() > needed_blocks {
                let block = inner.blocks.pop().expect("checked len above");
                self.block_source.return_block(block);
            }
        } else if new_len > inner.length {
            let needed_blocks = div_ceil(new_len, block_size) as usize;
            if needed_blocks > inner.blocks.len() {
                let mut newly = Vec::with_capacity(needed_blocks - inner.blocks.len());
                let mut failed = false;
                for _ in inner.blocks.len()..needed_blocks {
                    match self.block_source.try_allocate()? {
                        Some(block) => newly.push(block),
                        None => {
                            failed = true;
                            break;
                        }
                    }
                }
                if failed {
                    for block in newly {
                        self.block_source.return_block(block);
                    }
                    return Err(Error::OutOfSpace);
                }
                inner.blocks.extend(newly);
            }
        }

        inner.length = new_len;
        inner.last_modified = SystemTime::now();
        Self::notify(&mut inner, FileChangeKind::Modified);
        Ok(())
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().expect("memory file lock poisoned");
        for block in inner.blocks.drain(..) {
            self.block_source.return_block(block);
        }
        Self::notify(&mut inner, FileChangeKind::Disposed);
        tracing::trace!(backend = "memory_file", "file disposed, blocks released");
    }
}

fn div_ceil(n: u64, d: u64) -> u64 {
    (n + d - 1) / d
}

fn copy_from_blocks(blocks: &[Block], block_size: usize, start: usize, out: &mut [u8]) {
    let mut pos = start;
    let mut written = 0;
    while written < out.len() {
        let block_idx = pos / block_size;
        let offset = pos % block_size;
        let chunk = (block_size - offset).min(out.len() - written);
        out[written..written + chunk].copy_from_slice(&blocks[block_idx][offset..offset + chunk]);
        pos += chunk;
        written += chunk;
    }
}

fn copy_into_blocks(blocks: &mut [Block], block_size: usize, start: usize, data: &[u8]) {
    let mut pos = start;
    let mut read = 0;
    while read < data.len() {
        let block_idx = pos / block_size;
        let offset = pos % block_size;
        let chunk = (block_size - offset).min(data.len() - read);
        blocks[block_idx][offset..offset + chunk].copy_from_slice(&data[read..read + chunk]);
        pos += chunk;
        read += chunk;
    }
}

/// A caller's open reference to a [`MemoryFile`]: access bits, a share
/// grant, and an independent seek position.
pub struct StreamHandle {
    file: Arc<MemoryFile>,
    id: u64,
    access: AccessMode,
    share: AccessMode,
    position: AtomicU64,
    disposed: AtomicBool,
}

impl StreamHandle {
    fn check_disposed(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Reads into `buf` from the current position; returns the number of
    /// bytes read (0 at end of file).
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.check_disposed()?;
        if !self.access.read {
            return Err(Error::AccessDenied(Default::default()));
        }
        let pos = self.position.load(Ordering::Acquire);
        let n = self.file.read_at(pos, buf)?;
        self.position.fetch_add(n as u64, Ordering::AcqRel);
        Ok(n)
    }

    /// Writes `data` at the current position, extending the file if
    /// writing past its current end.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.check_disposed()?;
        if !self.access.write {
            return Err(Error::AccessDenied(Default::default()));
        }
        let pos = self.position.load(Ordering::Acquire);
        let n = self.file.write_at(pos, data)?;
        self.position.fetch_add(n as u64, Ordering::AcqRel);
        Ok(n)
    }

    /// Grows or shrinks the underlying file; clamps this handle's position
    /// to the new length if it now exceeds it.
    pub fn set_length(&self, n: u64) -> Result<()> {
        self.check_disposed()?;
        self.file.set_length(n)?;
        let _ = self.position.fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
            if cur > n {
                Some(n)
            } else {
                None
            }
        });
        Ok(())
    }

    /// Sets the handle's seek position arbitrarily; reading past the end
    /// of the file simply returns 0.
    pub fn seek(&self, pos: u64) {
        self.position.store(pos, Ordering::Release);
    }

    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    pub fn len(&self) -> u64 {
        self.file.length()
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn share(&self) -> AccessMode {
        self.share
    }

    /// The underlying file, e.g. to subscribe to its change stream.
    pub fn file(&self) -> &Arc<MemoryFile> {
        &self.file
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.disposed.store(true, Ordering::Release);
        self.file.close_handle(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_pool::BlockPool;

    #[test]
    fn round_trip_write_then_read() {
        let pool = BlockPool::new(8, 16, 16);
        let file = MemoryFile::new(pool);
        let handle = file.open(AccessMode::READ_WRITE, AccessMode::NONE).unwrap();
        let data = b"hello world, this spans several blocks";
        handle.write(data).unwrap();
        handle.seek(0);
        let mut buf = vec![0u8; data.len()];
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(n, data.len());
        assert_eq!(&buf, data);
    }

    #[test]
    fn read_past_end_returns_zero() {
        let pool = BlockPool::new(8, 4, 4);
        let file = MemoryFile::new(pool);
        let handle = file.open(AccessMode::READ_WRITE, AccessMode::NONE).unwrap();
        handle.write(b"abc").unwrap();
        handle.seek(100);
        let mut buf = [0u8; 4];
        assert_eq!(handle.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn quota_exhaustion_leaves_length_unchanged() {
        let pool = BlockPool::new(1024, 3, 4);
        let file = MemoryFile::new(pool.clone());
        let handle = file.open(AccessMode::READ_WRITE, AccessMode::NONE).unwrap();

        handle.write(&[1u8; 1024]).unwrap();
        handle.write(&[1u8; 1024]).unwrap();
        handle.write(&[1u8; 1024]).unwrap();
        assert_eq!(pool.bytes_available(), 0);

        let err = handle.write(&[1u8; 1]).unwrap_err();
        assert!(matches!(err, Error::OutOfSpace));
        assert_eq!(handle.len(), 3072);

        handle.set_length(0).unwrap();
        assert_eq!(pool.bytes_available(), 3072);

        handle.seek(0);
        handle.write(&[2u8; 3072]).unwrap();
        assert_eq!(handle.len(), 3072);
    }

    #[test]
    fn share_conflict_then_success_after_dispose() {
        let pool = BlockPool::new(8, 4, 4);
        let file = MemoryFile::new(pool);

        let exclusive = file.open(AccessMode::READ_WRITE, AccessMode::NONE).unwrap();
        let err = file.open(AccessMode::READ, AccessMode::READ_WRITE).unwrap_err();
        assert!(matches!(err, Error::FileLocked(_)));

        drop(exclusive);
        assert!(file.open(AccessMode::READ, AccessMode::READ_WRITE).is_ok());
    }

    #[test]
    fn access_bit_mismatch_is_denied_per_call() {
        let pool = BlockPool::new(8, 4, 4);
        let file = MemoryFile::new(pool);
        let read_only = file.open(AccessMode::READ, AccessMode::READ_WRITE).unwrap();
        assert!(matches!(read_only.write(b"x"), Err(Error::AccessDenied(_))));
    }

    #[test]
    fn unlinked_file_survives_while_handle_is_open() {
        let pool = BlockPool::new(8, 4, 4);
        let file = MemoryFile::new(pool.clone());
        let handle = file.open(AccessMode::READ_WRITE, AccessMode::NONE).unwrap();
        handle.write(b"A".repeat(8).as_slice()).unwrap();

        // Simulate unlink: drop the directory's reference, keep the handle.
        drop(file);
        assert_eq!(pool.bytes_available(), 8 * 3);

        let mut buf = [0u8; 8];
        handle.seek(0);
        assert_eq!(handle.read(&mut buf).unwrap(), 8);
        drop(handle);
        assert_eq!(pool.bytes_available(), 8 * 4);
    }
}
