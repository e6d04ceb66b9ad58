//! Fixed-size byte-block allocator with a bounded free-list and a total
//! quota (spec §4.1), grounded on the teacher's `Allocator` (an `mpsc`
//! channel of pre-filled buffers that `alloc` blocks on).
//!
//! The quota is modeled as a bounded channel of admission permits sized
//! `max_blocks`: every permit received corresponds to one block charged
//! against `allocated_count`, and every `return_block` sends a permit back,
//! waking one FIFO-ordered waiter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crossbeam_queue::ArrayQueue;

use crate::error::{Error, Result};

/// A reusable fixed-size byte buffer handed out by a [`BlockSource`].
pub type Block = Box<[u8]>;

/// Common interface of [`BlockPool`] and [`PseudoBlockPool`], so
/// `MemoryFile` can be backed by either without caring which.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Size in bytes of every block this source hands out.
    fn block_size(&self) -> usize;

    /// Non-blocking allocation; `None` if the pool is at quota.
    fn try_allocate(&self) -> Result<Option<Block>>;

    /// Blocks the calling thread until a block becomes available or the
    /// pool is disposed.
    fn allocate_blocking(&self) -> Result<Block>;

    /// Async equivalent of [`Self::allocate_blocking`].
    async fn allocate(&self) -> Result<Block>;

    /// Returns a block to the pool. The block must have originated from
    /// this source.
    fn return_block(&self, block: Block);

    /// Bytes currently available for allocation (`u64::MAX` for the
    /// pseudo-pool).
    fn bytes_available(&self) -> u64;

    /// Disposes the pool, waking every blocked waiter with
    /// [`Error::Disposed`].
    fn dispose(&self);
}

/// A real, quota-enforcing block pool.
pub struct BlockPool {
    block_size: usize,
    max_blocks: usize,
    clear_on_allocate: bool,
    allocated_count: AtomicUsize,
    free_queue: ArrayQueue<Block>,
    permits_tx: async_channel::Sender<()>,
    permits_rx: async_channel::Receiver<()>,
}

impl BlockPool {
    /// Creates a pool of `max_blocks` blocks of `block_size` bytes each,
    /// with a free-list bounded by `max_free_queue`.
    pub fn new(block_size: usize, max_blocks: usize, max_free_queue: usize) -> Arc<Self> {
        Self::with_clear_on_allocate(block_size, max_blocks, max_free_queue, true)
    }

    pub fn with_clear_on_allocate(
        block_size: usize,
        max_blocks: usize,
        max_free_queue: usize,
        clear_on_allocate: bool,
    ) -> Arc<Self> {
        let (permits_tx, permits_rx) = async_channel::bounded(max_blocks.max(1));
        for _ in 0..max_blocks {
            permits_tx.try_send(()).expect("capacity sized to max_blocks");
        }
        Arc::new(Self {
            block_size,
            max_blocks,
            clear_on_allocate,
            allocated_count: AtomicUsize::new(0),
            free_queue: ArrayQueue::new(max_free_queue.max(1)),
            permits_tx,
            permits_rx,
        })
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated_count.load(Ordering::Acquire)
    }

    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    fn take_or_make_block(&self) -> Block {
        match self.free_queue.pop() {
            Some(mut block) => {
                if self.clear_on_allocate {
                    block.iter_mut().for_each(|b| *b = 0);
                }
                block
            }
            None => vec![0u8; self.block_size].into_boxed_slice(),
        }
    }
}

#[async_trait]
impl BlockSource for BlockPool {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn try_allocate(&self) -> Result<Option<Block>> {
        match self.permits_rx.try_recv() {
            Ok(()) => {
                self.allocated_count.fetch_add(1, Ordering::AcqRel);
                tracing::trace!(
                    backend = "block_pool",
                    allocated = self.allocated_count(),
                    "block allocated"
                );
                Ok(Some(self.take_or_make_block()))
            }
            Err(async_channel::TryRecvError::Empty) => Ok(None),
            Err(async_channel::TryRecvError::Closed) => Err(Error::Disposed),
        }
    }

    fn allocate_blocking(&self) -> Result<Block> {
        self.permits_rx.recv_blocking().map_err(|_| Error::Disposed)?;
        self.allocated_count.fetch_add(1, Ordering::AcqRel);
        Ok(self.take_or_make_block())
    }

    async fn allocate(&self) -> Result<Block> {
        self.permits_rx.recv().await.map_err(|_| Error::Disposed)?;
        self.allocated_count.fetch_add(1, Ordering::AcqRel);
        Ok(self.take_or_make_block())
    }

    fn return_block(&self, block: Block) {
        self.allocated_count.fetch_sub(1, Ordering::AcqRel);
        if self.free_queue.push(block).is_err() {
            tracing::trace!(backend = "block_pool", "free queue full, releasing block");
        }
        // Wake one FIFO-ordered waiter; ignore failure when the pool is
        // disposed (the channel is closed) or already at full permits.
        let _ = self.permits_tx.try_send(());
    }

    fn bytes_available(&self) -> u64 {
        let remaining = self.max_blocks.saturating_sub(self.allocated_count());
        (remaining * self.block_size) as u64
    }

    fn dispose(&self) {
        self.permits_rx.close();
        tracing::debug!(backend = "block_pool", "pool disposed");
    }
}

/// A zero-quota pool: allocation never blocks or fails, returns are no-ops.
pub struct PseudoBlockPool {
    block_size: usize,
}

impl PseudoBlockPool {
    pub fn new(block_size: usize) -> Arc<Self> {
        Arc::new(Self { block_size })
    }
}

#[async_trait]
impl BlockSource for PseudoBlockPool {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn try_allocate(&self) -> Result<Option<Block>> {
        Ok(Some(vec![0u8; self.block_size].into_boxed_slice()))
    }

    fn allocate_blocking(&self) -> Result<Block> {
        Ok(vec![0u8; self.block_size].into_boxed_slice())
    }

    async fn allocate(&self) -> Result<Block> {
        Ok(vec![0u8; self.block_size].into_boxed_slice())
    }

    fn return_block(&self, _block: Block) {}

    fn bytes_available(&self) -> u64 {
        u64::MAX
    }

    fn dispose(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_allocate_enforces_quota() {
        let pool = BlockPool::new(1024, 3, 8);
        assert!(pool.try_allocate().unwrap().is_some());
        assert!(pool.try_allocate().unwrap().is_some());
        assert!(pool.try_allocate().unwrap().is_some());
        assert!(pool.try_allocate().unwrap().is_none());
        assert_eq!(pool.bytes_available(), 0);
    }

    #[test]
    fn conservation_invariant_holds_across_alloc_and_return() {
        let pool = BlockPool::new(1024, 3, 8);
        let a = pool.try_allocate().unwrap().unwrap();
        let b = pool.try_allocate().unwrap().unwrap();
        assert_eq!(pool.bytes_available(), 1024);
        pool.return_block(a);
        assert_eq!(pool.bytes_available(), 2048);
        pool.return_block(b);
        assert_eq!(pool.bytes_available(), 3072);
    }

    #[test]
    fn free_queue_reuses_returned_blocks() {
        let pool = BlockPool::new(8, 1, 1);
        let block = pool.try_allocate().unwrap().unwrap();
        pool.return_block(block);
        let reused = pool.try_allocate().unwrap().unwrap();
        assert_eq!(reused.len(), 8);
        assert!(reused.iter().all(|&b| b == 0));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn allocate_blocks_until_a_block_is_returned() {
        let pool = BlockPool::new(8, 1, 1);
        let held = pool.try_allocate().unwrap().unwrap();

        let pool2 = pool.clone();
        let waiter = tokio::spawn(async move { pool2.allocate().await });

        tokio::task::yield_now().await;
        pool.return_block(held);

        let result = waiter.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispose_wakes_waiters_with_disposed_error() {
        let pool = BlockPool::new(8, 1, 1);
        let _held = pool.try_allocate().unwrap().unwrap();

        let pool2 = pool.clone();
        let waiter = tokio::spawn(async move { pool2.allocate().await });

        tokio::task::yield_now().await;
        pool.dispose();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::Disposed)));
    }

    #[test]
    fn pseudo_pool_never_blocks_or_fails() {
        let pool = PseudoBlockPool::new(64);
        assert_eq!(pool.bytes_available(), u64::MAX);
        let block = pool.try_allocate().unwrap().unwrap();
        pool.return_block(block);
        assert_eq!(pool.bytes_available(), u64::MAX);
    }
}
