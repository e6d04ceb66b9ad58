//! mamont-vfs - a composable in-process virtual filesystem.
//!
//! [`memory_fs::MemoryFileSystem`] is a quota-accounted, block-pooled
//! in-memory backend. [`decoration::FileSystemDecoration`] merges several
//! backends into one namespace, routing writes to the first component that
//! accepts them. [`virtual_fs::VirtualFileSystem`] extends that into a full
//! mount table, dispatching by longest matching prefix and synthesizing the
//! read-only directories between mount points. Every layer publishes
//! structured change events through [`observer::EventHub`], letting a
//! caller subscribe once to a glob over the composed namespace regardless of
//! which backend (or mount) a change actually originated from.

pub mod block_pool;
pub mod config;
pub mod decoration;
pub mod dispose;
pub mod entry;
pub mod error;
pub mod memory_fs;
pub mod observer;
pub mod path;
pub mod path_converter;
pub mod virtual_fs;

pub use decoration::{Component, FileSystemBackend, FileSystemDecoration};
pub use entry::{CapabilityOptions, CaseSensitivity, EmptyDirectoryName, Entry, EntryKind};
pub use error::{Error, Result};
pub use memory_fs::MemoryFileSystem;
pub use virtual_fs::{MountAssignment, VirtualFileSystem};
