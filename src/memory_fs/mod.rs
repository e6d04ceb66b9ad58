//! Hierarchical namespace over `MemoryFile`/`MemoryDirectory` nodes:
//! browse/create/delete/move plus the observer hub (spec §4.3).

pub mod file;

pub use file::{AccessMode, FileChangeEvent, FileChangeKind, MemoryFile, StreamHandle};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::block_pool::BlockSource;
use crate::decoration::FileSystemBackend;
use crate::dispose::Belate;
use crate::entry::{CapabilityOptions, CaseSensitivity, EmptyDirectoryName, Entry, EntryKind};
use crate::error::{Error, Result};
use crate::observer::{Event, EventHub, EventKind, EventSource};
use crate::path;

/// How an `open` call should treat existence of the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Requires an existing file; fails with `notFound` otherwise.
    Open,
    /// Opens if the file exists, otherwise creates it.
    OpenOrCreate,
    /// Requires non-existence; fails with `alreadyExists` otherwise.
    CreateNew,
    /// Unlinks any existing file (without invalidating its open handles)
    /// and links a fresh, empty one in its place.
    Create,
}

/// Result of [`MemoryFileSystem::browse`].
#[derive(Debug, Clone)]
pub struct BrowseResult {
    pub exists: bool,
    pub entries: Vec<Entry>,
}

#[derive(Clone)]
enum Node {
    File(Arc<MemoryFile>),
    Directory(Arc<Mutex<MemoryDirectory>>),
}

struct ChildEntry {
    display_name: String,
    node: Node,
}

/// A directory node: exclusively owns its children; the parent link is a
/// non-owning back-reference used only for upward traversal.
struct MemoryDirectory {
    #[allow(dead_code)]
    parent: Option<Weak<Mutex<MemoryDirectory>>>,
    children: HashMap<String, ChildEntry>,
    attributes: u32,
    last_modified: SystemTime,
    last_access: SystemTime,
}

impl MemoryDirectory {
    fn new(parent: Option<Weak<Mutex<MemoryDirectory>>>) -> Self {
        let now = SystemTime::now();
        Self { parent, children: HashMap::new(), attributes: 0, last_modified: now, last_access: now }
    }
}

/// A fully-featured in-memory filesystem backend: directory tree, block
/// quota accounting via a shared [`BlockSource`], and a glob-filtered
/// change-event hub.
pub struct MemoryFileSystem {
    root: Arc<Mutex<MemoryDirectory>>,
    block_source: Arc<dyn BlockSource>,
    case_sensitivity: CaseSensitivity,
    empty_directory_name: EmptyDirectoryName,
    events: Arc<EventHub>,
    options: CapabilityOptions,
    belate: Arc<Belate>,
}

impl MemoryFileSystem {
    pub fn new(
        block_source: Arc<dyn BlockSource>,
        case_sensitivity: CaseSensitivity,
        empty_directory_name: EmptyDirectoryName,
    ) -> Arc<Self> {
        let mut options = CapabilityOptions::all();
        options.case_sensitivity = case_sensitivity;
        options.empty_directory_name = empty_directory_name;

        Arc::new(Self {
            root: Arc::new(Mutex::new(MemoryDirectory::new(None))),
            block_source,
            case_sensitivity,
            empty_directory_name,
            events: EventHub::new(),
            options,
            belate: Belate::new(),
        })
    }

    pub fn options(&self) -> &CapabilityOptions {
        &self.options
    }

    pub fn event_hub(&self) -> Arc<EventHub> {
        self.events.clone()
    }

    fn fold(&self, name: &str) -> String {
        match self.case_sensitivity {
            CaseSensitivity::CaseInsensitive => name.to_lowercase(),
            _ => name.to_string(),
        }
    }

    /// Lock-couples down the directory tree from the root, one directory
    /// mutex at a time, so no two directory locks are ever held together
    /// except for the transient handoff between a parent and its child.
    fn navigate_dir(&self, normalized_path: &str) -> Result<Arc<Mutex<MemoryDirectory>>> {
        let mut current = self.root.clone();
        for seg in normalized_path.split('/').filter(|s| !s.is_empty()) {
            let key = self.fold(seg);
            let next = {
                let dir = current.lock().expect("memory directory lock poisoned");
                match dir.children.get(&key) {
                    Some(ChildEntry { node: Node::Directory(d), .. }) => d.clone(),
                    _ => return Err(Error::NotFound(normalized_path.into())),
                }
            };
            current = next;
        }
        Ok(current)
    }

    /// Creates `path` and any missing intermediate directories,
    /// idempotently. Emits **create** only for directories it actually
    /// creates.
    pub fn create_directory(&self, path: &str) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        if normalized.is_empty() || normalized == "/" {
            return Ok(());
        }

        let mut current = self.root.clone();
        let mut built = String::new();
        for seg in normalized.trim_end_matches('/').split('/').filter(|s| !s.is_empty()) {
            built = path::join(&built, seg);
            let key = self.fold(seg);
            let next = {
                let mut dir = current.lock().expect("memory directory lock poisoned");
                match dir.children.get(&key) {
                    Some(ChildEntry { node: Node::Directory(d), .. }) => d.clone(),
                    Some(ChildEntry { node: Node::File(_), .. }) => {
                        return Err(Error::InvalidPath(built.into()))
                    }
                    None => {
                        let new_dir = Arc::new(Mutex::new(MemoryDirectory::new(Some(Arc::downgrade(&current)))));
                        dir.children.insert(
                            key,
                            ChildEntry { display_name: seg.to_string(), node: Node::Directory(new_dir.clone()) },
                        );
                        dir.last_modified = SystemTime::now();
                        drop(dir);
                        self.events.publish(Event::new(EventKind::Create, format!("{built}/")));
                        new_dir
                    }
                }
            };
            current = next;
        }
        Ok(())
    }

    /// Creates parent directories if needed, then writes `bytes` into a
    /// new file linked into its parent. Emits **create** then **change**.
    pub fn create_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let _guard = self.belate.acquire()?;
        path::reject_leaf(path)?;
        let normalized = path::normalize(path)?;
        let parent_path = path::parent(&normalized);
        self.create_directory(&parent_path)?;
        let parent_dir = self.navigate_dir(&parent_path)?;
        let name = path::name(&normalized).to_string();
        let key = self.fold(&name);

        let file = MemoryFile::new(self.block_source.clone());
        {
            let handle = file.open(AccessMode::WRITE, AccessMode::NONE)?;
            handle.write(bytes)?;
        }

        let mut dir = parent_dir.lock().expect("memory directory lock poisoned");
        dir.children.insert(key, ChildEntry { display_name: name, node: Node::File(file) });
        dir.last_modified = SystemTime::now();
        drop(dir);

        self.events.publish(Event::new(EventKind::Create, normalized.clone()));
        self.events.publish(Event::new(EventKind::Change, normalized));
        Ok(())
    }

    /// Opens (and per `mode`, possibly creates or replaces) the file at
    /// `path`.
    pub fn open(&self, path: &str, mode: OpenMode, access: AccessMode, share: AccessMode) -> Result<StreamHandle> {
        let _guard = self.belate.acquire()?;
        path::reject_leaf(path)?;
        let normalized = path::normalize(path)?;
        let parent_path = path::parent(&normalized);
        let name = path::name(&normalized).to_string();
        let key = self.fold(&name);

        if mode != OpenMode::Open {
            self.create_directory(&parent_path)?;
        }
        let parent_dir = self.navigate_dir(&parent_path)?;
        let mut dir = parent_dir.lock().expect("memory directory lock poisoned");

        match mode {
            OpenMode::Open => match dir.children.get(&key) {
                Some(ChildEntry { node: Node::File(f), .. }) => {
                    let f = f.clone();
                    drop(dir);
                    f.open(access, share)
                }
                _ => Err(Error::NotFound(normalized.into())),
            },
            OpenMode::OpenOrCreate => {
                if let Some(ChildEntry { node: Node::File(f), .. }) = dir.children.get(&key) {
                    let f = f.clone();
                    drop(dir);
                    return f.open(access, share);
                }
                if matches!(dir.children.get(&key), Some(ChildEntry { node: Node::Directory(_), .. })) {
                    return Err(Error::InvalidPath(normalized.into()));
                }
                let file = MemoryFile::new(self.block_source.clone());
                let handle = file.open(access, share)?;
                dir.children.insert(key, ChildEntry { display_name: name, node: Node::File(file) });
                dir.last_modified = SystemTime::now();
                drop(dir);
                self.events.publish(Event::new(EventKind::Create, normalized));
                Ok(handle)
            }
            OpenMode::CreateNew => {
                if dir.children.contains_key(&key) {
                    return Err(Error::AlreadyExists(normalized.into()));
                }
                let file = MemoryFile::new(self.block_source.clone());
                let handle = file.open(access, share)?;
                dir.children.insert(key, ChildEntry { display_name: name, node: Node::File(file) });
                dir.last_modified = SystemTime::now();
                drop(dir);
                self.events.publish(Event::new(EventKind::Create, normalized));
                Ok(handle)
            }
            OpenMode::Create => {
                if matches!(dir.children.get(&key), Some(ChildEntry { node: Node::Directory(_), .. })) {
                    return Err(Error::InvalidPath(normalized.into()));
                }
                // Unlink without invalidating existing handles: any open
                // StreamHandle still holds its own Arc<MemoryFile>, so the
                // orphaned file keeps working.
                dir.children.remove(&key);
                let file = MemoryFile::new(self.block_source.clone());
                let handle = file.open(access, share)?;
                dir.children.insert(key, ChildEntry { display_name: name, node: Node::File(file) });
                dir.last_modified = SystemTime::now();
                drop(dir);
                self.events.publish(Event::new(EventKind::Create, normalized.clone()));
                self.events.publish(Event::new(EventKind::Change, normalized));
                Ok(handle)
            }
        }
    }

    /// Deletes a file, or a directory (recursively if `recurse`).
    pub fn delete(&self, path: &str, recurse: bool) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        let trimmed = normalized.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidPath(normalized.into()));
        }
        let parent_path = path::parent(trimmed);
        let name = path::name(trimmed).to_string();
        let key = self.fold(&name);
        let parent_dir = self.navigate_dir(&parent_path)?;

        let mut dir = parent_dir.lock().expect("memory directory lock poisoned");
        let node = match dir.children.get(&key) {
            Some(entry) => entry.node.clone(),
            None => return Err(Error::NotFound(normalized.into())),
        };

        match node {
            Node::File(_) => {
                dir.children.remove(&key);
                drop(dir);
                self.events.publish(Event::new(EventKind::Delete, trimmed.to_string()));
                Ok(())
            }
            Node::Directory(child_dir) => {
                let has_children = !child_dir.lock().expect("memory directory lock poisoned").children.is_empty();
                if has_children && !recurse {
                    return Err(Error::DirectoryNotEmpty(normalized.into()));
                }
                dir.children.remove(&key);
                drop(dir);
                if recurse {
                    self.delete_subtree(&child_dir, trimmed);
                }
                self.events.publish(Event::new(EventKind::Delete, format!("{trimmed}/")));
                Ok(())
            }
        }
    }

    fn delete_subtree(&self, dir: &Arc<Mutex<MemoryDirectory>>, dir_path: &str) {
        let children: Vec<(String, Node)> = {
            let d = dir.lock().expect("memory directory lock poisoned");
            d.children.values().map(|e| (e.display_name.clone(), e.node.clone())).collect()
        };
        for (name, node) in children {
            let child_path = path::join(dir_path, &name);
            match node {
                Node::Directory(child_dir) => {
                    self.delete_subtree(&child_dir, &child_path);
                    self.events.publish(Event::new(EventKind::Delete, format!("{child_path}/")));
                }
                Node::File(_) => {
                    self.events.publish(Event::new(EventKind::Delete, child_path));
                }
            }
        }
    }

    /// Same-filesystem rename. A no-op move emits no event; otherwise
    /// emits a single hierarchical **rename**.
    pub fn move_entry(&self, src: &str, dst: &str) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let src_norm = path::normalize(src)?;
        let dst_norm = path::normalize(dst)?;
        if src_norm == dst_norm {
            return Ok(());
        }

        let src_dir_form = if src_norm.ends_with('/') { src_norm.clone() } else { format!("{src_norm}/") };
        if dst_norm.starts_with(&src_dir_form) {
            return Err(Error::InvalidPath(dst_norm.into()));
        }

        let src_trimmed = src_norm.trim_end_matches('/');
        let dst_trimmed = dst_norm.trim_end_matches('/');

        let src_parent_path = path::parent(src_trimmed);
        let src_name = path::name(src_trimmed).to_string();
        let src_key = self.fold(&src_name);

        let dst_parent_path = path::parent(dst_trimmed);
        let dst_name = path::name(dst_trimmed).to_string();
        let dst_key = self.fold(&dst_name);

        let src_parent_dir = self.navigate_dir(&src_parent_path)?;
        let dst_parent_dir =
            self.navigate_dir(&dst_parent_path).map_err(|_| Error::NotFound(dst_norm.clone().into()))?;

        if Arc::ptr_eq(&src_parent_dir, &dst_parent_dir) {
            let mut dir = src_parent_dir.lock().expect("memory directory lock poisoned");
            if dir.children.contains_key(&dst_key) {
                return Err(Error::AlreadyExists(dst_norm.into()));
            }
            let entry = dir.children.remove(&src_key).ok_or_else(|| Error::NotFound(src_norm.clone().into()))?;
            dir.children.insert(dst_key, ChildEntry { display_name: dst_name, node: entry.node });
            dir.last_modified = SystemTime::now();
        } else {
            let src_addr = Arc::as_ptr(&src_parent_dir) as usize;
            let dst_addr = Arc::as_ptr(&dst_parent_dir) as usize;
            let (mut src_guard, mut dst_guard) = if src_addr < dst_addr {
                let a = src_parent_dir.lock().expect("memory directory lock poisoned");
                let b = dst_parent_dir.lock().expect("memory directory lock poisoned");
                (a, b)
            } else {
                let b = dst_parent_dir.lock().expect("memory directory lock poisoned");
                let a = src_parent_dir.lock().expect("memory directory lock poisoned");
                (a, b)
            };
            if dst_guard.children.contains_key(&dst_key) {
                return Err(Error::AlreadyExists(dst_norm.into()));
            }
            let entry = src_guard.children.remove(&src_key).ok_or_else(|| Error::NotFound(src_norm.clone().into()))?;
            dst_guard.children.insert(dst_key, ChildEntry { display_name: dst_name, node: entry.node });
            dst_guard.last_modified = SystemTime::now();
            src_guard.last_modified = SystemTime::now();
        }

        self.events.publish(Event::rename(src_norm, dst_norm));
        Ok(())
    }

    /// Records `attrs` on the node at `path`. Emits **change**.
    pub fn set_file_attribute(&self, path: &str, attrs: u32) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        let trimmed = normalized.trim_end_matches('/');
        if trimmed.is_empty() {
            let mut root = self.root.lock().expect("memory directory lock poisoned");
            root.attributes = attrs;
            root.last_modified = SystemTime::now();
        } else {
            let parent_path = path::parent(trimmed);
            let name = path::name(trimmed).to_string();
            let key = self.fold(&name);
            let parent_dir = self.navigate_dir(&parent_path)?;
            let dir = parent_dir.lock().expect("memory directory lock poisoned");
            let node = dir.children.get(&key).map(|e| e.node.clone()).ok_or_else(|| Error::NotFound(normalized.clone().into()))?;
            drop(dir);
            match node {
                Node::File(f) => f.set_attributes(attrs),
                Node::Directory(d) => {
                    let mut d = d.lock().expect("memory directory lock poisoned");
                    d.attributes = attrs;
                    d.last_modified = SystemTime::now();
                }
            }
        }
        self.events.publish(Event::new(EventKind::Change, normalized));
        Ok(())
    }

    /// Returns the children of `path`. A file path or a missing path both
    /// return `exists=false` with no entries (read-side operations never
    /// raise `notFound`, per the error-handling invariant in §7/§8).
    pub fn browse(&self, path: &str) -> Result<BrowseResult> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        let dir = match self.navigate_dir(&normalized) {
            Ok(d) => d,
            Err(_) => return Ok(BrowseResult { exists: false, entries: Vec::new() }),
        };
        let mut d = dir.lock().expect("memory directory lock poisoned");
        d.last_access = SystemTime::now();
        let entries = d
            .children
            .values()
            .map(|entry| self.build_entry(&path::join(&normalized, &entry.display_name), &entry.node))
            .collect();
        Ok(BrowseResult { exists: true, entries })
    }

    /// Returns a snapshot of the node at `path`, or `None` if it does not
    /// exist. Never fails (dot-segment escapes above root simply clamp).
    pub fn get_entry(&self, path: &str) -> Option<Entry> {
        let _guard = self.belate.acquire().ok()?;
        let normalized = path::normalize_lenient(path);
        let trimmed = normalized.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(self.root_entry());
        }
        let parent_path = path::parent(trimmed);
        let name = path::name(trimmed).to_string();
        let key = self.fold(&name);
        let parent_dir = self.navigate_dir(&parent_path).ok()?;
        let dir = parent_dir.lock().expect("memory directory lock poisoned");
        let entry = dir.children.get(&key)?;
        Some(self.build_entry(trimmed, &entry.node))
    }

    fn root_entry(&self) -> Entry {
        let root = self.root.lock().expect("memory directory lock poisoned");
        Entry {
            path: String::new(),
            name: String::new(),
            kind: EntryKind::Directory,
            last_modified: root.last_modified,
            last_access: root.last_access,
            length: None,
            file_attributes: Some(root.attributes),
            physical_path: None,
            is_mount_point: false,
            capability_options: self.options.clone(),
        }
    }

    fn build_entry(&self, entry_path: &str, node: &Node) -> Entry {
        let name = path::name(entry_path.trim_end_matches('/')).to_string();
        match node {
            Node::File(f) => Entry {
                path: entry_path.trim_end_matches('/').to_string(),
                name,
                kind: EntryKind::File,
                last_modified: f.last_modified(),
                last_access: f.last_access(),
                length: Some(f.length()),
                file_attributes: Some(f.attributes()),
                physical_path: None,
                is_mount_point: false,
                capability_options: self.options.clone(),
            },
            Node::Directory(d) => {
                let d = d.lock().expect("memory directory lock poisoned");
                Entry {
                    path: format!("{}/", entry_path.trim_end_matches('/')),
                    name,
                    kind: EntryKind::Directory,
                    last_modified: d.last_modified,
                    last_access: d.last_access,
                    length: None,
                    file_attributes: Some(d.attributes),
                    physical_path: None,
                    is_mount_point: false,
                    capability_options: self.options.clone(),
                }
            }
        }
    }
}

impl Drop for MemoryFileSystem {
    fn drop(&mut self) {
        let events = self.events.clone();
        self.belate.on_disposed(move || events.dispose());
        self.belate.dispose();
    }
}

#[async_trait]
impl FileSystemBackend for MemoryFileSystem {
    fn capability_options(&self) -> CapabilityOptions {
        self.options.clone()
    }

    fn event_source(&self) -> Arc<dyn EventSource> {
        self.events.clone()
    }

    async fn browse(&self, path: &str) -> Result<BrowseResult> {
        MemoryFileSystem::browse(self, path)
    }

    async fn get_entry(&self, path: &str) -> Option<Entry> {
        MemoryFileSystem::get_entry(self, path)
    }

    async fn open(&self, path: &str, mode: OpenMode, access: AccessMode, share: AccessMode) -> Result<StreamHandle> {
        MemoryFileSystem::open(self, path, mode, access, share)
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        MemoryFileSystem::create_directory(self, path)
    }

    async fn create_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        MemoryFileSystem::create_file(self, path, bytes)
    }

    async fn delete(&self, path: &str, recurse: bool) -> Result<()> {
        MemoryFileSystem::delete(self, path, recurse)
    }

    async fn move_entry(&self, src: &str, dst: &str) -> Result<()> {
        MemoryFileSystem::move_entry(self, src, dst)
    }

    async fn set_file_attribute(&self, path: &str, attrs: u32) -> Result<()> {
        MemoryFileSystem::set_file_attribute(self, path, attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_pool::BlockPool;

    fn fs() -> Arc<MemoryFileSystem> {
        let pool = BlockPool::new(64, 1024, 64);
        MemoryFileSystem::new(pool, CaseSensitivity::CaseSensitive, EmptyDirectoryName::Forbidden)
    }

    #[test]
    fn create_directory_is_idempotent_and_creates_intermediates() {
        let fs = fs();
        fs.create_directory("a/b/c").unwrap();
        fs.create_directory("a/b/c").unwrap();
        assert!(fs.get_entry("a/").unwrap().is_directory());
        assert!(fs.get_entry("a/b/").unwrap().is_directory());
        assert!(fs.get_entry("a/b/c/").unwrap().is_directory());
    }

    #[test]
    fn create_directory_then_recursive_delete_keeps_invariant() {
        let fs = fs();
        fs.create_directory("x/y").unwrap();
        fs.delete("x", true).unwrap();
        assert!(fs.get_entry("x/").is_none());
    }

    #[test]
    fn round_trip_write_and_read_via_create_file() {
        let fs = fs();
        let data = b"round trip payload".to_vec();
        fs.create_file("f.txt", &data).unwrap();
        let handle = fs.open("f.txt", OpenMode::Open, AccessMode::READ, AccessMode::READ_WRITE).unwrap();
        let mut buf = vec![0u8; data.len()];
        handle.read(&mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn get_entry_matches_browse_of_parent() {
        let fs = fs();
        fs.create_file("dir/f.txt", b"x").unwrap();
        assert!(fs.get_entry("dir/f.txt").is_some());
        let browsed = fs.browse("dir/").unwrap();
        assert!(browsed.entries.iter().any(|e| e.path == "dir/f.txt"));
    }

    #[test]
    fn browse_never_raises_not_found() {
        let fs = fs();
        let result = fs.browse("missing/").unwrap();
        assert!(!result.exists);
        assert!(result.entries.is_empty());
    }

    #[test]
    fn create_replace_preserves_open_readers() {
        let fs = fs();
        fs.create_file("f", &[b'A'; 1024]).unwrap();
        let reader = fs.open("f", OpenMode::Open, AccessMode::READ, AccessMode::READ_WRITE).unwrap();

        let _writer =
            fs.open("f", OpenMode::Create, AccessMode::READ_WRITE, AccessMode::READ_WRITE).unwrap();

        let mut buf = [0u8; 1024];
        reader.read(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == b'A'));

        let fresh = fs.get_entry("f").unwrap();
        assert_eq!(fresh.length, Some(0));
    }

    #[test]
    fn move_rejects_existing_destination_and_missing_source() {
        let fs = fs();
        fs.create_file("a", b"1").unwrap();
        fs.create_file("b", b"2").unwrap();
        assert!(matches!(fs.move_entry("a", "b"), Err(Error::AlreadyExists(_))));
        assert!(matches!(fs.move_entry("missing", "c"), Err(Error::NotFound(_))));
    }

    #[test]
    fn move_rejects_subtree_into_itself() {
        let fs = fs();
        fs.create_directory("a").unwrap();
        assert!(matches!(fs.move_entry("a", "a/b"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn no_op_move_emits_no_event() {
        let fs = fs();
        fs.create_file("f", b"1").unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let events2 = events.clone();
        fs.event_hub().subscribe(
            "**",
            Box::new(move |e| events2.lock().unwrap().push(e)),
        );
        fs.move_entry("f", "f").unwrap();
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn case_insensitive_filesystem_treats_names_as_equal() {
        let pool = BlockPool::new(64, 64, 64);
        let fs = MemoryFileSystem::new(pool, CaseSensitivity::CaseInsensitive, EmptyDirectoryName::Forbidden);
        fs.create_file("A", b"x").unwrap();
        assert!(fs.get_entry("a").is_some());
    }
}
