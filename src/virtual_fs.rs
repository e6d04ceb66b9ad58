//! Mount table over a path namespace: a [`VirtualFileSystem`] dispatches
//! every operation to the longest-matching mount's [`FileSystemDecoration`],
//! synthesizing read-only intermediate directories between mount nodes
//! (spec §4.6).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::decoration::{cross_backend_move, Component, FileSystemBackend, FileSystemDecoration};
use crate::dispose::Belate;
use crate::entry::{CapabilityOptions, Entry, EntryKind};
use crate::error::{Error, Result};
use crate::memory_fs::{AccessMode, BrowseResult, OpenMode, StreamHandle};
use crate::observer::{Dispatcher, Event, EventHub, EventKind, EventSource, Observer, ObserverHandle};
use crate::observer::decorator::subscribe_single;
use crate::path;
use crate::path_converter::PathConverter;

/// One backend participating in a `mount` call, with the capability grant
/// and optional internal offset this assignment applies to it.
#[derive(Clone)]
pub struct MountAssignment {
    pub backend: Arc<dyn FileSystemBackend>,
    pub options: CapabilityOptions,
    /// Offset into the backend's own namespace exposed at the mount root;
    /// empty for "the whole backend".
    pub sub_path: String,
}

impl MountAssignment {
    pub fn new(backend: Arc<dyn FileSystemBackend>, options: CapabilityOptions) -> Self {
        Self { backend, options, sub_path: String::new() }
    }

    pub fn with_sub_path(backend: Arc<dyn FileSystemBackend>, options: CapabilityOptions, sub_path: impl Into<String>) -> Self {
        Self { backend, options, sub_path: sub_path.into() }
    }
}

struct MountForward {
    source: Arc<dyn EventSource>,
    subscription_id: u64,
    disposed_hook_id: u64,
}

fn unsubscribe_forward(forward: &MountForward) {
    forward.source.unsubscribe(forward.subscription_id);
    forward.source.cancel_on_source_disposed(forward.disposed_hook_id);
}

/// Prefixes a decoration-local event path with its mount's absolute path,
/// separator-aware (unlike [`PathConverter`], which is a literal splice and
/// assumes its stems already carry the right separators).
fn globalize_event(mount_path: &str, event: &Event) -> Event {
    Event {
        kind: event.kind,
        path: path::join(mount_path, &event.path),
        new_path: event.new_path.as_ref().map(|p| path::join(mount_path, p)),
        time: event.time,
    }
}

fn forward_mount(mount_path: String, decoration: &Arc<FileSystemDecoration>, events: &Arc<EventHub>) -> MountForward {
    let source = decoration.event_source();
    let events_for_events = events.clone();
    let subscription_id = source.subscribe(
        "**",
        Box::new(move |event| {
            if event.kind == EventKind::Start {
                return;
            }
            events_for_events.publish(globalize_event(&mount_path, &event));
        }),
    );

    let events_for_disposal = events.clone();
    let disposed_hook_id = source.on_source_disposed(Box::new(move || {
        events_for_disposal.dispose();
    }));

    MountForward { source, subscription_id, disposed_hook_id }
}

struct MountNode {
    mount_path: String,
    decoration: Arc<FileSystemDecoration>,
    forward: MountForward,
}

/// Absolute directory path of a mount's own root: `""` for the VFS root
/// itself, `"<mount_path>/"` otherwise.
fn mount_root_path(mount_path: &str) -> String {
    if mount_path.is_empty() {
        String::new()
    } else {
        format!("{mount_path}/")
    }
}

fn synthesized_entry(entry_path: &str, name: &str, is_mount_point: bool) -> Entry {
    let now = SystemTime::now();
    Entry {
        path: entry_path.to_string(),
        name: name.to_string(),
        kind: EntryKind::Directory,
        last_modified: now,
        last_access: now,
        length: None,
        file_attributes: None,
        physical_path: None,
        is_mount_point,
        capability_options: CapabilityOptions::read_only(),
    }
}

/// Publishes the create/delete diff between two entry-path snapshots: every
/// path in `after` not in `before` gets a `create`, every path in `before`
/// not in `after` gets a `delete`. Covers a fresh mount (`before` empty), an
/// unmount (`after` empty), and a replacing re-mount (both populated) with
/// one routine.
fn diff_and_emit(events: &Arc<EventHub>, before: &[String], after: &[String]) {
    let before_set: HashSet<&String> = before.iter().collect();
    let after_set: HashSet<&String> = after.iter().collect();
    for p in after {
        if !before_set.contains(p) {
            events.publish(Event::new(EventKind::Create, p.clone()));
        }
    }
    for p in before {
        if !after_set.contains(p) {
            events.publish(Event::new(EventKind::Delete, p.clone()));
        }
    }
}

/// A mount table addressed by path, dispatching each operation to the
/// longest-matching mount's composite backend (spec §4.6).
pub struct VirtualFileSystem {
    mounts: RwLock<HashMap<String, Arc<MountNode>>>,
    events: Arc<EventHub>,
    belate: Arc<Belate>,
}

impl VirtualFileSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { mounts: RwLock::new(HashMap::new()), events: EventHub::new(), belate: Belate::new() })
    }

    fn normalize_mount_path(path: &str) -> Result<String> {
        let normalized = path::normalize(path)?;
        Ok(normalized.trim_end_matches('/').to_string())
    }

    /// Finds the longest mounted prefix of `path`, returning the node and
    /// the remainder relative to it. Walks ancestors from the full path
    /// down to the root, which is the "trie" realized as a lookup over
    /// already-mounted path keys rather than a per-segment node structure.
    fn find_mount(&self, path: &str) -> Option<(Arc<MountNode>, String)> {
        let mounts = self.mounts.read().expect("vfs mount table lock poisoned");
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        for i in (0..=segments.len()).rev() {
            let candidate = segments[..i].join("/");
            if let Some(node) = mounts.get(&candidate) {
                let remainder = if candidate.is_empty() {
                    path.to_string()
                } else {
                    path[candidate.len()..].trim_start_matches('/').to_string()
                };
                return Some((node.clone(), remainder));
            }
        }
        None
    }

    fn is_mount_path(&self, path: &str) -> bool {
        let trimmed = path.trim_end_matches('/');
        self.mounts.read().expect("vfs mount table lock poisoned").contains_key(trimmed)
    }

    fn has_descendant_mount(&self, prefix: &str) -> bool {
        let mounts = self.mounts.read().expect("vfs mount table lock poisoned");
        if prefix.is_empty() {
            return !mounts.is_empty();
        }
        mounts.keys().any(|m| m.starts_with(prefix) && m.as_bytes().get(prefix.len()) == Some(&b'/'))
    }

    /// The immediate child segments visible under `prefix` purely because
    /// some mount exists at or below them — the synthesized intermediate
    /// directory content the VFS exposes between two mount nodes.
    fn direct_children(&self, prefix: &str) -> Vec<Entry> {
        let mounts = self.mounts.read().expect("vfs mount table lock poisoned");
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for key in mounts.keys() {
            let rest = if prefix.is_empty() {
                Some(key.as_str())
            } else {
                key.strip_prefix(prefix).and_then(|r| r.strip_prefix('/'))
            };
            let Some(rest) = rest else { continue };
            if rest.is_empty() {
                continue;
            }
            let seg = rest.split('/').next().unwrap();
            if !seen.insert(seg.to_string()) {
                continue;
            }
            let child_path = path::join(prefix, seg);
            let is_mount_point = mounts.contains_key(&child_path);
            out.push(synthesized_entry(&format!("{child_path}/"), seg, is_mount_point));
        }
        out
    }

    /// Walks a mount's decoration from its local root, returning the
    /// absolute (VFS-namespace) path of every entry it currently exposes.
    async fn collect_abs_entries(&self, node: &MountNode) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut stack = vec![String::new()];
        while let Some(local) = stack.pop() {
            let result = node.decoration.browse(&local).await?;
            for entry in result.entries {
                let is_dir = entry.is_directory();
                let global = path::join(&node.mount_path, &entry.path);
                if is_dir {
                    stack.push(entry.path.clone());
                }
                out.push(global);
            }
        }
        Ok(out)
    }

    /// Installs or replaces the mount at `path`. On replacement, the
    /// previous and new component sets are each walked to a full entry-path
    /// snapshot, and the VFS publishes exactly the create/delete diff
    /// between them (spec §4.6's "diffed" re-mount semantics); a fresh
    /// mount is the degenerate case with an empty "before" snapshot.
    pub async fn mount(&self, path: &str, assignments: Vec<MountAssignment>) -> Result<()> {
        let _guard = self.belate.acquire()?;
        if assignments.is_empty() {
            return Err(Error::InvalidPath(path.into()));
        }
        let mount_path = Self::normalize_mount_path(path)?;

        let components: Vec<Component> = assignments
            .into_iter()
            .map(|a| {
                let mut options = a.options;
                if a.sub_path.is_empty() {
                    options.sub_path = None;
                    Component::with_options(a.backend, options, PathConverter::identity())
                } else {
                    // The child stem carries its own trailing separator so
                    // `PathConverter`'s splice-based translation (it does not
                    // insert one) composes correctly with the backend's
                    // leading-slash-free path convention.
                    let child_stem = format!("{}/", a.sub_path.trim_end_matches('/'));
                    options.sub_path = Some(child_stem.clone());
                    Component::with_options(a.backend, options, PathConverter::new("", child_stem))
                }
            })
            .collect();
        let decoration = FileSystemDecoration::new(components);

        let old_node = self.mounts.write().expect("vfs mount table lock poisoned").remove(&mount_path);

        let mut before = Vec::new();
        if let Some(old) = &old_node {
            before = self.collect_abs_entries(old).await?;
            before.push(mount_root_path(&mount_path));
        }

        let forward = forward_mount(mount_path.clone(), &decoration, &self.events);
        let new_node = Arc::new(MountNode { mount_path: mount_path.clone(), decoration, forward });

        let mut after = self.collect_abs_entries(&new_node).await?;
        after.push(mount_root_path(&mount_path));

        self.mounts.write().expect("vfs mount table lock poisoned").insert(mount_path.clone(), new_node);

        diff_and_emit(&self.events, &before, &after);
        if let Some(old) = old_node {
            unsubscribe_forward(&old.forward);
        }

        tracing::debug!(backend = "virtual_fs", path = %mount_path, "mount installed");
        Ok(())
    }

    /// Removes the mount at `path`, publishing a `delete` for every entry it
    /// previously exposed (including its own root).
    pub async fn unmount(&self, path: &str) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let mount_path = Self::normalize_mount_path(path)?;
        let node = self
            .mounts
            .write()
            .expect("vfs mount table lock poisoned")
            .remove(&mount_path)
            .ok_or_else(|| Error::NotFound(path.into()))?;

        let mut before = self.collect_abs_entries(&node).await?;
        before.push(mount_root_path(&mount_path));
        diff_and_emit(&self.events, &before, &[]);
        unsubscribe_forward(&node.forward);

        tracing::debug!(backend = "virtual_fs", path = %mount_path, "mount removed");
        Ok(())
    }

    /// Unique mount paths currently installed, as directory paths.
    pub fn list_mount_points(&self) -> Vec<String> {
        self.mounts.read().expect("vfs mount table lock poisoned").keys().map(|k| mount_root_path(k)).collect()
    }

    pub async fn browse(&self, path: &str) -> Result<BrowseResult> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize_lenient(path);
        let trimmed = normalized.trim_end_matches('/').to_string();

        if let Some((node, remainder)) = self.find_mount(&trimmed) {
            let mut result = node.decoration.browse(&remainder).await?;
            for entry in &mut result.entries {
                let global = path::join(&node.mount_path, &entry.path);
                entry.is_mount_point = self.is_mount_path(&global);
                entry.path = global;
            }
            return Ok(result);
        }

        if trimmed.is_empty() {
            return Ok(BrowseResult { exists: true, entries: self.direct_children("") });
        }
        if self.has_descendant_mount(&trimmed) {
            return Ok(BrowseResult { exists: true, entries: self.direct_children(&trimmed) });
        }
        Ok(BrowseResult { exists: false, entries: Vec::new() })
    }

    pub async fn get_entry(&self, path: &str) -> Option<Entry> {
        let _guard = self.belate.acquire().ok()?;
        let normalized = path::normalize_lenient(path);
        let trimmed = normalized.trim_end_matches('/').to_string();

        if let Some((node, remainder)) = self.find_mount(&trimmed) {
            let mut entry = node.decoration.get_entry(&remainder).await?;
            let at_mount_root = remainder.trim_end_matches('/').is_empty();
            entry.path = path::join(&node.mount_path, &entry.path);
            entry.is_mount_point = at_mount_root;
            if at_mount_root && !node.mount_path.is_empty() {
                entry.name = path::name(&node.mount_path).to_string();
            }
            return Some(entry);
        }

        if trimmed.is_empty() {
            return Some(synthesized_entry("", "", self.is_mount_path("")));
        }
        if self.has_descendant_mount(&trimmed) {
            let name = path::name(&trimmed).to_string();
            return Some(synthesized_entry(&format!("{trimmed}/"), &name, false));
        }
        None
    }

    pub async fn open(&self, path: &str, mode: OpenMode, access: AccessMode, share: AccessMode) -> Result<StreamHandle> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        path::reject_leaf(&normalized)?;
        let (node, remainder) = self.find_mount(&normalized).ok_or_else(|| Error::NotSupported(path.into()))?;
        node.decoration.open(&remainder, mode, access, share).await
    }

    pub async fn create_directory(&self, path: &str) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        let (node, remainder) = self.find_mount(&normalized).ok_or_else(|| Error::NotSupported(path.into()))?;
        node.decoration.create_directory(&remainder).await
    }

    pub async fn create_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        path::reject_leaf(&normalized)?;
        let (node, remainder) = self.find_mount(&normalized).ok_or_else(|| Error::NotSupported(path.into()))?;
        node.decoration.create_file(&remainder, bytes).await
    }

    pub async fn delete(&self, path: &str, recurse: bool) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        let (node, remainder) = self.find_mount(&normalized).ok_or_else(|| Error::NotFound(path.into()))?;
        node.decoration.delete(&remainder, recurse).await
    }

    pub async fn set_file_attribute(&self, path: &str, attrs: u32) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let normalized = path::normalize(path)?;
        let (node, remainder) = self.find_mount(&normalized).ok_or_else(|| Error::NotFound(path.into()))?;
        node.decoration.set_file_attribute(&remainder, attrs).await
    }

    /// Moves an entry, reusing the source mount's native move when both
    /// endpoints share one mount and [`cross_backend_move`] (the same
    /// transfer-with-rollback helper `FileSystemDecoration` uses for its
    /// own cross-component moves) when they land on different mounts.
    pub async fn move_entry(&self, src: &str, dst: &str) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let src_norm = path::normalize(src)?;
        let dst_norm = path::normalize(dst)?;
        let (src_node, src_rem) = self.find_mount(&src_norm).ok_or_else(|| Error::NotFound(src.into()))?;
        let (dst_node, dst_rem) = self.find_mount(&dst_norm).ok_or_else(|| Error::NotFound(dst.into()))?;

        if Arc::ptr_eq(&src_node, &dst_node) {
            src_node.decoration.move_entry(&src_rem, &dst_rem).await
        } else {
            cross_backend_move(src_node.decoration.as_ref(), &src_rem, dst_node.decoration.as_ref(), &dst_rem).await
        }
    }

    pub fn observe(&self, filter: &str, observer: Box<dyn Observer>, dispatcher: Arc<dyn Dispatcher>) -> ObserverHandle {
        subscribe_single(self.events.clone(), filter, observer, dispatcher)
            .expect("subscribing to an in-process EventHub never fails")
    }
}

impl Drop for VirtualFileSystem {
    fn drop(&mut self) {
        let mounts = std::mem::take(&mut *self.mounts.write().expect("vfs mount table lock poisoned"));
        let events = self.events.clone();
        self.belate.on_disposed(move || {
            for (_, node) in mounts {
                unsubscribe_forward(&node.forward);
            }
            events.dispose();
        });
        self.belate.dispose();
    }
}

#[async_trait]
impl FileSystemBackend for VirtualFileSystem {
    fn capability_options(&self) -> CapabilityOptions {
        let mounts = self.mounts.read().expect("vfs mount table lock poisoned");
        let union = mounts
            .values()
            .map(|n| n.decoration.capability_options())
            .fold(CapabilityOptions::none(), |acc, o| acc.union(&o));
        CapabilityOptions { can_mount: true, can_unmount: true, can_list_mount_points: true, ..union }
    }

    fn event_source(&self) -> Arc<dyn EventSource> {
        self.events.clone()
    }

    async fn browse(&self, path: &str) -> Result<BrowseResult> {
        VirtualFileSystem::browse(self, path).await
    }

    async fn get_entry(&self, path: &str) -> Option<Entry> {
        VirtualFileSystem::get_entry(self, path).await
    }

    async fn open(&self, path: &str, mode: OpenMode, access: AccessMode, share: AccessMode) -> Result<StreamHandle> {
        VirtualFileSystem::open(self, path, mode, access, share).await
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        VirtualFileSystem::create_directory(self, path).await
    }

    async fn create_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        VirtualFileSystem::create_file(self, path, bytes).await
    }

    async fn delete(&self, path: &str, recurse: bool) -> Result<()> {
        VirtualFileSystem::delete(self, path, recurse).await
    }

    async fn move_entry(&self, src: &str, dst: &str) -> Result<()> {
        VirtualFileSystem::move_entry(self, src, dst).await
    }

    async fn set_file_attribute(&self, path: &str, attrs: u32) -> Result<()> {
        VirtualFileSystem::set_file_attribute(self, path, attrs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_pool::BlockPool;
    use crate::entry::{CaseSensitivity, EmptyDirectoryName};
    use crate::memory_fs::MemoryFileSystem;
    use crate::observer::CallerThreadDispatcher;
    use std::sync::Mutex;

    fn leaf() -> Arc<MemoryFileSystem> {
        let pool = BlockPool::new(64, 1024, 64);
        MemoryFileSystem::new(pool, CaseSensitivity::CaseSensitive, EmptyDirectoryName::Forbidden)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn mount_then_browse_routes_to_the_backend() {
        let vfs = VirtualFileSystem::new();
        let a = leaf();
        a.create_file("x.txt", b"hi").unwrap();

        vfs.mount("/a", vec![MountAssignment::new(a.clone(), CapabilityOptions::all())]).await.unwrap();

        let result = vfs.browse("/a").await.unwrap();
        assert!(result.exists);
        assert!(result.entries.iter().any(|e| e.name == "x.txt"));

        let entry = vfs.get_entry("/a/x.txt").await.unwrap();
        assert_eq!(entry.path, "a/x.txt");
        assert!(!entry.is_mount_point);

        let mount_entry = vfs.get_entry("/a").await.unwrap();
        assert!(mount_entry.is_mount_point);
        assert_eq!(mount_entry.name, "a");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn synthesizes_read_only_intermediate_directories_between_mounts() {
        let vfs = VirtualFileSystem::new();
        let a = leaf();
        vfs.mount("/a/b/c", vec![MountAssignment::new(a.clone(), CapabilityOptions::all())]).await.unwrap();

        let root = vfs.browse("").await.unwrap();
        assert!(root.exists);
        assert_eq!(root.entries.len(), 1);
        assert_eq!(root.entries[0].name, "a");
        assert!(!root.entries[0].is_mount_point);

        let intermediate = vfs.get_entry("/a/b").await.unwrap();
        assert!(intermediate.is_directory());
        assert!(!intermediate.is_mount_point);
        assert!(intermediate.capability_options.can_browse);
        assert!(!intermediate.capability_options.can_create_file);

        let err = vfs.create_file("/a/b/nope.txt", b"x").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cross_mount_move_transfers_content_and_removes_source() {
        let vfs = VirtualFileSystem::new();
        let a = leaf();
        let b = leaf();
        vfs.mount("/a", vec![MountAssignment::new(a.clone(), CapabilityOptions::all())]).await.unwrap();
        vfs.mount("/b", vec![MountAssignment::new(b.clone(), CapabilityOptions::all())]).await.unwrap();

        vfs.create_file("/a/x.txt", b"payload").await.unwrap();
        vfs.move_entry("/a/x.txt", "/b/y.txt").await.unwrap();

        assert!(vfs.get_entry("/a/x.txt").await.is_none());
        let entry = vfs.get_entry("/b/y.txt").await.unwrap();
        assert_eq!(entry.length, Some(7));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn observer_sees_mount_and_unmount_diff_events() {
        let vfs = VirtualFileSystem::new();
        let a = leaf();
        a.create_file("helloworld.txt", b"x").unwrap();
        a.create_file("other.txt", b"y").unwrap();

        let created = Arc::new(Mutex::new(Vec::new()));
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let created_for_observer = created.clone();
        let deleted_for_observer = deleted.clone();
        let handle = vfs.observe(
            "tmp/hello*.txt",
            Box::new(move |event: Event| match event.kind {
                EventKind::Create => created_for_observer.lock().unwrap().push(event.path),
                EventKind::Delete => deleted_for_observer.lock().unwrap().push(event.path),
                _ => {}
            }),
            Arc::new(CallerThreadDispatcher),
        );

        vfs.mount("/tmp", vec![MountAssignment::new(a.clone(), CapabilityOptions::all())]).await.unwrap();
        assert_eq!(created.lock().unwrap().as_slice(), ["tmp/helloworld.txt".to_string()]);

        vfs.unmount("/tmp").await.unwrap();
        assert_eq!(deleted.lock().unwrap().as_slice(), ["tmp/helloworld.txt".to_string()]);

        drop(handle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn live_events_after_mount_are_forwarded_with_global_paths() {
        let vfs = VirtualFileSystem::new();
        let a = leaf();
        vfs.mount("/a", vec![MountAssignment::new(a.clone(), CapabilityOptions::all())]).await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_observer = seen.clone();
        let handle = vfs.observe(
            "**",
            Box::new(move |event: Event| seen_for_observer.lock().unwrap().push(event.path)),
            Arc::new(CallerThreadDispatcher),
        );

        a.create_file("fresh.txt", b"z").unwrap();
        assert!(seen.lock().unwrap().iter().any(|p| p == "a/fresh.txt"));
        drop(handle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn remount_emits_diff_between_old_and_new_visible_entries() {
        let vfs = VirtualFileSystem::new();
        let a = leaf();
        a.create_file("keep.txt", b"1").unwrap();
        vfs.mount("/a", vec![MountAssignment::new(a.clone(), CapabilityOptions::all())]).await.unwrap();

        let b = leaf();
        b.create_file("keep.txt", b"2").unwrap();
        b.create_file("new.txt", b"3").unwrap();

        let created = Arc::new(Mutex::new(Vec::new()));
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let created_for_observer = created.clone();
        let deleted_for_observer = deleted.clone();
        let handle = vfs.observe(
            "**",
            Box::new(move |event: Event| match event.kind {
                EventKind::Create => created_for_observer.lock().unwrap().push(event.path),
                EventKind::Delete => deleted_for_observer.lock().unwrap().push(event.path),
                _ => {}
            }),
            Arc::new(CallerThreadDispatcher),
        );

        vfs.mount("/a", vec![MountAssignment::new(b.clone(), CapabilityOptions::all())]).await.unwrap();

        assert!(created.lock().unwrap().iter().any(|p| p == "a/new.txt"));
        assert!(!deleted.lock().unwrap().iter().any(|p| p == "a/keep.txt"));
        assert!(!created.lock().unwrap().iter().any(|p| p == "a/keep.txt"));

        drop(handle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unmounting_an_unmounted_path_fails_with_not_found() {
        let vfs = VirtualFileSystem::new();
        assert!(matches!(vfs.unmount("/nope").await, Err(Error::NotFound(_))));
    }
}
