//! N-way backend composition: a [`FileSystemDecoration`] dispatches every
//! operation across its components, merging read results and routing
//! writes to the first component that accepts them (spec §4.5).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::dispose::Belate;
use crate::entry::{CapabilityOptions, Entry};
use crate::error::{Error, Result};
use crate::memory_fs::{AccessMode, BrowseResult, OpenMode, StreamHandle};
use crate::observer::decorator::{subscribe_single, translate};
use crate::observer::{Dispatcher, EventHub, EventSource, Observer, ObserverHandle};
use crate::path_converter::PathConverter;

/// The contract every composable backend (a leaf like `MemoryFileSystem`,
/// or another `FileSystemDecoration`) implements.
#[async_trait]
pub trait FileSystemBackend: Send + Sync {
    fn capability_options(&self) -> CapabilityOptions;

    /// The raw change-event source this backend publishes through, so a
    /// decorator can forward its events into a composite namespace.
    fn event_source(&self) -> Arc<dyn EventSource>;

    async fn browse(&self, path: &str) -> Result<BrowseResult>;
    async fn get_entry(&self, path: &str) -> Option<Entry>;
    async fn open(&self, path: &str, mode: OpenMode, access: AccessMode, share: AccessMode) -> Result<StreamHandle>;
    async fn create_directory(&self, path: &str) -> Result<()>;
    async fn create_file(&self, path: &str, bytes: &[u8]) -> Result<()>;
    async fn delete(&self, path: &str, recurse: bool) -> Result<()>;
    async fn move_entry(&self, src: &str, dst: &str) -> Result<()>;
    async fn set_file_attribute(&self, path: &str, attrs: u32) -> Result<()>;
}

/// One backend participating in a composition, with the capability grant
/// and path offset this mount applies to it.
#[derive(Clone)]
pub struct Component {
    pub backend: Arc<dyn FileSystemBackend>,
    pub options: CapabilityOptions,
    pub converter: PathConverter,
}

impl Component {
    pub fn new(backend: Arc<dyn FileSystemBackend>, converter: PathConverter) -> Self {
        let options = backend.capability_options();
        Self { backend, options, converter }
    }

    pub fn with_options(backend: Arc<dyn FileSystemBackend>, options: CapabilityOptions, converter: PathConverter) -> Self {
        Self { backend, options, converter }
    }

    fn to_child(&self, path: &str) -> Option<String> {
        self.converter.parent_to_child(path).map(|c| c.into_owned())
    }

    fn entry_to_parent(&self, mut entry: Entry) -> Option<Entry> {
        entry.path = self.converter.child_to_parent(&entry.path)?.into_owned();
        entry.capability_options = entry.capability_options.intersect(&self.options);
        Some(entry)
    }
}

/// One component's forwarding subscription into the decoration's own
/// [`EventHub`], torn down when the decoration is dropped.
struct ComponentForward {
    source: Arc<dyn EventSource>,
    subscription_id: u64,
    disposed_hook_id: u64,
}

/// An N-way composite backend: browse/getEntry merge results across every
/// applicable component, writes route to the first component that accepts
/// them.
///
/// Owns its own [`EventHub`], into which every component's translated
/// events are forwarded at construction time — this is what lets a
/// `FileSystemDecoration` nest inside another one (e.g. under
/// [`crate::virtual_fs::VirtualFileSystem`]'s mount table) exactly like a
/// leaf backend.
pub struct FileSystemDecoration {
    components: Vec<Component>,
    events: Arc<EventHub>,
    forwards: Mutex<Vec<ComponentForward>>,
    belate: Arc<Belate>,
}

impl FileSystemDecoration {
    pub fn new(components: Vec<Component>) -> Arc<Self> {
        let events = EventHub::new();
        let mut forwards = Vec::with_capacity(components.len());
        for component in &components {
            if !component.options.can_observe {
                continue;
            }
            forwards.push(forward_component(component, &events));
        }
        Arc::new(Self { components, events, forwards: Mutex::new(forwards), belate: Belate::new() })
    }

    /// Returns a new decoration snapshot with `component` appended.
    /// Decorations are immutable once built; mounting a further backend at
    /// an already-mounted path rebuilds the snapshot rather than mutating
    /// it in place, so in-flight operations keep seeing a consistent view.
    pub fn with_component(&self, component: Component) -> Arc<Self> {
        let mut components = self.components.clone();
        components.push(component);
        Self::new(components)
    }

    /// Returns a new snapshot with every component backed by `backend`
    /// removed, or `None` if that would leave it empty (the caller should
    /// drop the mount entirely in that case).
    pub fn without_backend(&self, backend: &Arc<dyn FileSystemBackend>) -> Option<Arc<Self>> {
        let remaining: Vec<Component> =
            self.components.iter().filter(|c| !Arc::ptr_eq(&c.backend, backend)).cloned().collect();
        if remaining.is_empty() {
            None
        } else {
            Some(Self::new(remaining))
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    fn applicable(&self, path: &str) -> impl Iterator<Item = (&Component, String)> {
        self.components.iter().filter_map(move |c| c.to_child(path).map(|child| (c, child)))
    }

    /// Subscribes `observer` to this composite's own event hub, which
    /// already carries every component's events translated into this
    /// decoration's namespace.
    pub fn observe(
        &self,
        filter: &str,
        observer: Box<dyn Observer>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> ObserverHandle {
        subscribe_single(self.events.clone(), filter, observer, dispatcher)
            .expect("subscribing to an in-process EventHub never fails")
    }
}

fn forward_component(component: &Component, events: &Arc<EventHub>) -> ComponentForward {
    let source = component.backend.event_source();
    let converter = component.converter.clone();
    let events_for_events = events.clone();
    let subscription_id = source.subscribe(
        "**",
        Box::new(move |event| {
            if event.kind == crate::observer::EventKind::Start {
                return;
            }
            if let Some(translated) = translate(&converter, &event) {
                events_for_events.publish(translated);
            }
        }),
    );

    let events_for_disposal = events.clone();
    let disposed_hook_id = source.on_source_disposed(Box::new(move || {
        events_for_disposal.dispose();
    }));

    ComponentForward { source, subscription_id, disposed_hook_id }
}

impl Drop for FileSystemDecoration {
    fn drop(&mut self) {
        let forwards = std::mem::take(&mut *self.forwards.lock().expect("decoration forwards lock poisoned"));
        self.belate.on_disposed(move || {
            for forward in forwards {
                forward.source.unsubscribe(forward.subscription_id);
                forward.source.cancel_on_source_disposed(forward.disposed_hook_id);
            }
        });
        self.belate.dispose();
    }
}

#[async_trait]
impl FileSystemBackend for FileSystemDecoration {
    fn capability_options(&self) -> CapabilityOptions {
        self.components.iter().map(|c| c.options.clone()).fold(CapabilityOptions::none(), |acc, o| acc.union(&o))
    }

    fn event_source(&self) -> Arc<dyn EventSource> {
        self.events.clone()
    }

    async fn browse(&self, path: &str) -> Result<BrowseResult> {
        let _guard = self.belate.acquire()?;
        let mut exists = false;
        let mut seen = std::collections::HashSet::new();
        let mut entries = Vec::new();
        let mut any_applicable = false;
        let mut any_can_browse = false;
        for (component, child_path) in self.applicable(path) {
            any_applicable = true;
            if !component.options.can_browse {
                continue;
            }
            any_can_browse = true;
            let result = component.backend.browse(&child_path).await?;
            if result.exists {
                exists = true;
            }
            for entry in result.entries {
                let Some(translated) = component.entry_to_parent(entry) else { continue };
                if seen.insert(translated.name.clone()) {
                    entries.push(translated);
                }
            }
        }
        if !any_applicable {
            return Ok(BrowseResult { exists: false, entries: Vec::new() });
        }
        if !any_can_browse {
            return Err(Error::NotSupported(path.into()));
        }
        if !exists {
            return Err(Error::NotFound(path.into()));
        }
        Ok(BrowseResult { exists, entries })
    }

    async fn get_entry(&self, path: &str) -> Option<Entry> {
        let _guard = self.belate.acquire().ok()?;
        for (component, child_path) in self.applicable(path) {
            if !component.options.can_get_entry {
                continue;
            }
            if let Some(entry) = component.backend.get_entry(&child_path).await {
                return component.entry_to_parent(entry);
            }
        }
        None
    }

    async fn open(&self, path: &str, mode: OpenMode, access: AccessMode, share: AccessMode) -> Result<StreamHandle> {
        let _guard = self.belate.acquire()?;
        let mut first_error = None;
        let mut any_can_open = false;
        for (component, child_path) in self.applicable(path) {
            if !component.options.can_open {
                continue;
            }
            any_can_open = true;
            match component.backend.open(&child_path, mode, access, share).await {
                Ok(handle) => return Ok(handle),
                Err(Error::NotFound(_)) => continue,
                Err(other) => {
                    if first_error.is_none() {
                        first_error = Some(other);
                    }
                }
            }
        }
        if !any_can_open {
            return Err(Error::NotSupported(path.into()));
        }
        Err(first_error.unwrap_or_else(|| Error::NotFound(path.into())))
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let mut last_error = None;
        for (component, child_path) in self.applicable(path) {
            if !component.options.can_create_directory {
                continue;
            }
            match component.backend.create_directory(&child_path).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::NotSupported(path.into())))
    }

    async fn create_file(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let mut last_error = None;
        for (component, child_path) in self.applicable(path) {
            if !component.options.can_create_file {
                continue;
            }
            match component.backend.create_file(&child_path, bytes).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::NotSupported(path.into())))
    }

    async fn delete(&self, path: &str, recurse: bool) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let mut last_error = None;
        for (component, child_path) in self.applicable(path) {
            if !component.options.can_delete {
                continue;
            }
            match component.backend.delete(&child_path, recurse).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::NotFound(path.into())))
    }

    async fn move_entry(&self, src: &str, dst: &str) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let src_owner = self.applicable(src).find(|(c, _)| c.options.can_move);
        let dst_owner = self.applicable(dst).find(|(c, _)| c.options.can_move);

        match (src_owner, dst_owner) {
            (Some((src_c, src_child)), Some((dst_c, dst_child))) if std::ptr::eq(src_c, dst_c) => {
                src_c.backend.move_entry(&src_child, &dst_child).await
            }
            (Some((src_c, src_child)), Some((dst_c, dst_child))) => {
                cross_backend_move(src_c.backend.as_ref(), &src_child, dst_c.backend.as_ref(), &dst_child).await
            }
            _ => Err(Error::NotSupported(src.into())),
        }
    }

    async fn set_file_attribute(&self, path: &str, attrs: u32) -> Result<()> {
        let _guard = self.belate.acquire()?;
        let mut last_error = None;
        for (component, child_path) in self.applicable(path) {
            if !component.options.can_set_file_attribute {
                continue;
            }
            match component.backend.set_file_attribute(&child_path, attrs).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| Error::NotFound(path.into())))
    }
}

/// Transfers one entry between two different backends: copy then delete,
/// rolling back the copy if deleting the source fails. Shared by
/// same-decoration cross-component moves and cross-mount moves in
/// [`crate::virtual_fs`].
pub(crate) async fn cross_backend_move(
    src: &dyn FileSystemBackend,
    src_path: &str,
    dst: &dyn FileSystemBackend,
    dst_path: &str,
) -> Result<()> {
    let entry = src.get_entry(src_path).await.ok_or_else(|| Error::NotFound(src_path.into()))?;

    if entry.is_directory() {
        copy_directory(src, src_path, dst, dst_path).await?;
    } else {
        let bytes = read_all(src, src_path).await?;
        dst.create_file(dst_path, &bytes).await?;
    }

    if let Err(delete_err) = src.delete(src_path, true).await {
        // Roll back the copy so the transfer looks atomic to the caller.
        let _ = dst.delete(dst_path, true).await;
        return Err(delete_err);
    }
    Ok(())
}

fn copy_directory<'a>(
    src: &'a dyn FileSystemBackend,
    src_path: &'a str,
    dst: &'a dyn FileSystemBackend,
    dst_path: &'a str,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        dst.create_directory(dst_path).await?;
        let listing = src.browse(src_path).await?;
        for entry in listing.entries {
            let child_src = format!("{}/{}", src_path.trim_end_matches('/'), entry.name);
            let child_dst = format!("{}/{}", dst_path.trim_end_matches('/'), entry.name);
            if entry.is_directory() {
                copy_directory(src, &child_src, dst, &child_dst).await?;
            } else {
                let bytes = read_all(src, &child_src).await?;
                dst.create_file(&child_dst, &bytes).await?;
            }
        }
        Ok(())
    })
}

pub(crate) async fn read_all(backend: &dyn FileSystemBackend, path: &str) -> Result<Vec<u8>> {
    let handle = backend.open(path, OpenMode::Open, AccessMode::READ, AccessMode::READ_WRITE).await?;
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = handle.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_pool::BlockPool;
    use crate::entry::{CaseSensitivity, EmptyDirectoryName};
    use crate::memory_fs::MemoryFileSystem;
    use crate::observer::CallerThreadDispatcher;

    fn leaf() -> Arc<MemoryFileSystem> {
        let pool = BlockPool::new(64, 1024, 64);
        MemoryFileSystem::new(pool, CaseSensitivity::CaseSensitive, EmptyDirectoryName::Forbidden)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn browse_merges_entries_from_every_component_first_occurrence_wins() {
        let a = leaf();
        let b = leaf();
        a.create_file("shared.txt", b"from a").unwrap();
        b.create_file("shared.txt", b"from b").unwrap();
        b.create_file("only_b.txt", b"b only").unwrap();

        let decoration = FileSystemDecoration::new(vec![
            Component::new(a.clone(), PathConverter::identity()),
            Component::new(b.clone(), PathConverter::identity()),
        ]);

        let result = decoration.browse("").await.unwrap();
        assert!(result.exists);
        let names: Vec<_> = result.entries.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names.iter().filter(|n| *n == "shared.txt").count(), 1);
        assert!(names.contains(&"only_b.txt".to_string()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn open_tries_components_in_order_and_remembers_not_found() {
        let a = leaf();
        let b = leaf();
        b.create_file("f", b"from b").unwrap();

        let decoration = FileSystemDecoration::new(vec![
            Component::new(a.clone(), PathConverter::identity()),
            Component::new(b.clone(), PathConverter::identity()),
        ]);

        let handle = decoration.open("f", OpenMode::Open, AccessMode::READ, AccessMode::READ_WRITE).await.unwrap();
        let mut buf = [0u8; 16];
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"from b");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cross_backend_move_transfers_content_and_removes_source() {
        let a = leaf();
        let b = leaf();
        a.create_file("f", b"payload").unwrap();

        let decoration = FileSystemDecoration::new(vec![
            Component::with_options(a.clone(), CapabilityOptions { sub_path: Some("/a".into()), ..CapabilityOptions::all() }, PathConverter::new("/a", "")),
            Component::with_options(b.clone(), CapabilityOptions { sub_path: Some("/b".into()), ..CapabilityOptions::all() }, PathConverter::new("/b", "")),
        ]);

        decoration.move_entry("/a/f", "/b/f").await.unwrap();

        assert!(a.get_entry("f").is_none());
        assert!(b.get_entry("f").is_some());
        let handle = b.open("f", OpenMode::Open, AccessMode::READ, AccessMode::READ_WRITE).unwrap();
        let mut buf = [0u8; 16];
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"payload");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn observe_forwards_component_events_into_composite_namespace() {
        let a = leaf();
        let b = leaf();
        let decoration = FileSystemDecoration::new(vec![
            Component::with_options(a.clone(), CapabilityOptions { sub_path: Some("/a/".into()), ..CapabilityOptions::all() }, PathConverter::new("/a/", "")),
            Component::with_options(b.clone(), CapabilityOptions { sub_path: Some("/b/".into()), ..CapabilityOptions::all() }, PathConverter::new("/b/", "")),
        ]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_observer = seen.clone();
        let handle = decoration.observe(
            "/a/**",
            Box::new(move |event: crate::observer::Event| seen_for_observer.lock().unwrap().push(event.path)),
            Arc::new(CallerThreadDispatcher),
        );

        a.create_file("f", b"x").unwrap();
        b.create_file("g", b"y").unwrap();

        let paths = seen.lock().unwrap();
        assert!(paths.iter().any(|p| p == "/a/f"));
        assert!(!paths.iter().any(|p| p == "/b/g"));
        drop(paths);
        drop(handle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn decoration_event_source_can_be_nested_in_another_decoration() {
        let a = leaf();
        let inner = FileSystemDecoration::new(vec![Component::new(a.clone(), PathConverter::identity())]);
        let outer =
            FileSystemDecoration::new(vec![Component::new(inner.clone(), PathConverter::new("/mnt/", ""))]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_observer = seen.clone();
        let handle = outer.observe(
            "**",
            Box::new(move |event: crate::observer::Event| seen_for_observer.lock().unwrap().push(event.path)),
            Arc::new(CallerThreadDispatcher),
        );

        a.create_file("f", b"x").unwrap();

        assert!(seen.lock().unwrap().iter().any(|p| p == "/mnt/f"));
        drop(handle);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn capability_options_deny_skips_a_component() {
        let a = leaf();
        let read_only = Component::with_options(a.clone(), CapabilityOptions::read_only(), PathConverter::identity());
        let decoration = FileSystemDecoration::new(vec![read_only]);

        let err = decoration.create_file("f", b"x").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }
}
