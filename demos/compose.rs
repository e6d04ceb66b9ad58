//! Composes two in-memory backends under one [`VirtualFileSystem`], then
//! drives a mount, a cross-mount move, and an observer subscription to show
//! the pieces working together end to end.

use std::sync::{Arc, Mutex};

use mamont_vfs::block_pool::BlockPool;
use mamont_vfs::entry::{CapabilityOptions, CaseSensitivity, EmptyDirectoryName};
use mamont_vfs::observer::{CallerThreadDispatcher, Event};
use mamont_vfs::{MemoryFileSystem, MountAssignment, VirtualFileSystem};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let home = MemoryFileSystem::new(
        BlockPool::new(4096, 1024, 128),
        CaseSensitivity::CaseSensitive,
        EmptyDirectoryName::Forbidden,
    );
    let scratch = MemoryFileSystem::new(
        BlockPool::new(4096, 1024, 128),
        CaseSensitivity::CaseSensitive,
        EmptyDirectoryName::Forbidden,
    );

    let vfs = VirtualFileSystem::new();
    vfs.mount("/home", vec![MountAssignment::new(home.clone(), CapabilityOptions::all())])
        .await
        .expect("mount /home");
    vfs.mount("/scratch", vec![MountAssignment::new(scratch.clone(), CapabilityOptions::all())])
        .await
        .expect("mount /scratch");

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_for_observer = seen.clone();
    let subscription = vfs.observe(
        "**",
        Box::new(move |event: Event| seen_for_observer.lock().unwrap().push(event.path)),
        Arc::new(CallerThreadDispatcher),
    );

    vfs.create_file("/home/draft.txt", b"first draft").await.expect("create draft");
    vfs.move_entry("/home/draft.txt", "/scratch/draft.txt").await.expect("move across mounts");

    let root = vfs.browse("").await.expect("browse vfs root");
    println!("vfs root entries: {:?}", root.entries.iter().map(|e| e.name.clone()).collect::<Vec<_>>());
    println!("events observed so far: {:?}", seen.lock().unwrap());

    vfs.unmount("/scratch").await.expect("unmount /scratch");
    println!("events after unmount: {:?}", seen.lock().unwrap());

    drop(subscription);
}
