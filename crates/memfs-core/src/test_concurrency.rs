// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Threaded scenarios exercising the store lock
//!
//! Every operation serializes on the single store lock, so racing callers
//! must each observe a fully applied tree state: duplicate creates pick one
//! winner, duplicate unlinks resolve to one success, and readers never see a
//! torn write.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::{FsError, FsStore, NodeType, StoreConfig};

fn shared_store() -> Arc<FsStore> {
    Arc::new(FsStore::new(StoreConfig::default()).unwrap())
}

#[test]
fn concurrent_creates_with_distinct_names_all_land() {
    let fs = shared_store();
    let root = fs.root();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || fs.create(root, &format!("file{i}"), NodeType::File, 0o644))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(fs.readdir(root, 0).unwrap().len(), 8);
    for i in 0..8 {
        assert!(fs.lookup(root, &format!("file{i}")).unwrap().is_some());
    }
}

#[test]
fn concurrent_creates_with_same_name_pick_one_winner() {
    let fs = shared_store();
    let root = fs.root();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || fs.create(root, "same", NodeType::File, 0o644))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let won = results.iter().filter(|r| r.is_ok()).count();
    let lost = results.iter().filter(|r| **r == Err(FsError::AlreadyExists)).count();
    assert_eq!(won, 1);
    assert_eq!(lost, 7);
    assert_eq!(fs.readdir(root, 0).unwrap().len(), 1);
}

#[test]
fn concurrent_unlinks_resolve_to_one_success() {
    let fs = shared_store();
    let root = fs.root();
    fs.create(root, "victim", NodeType::File, 0o644).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || fs.unlink(root, "victim"))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results.iter().filter(|r| **r == Err(FsError::NotFound)).count(),
        3
    );
    assert_eq!(fs.lookup(root, "victim").unwrap(), None);
}

#[test]
fn concurrent_appends_lose_no_bytes() {
    let fs = shared_store();
    let file = fs.create(fs.root(), "log", NodeType::File, 0o644).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for _ in 0..64 {
                    fs.write(file, 0, b"ab", true).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fs.getattr(file).unwrap().len, 4 * 64 * 2);
}

#[test]
fn readers_see_whole_writes_only() {
    let fs = shared_store();
    let file = fs.create(fs.root(), "f", NodeType::File, 0o644).unwrap();
    fs.write(file, 0, &[b'a'; 4], false).unwrap();

    // Writes at offset 0 swap the whole content, so a reader must see either
    // four a's or eight b's, never a mix or an in-between length.
    let writer = {
        let fs = Arc::clone(&fs);
        thread::spawn(move || {
            for i in 0..200 {
                if i % 2 == 0 {
                    fs.write(file, 0, &[b'b'; 8], false).unwrap();
                } else {
                    fs.write(file, 0, &[b'a'; 4], false).unwrap();
                }
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut buf = [0u8; 16];
                    let n = fs.read(file, 0, &mut buf).unwrap();
                    match n {
                        4 => assert!(buf[..4].iter().all(|&b| b == b'a')),
                        8 => assert!(buf[..8].iter().all(|&b| b == b'b')),
                        other => panic!("torn read of {other} bytes"),
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn readdir_snapshots_are_internally_consistent() {
    let fs = shared_store();
    let root = fs.root();

    let creator = {
        let fs = Arc::clone(&fs);
        thread::spawn(move || {
            for i in 0..128 {
                fs.create(root, &format!("n{i}"), NodeType::File, 0o644).unwrap();
            }
        })
    };

    let lister = {
        let fs = Arc::clone(&fs);
        thread::spawn(move || {
            for _ in 0..64 {
                let entries = fs.readdir(root, 0).unwrap();
                let names: HashSet<_> = entries.iter().map(|e| e.name.as_str()).collect();
                assert_eq!(names.len(), entries.len(), "duplicate entry in one pass");
            }
        })
    };

    creator.join().unwrap();
    lister.join().unwrap();
    assert_eq!(fs.readdir(root, 0).unwrap().len(), 128);
}
