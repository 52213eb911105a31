//! Resource accounting on failure and teardown paths.
//!
//! Linux-only: `/proc/self/fd` is the one place descriptors can be counted
//! without extra tooling. Kept as a single test so the counter is not raced
//! by a sibling test opening files in parallel.

#![cfg(target_os = "linux")]

use filemap::{MapError, MappedFile};
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("filemap_leaks_{}_{}", name, std::process::id()));
    p
}

fn open_fd_count() -> usize {
    fs::read_dir("/proc/self/fd").expect("read /proc/self/fd").count()
}

#[test]
fn no_descriptors_leak_on_any_path() {
    let missing = tmp_path("missing");
    let _ = fs::remove_file(&missing);

    let empty = tmp_path("empty");
    fs::write(&empty, b"").expect("seed empty");

    let real = tmp_path("real");
    fs::write(&real, [0xAB_u8; 4096]).expect("seed real");

    let baseline = open_fd_count();

    // Failed opens acquire nothing.
    for _ in 0..64 {
        match MappedFile::open(&missing) {
            Err(MapError::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
    assert_eq!(open_fd_count(), baseline, "after failed opens");

    // Mapping-object failures release the already-open descriptor.
    for _ in 0..64 {
        match MappedFile::open(&empty) {
            Err(MapError::MapFailed(_)) => {}
            other => panic!("expected MapFailed, got {other:?}"),
        }
    }
    assert_eq!(open_fd_count(), baseline, "after rejected mappings");

    // A live handle holds no descriptor: the fd is closed once the mapping
    // is established.
    let map = MappedFile::open(&real).expect("open");
    assert_eq!(open_fd_count(), baseline, "while mapped");
    drop(map);

    // Full open/teardown cycles balance out.
    for _ in 0..32 {
        let map = MappedFile::open(&real).expect("open");
        assert_eq!(map.len(), 4096);
        drop(map);
    }
    assert_eq!(open_fd_count(), baseline, "after open/drop cycles");

    fs::remove_file(&empty).expect("cleanup empty");
    fs::remove_file(&real).expect("cleanup real");
}
