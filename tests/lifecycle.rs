//! Handle lifecycle tests: exclusive ownership, teardown, close semantics.

use filemap::MappedFile;
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("filemap_lifecycle_{}_{}", name, std::process::id()));
    p
}

#[test]
fn independent_handles_do_not_interfere() {
    let path = tmp_path("independent_handles_do_not_interfere");
    let _ = fs::remove_file(&path);

    fs::write(&path, [0x11_u8; 256]).expect("seed file");

    let first = MappedFile::open(&path).expect("open first");
    let second = MappedFile::open(&path).expect("open second");

    // Tearing down one handle leaves the other's region fully readable.
    drop(first);
    assert_eq!(second.len(), 256);
    assert!(second.as_slice().iter().all(|&b| b == 0x11));
    drop(second);

    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn writes_are_shared_between_handles() {
    let path = tmp_path("writes_are_shared_between_handles");
    let _ = fs::remove_file(&path);

    fs::write(&path, [0_u8; 32]).expect("seed file");

    let mut writer = MappedFile::open(&path).expect("open writer");
    let reader = MappedFile::open(&path).expect("open reader");

    // Both handles map the same shared pages.
    writer.as_mut_slice()[0] = 0xEE;
    assert_eq!(reader.as_slice()[0], 0xEE);

    drop(writer);
    drop(reader);
    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn close_then_reopen() {
    let path = tmp_path("close_then_reopen");
    let _ = fs::remove_file(&path);

    fs::write(&path, [0x42_u8; 128]).expect("seed file");

    let map = MappedFile::open(&path).expect("open");
    map.close();

    // The file is fully usable again after teardown.
    let again = MappedFile::open(&path).expect("reopen");
    assert_eq!(again.len(), 128);
    drop(again);

    fs::remove_file(&path).expect("cleanup");
}

#[test]
fn absent_handle_drop_is_a_noop() {
    // Absence is represented by Option; dropping None touches nothing.
    let maybe: Option<MappedFile> = None;
    drop(maybe);
}

#[test]
fn handle_is_send() {
    let path = tmp_path("handle_is_send");
    let _ = fs::remove_file(&path);

    fs::write(&path, [0x33_u8; 64]).expect("seed file");

    let map = MappedFile::open(&path).expect("open");
    let joined = std::thread::spawn(move || {
        let sum: u64 = map.as_slice().iter().map(|&b| u64::from(b)).sum();
        drop(map);
        sum
    })
    .join()
    .expect("join");
    assert_eq!(joined, 64 * 0x33);

    fs::remove_file(&path).expect("cleanup");
}
