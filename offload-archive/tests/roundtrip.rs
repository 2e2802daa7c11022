//! Pack/unpack integration tests: lossless round trip, determinism, and
//! tolerance of damaged third-party archives.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use offload_archive::{pack, pack_to_file, unpack, unpack_file};
use tempfile::TempDir;

fn pseudo_random(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        })
        .collect()
}

fn build_tree(root: &Path) {
    fs::create_dir_all(root.join("src/nested/deeper")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("README.md"), "# workspace\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("src/nested/data.bin"), pseudo_random(10_000, 7)).unwrap();
    fs::write(root.join("src/nested/deeper/empty.txt"), "").unwrap();
}

fn collect(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().display().to_string();
                out.push((rel, fs::read(&path).unwrap()));
            }
        }
    }
    out.sort();
    out
}

#[test]
fn round_trip_preserves_paths_and_bytes() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    build_tree(src.path());

    let bytes = pack(src.path()).unwrap();
    let summary = unpack(&bytes, dest.path()).unwrap();

    assert_eq!(collect(src.path()), collect(dest.path()));
    assert_eq!(summary.files, 4);
    assert_eq!(summary.directories, 4);
    assert_eq!(summary.skipped, 0);
    assert!(dest.path().join("empty").is_dir(), "empty dirs are recreated");
}

#[test]
#[cfg(unix)]
fn round_trip_preserves_permission_bits() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let modes = [0o400, 0o444, 0o600, 0o640, 0o644, 0o700, 0o751, 0o755, 0o777];
    fs::create_dir_all(src.path().join("bin")).unwrap();
    for mode in modes {
        let path = src.path().join("bin").join(format!("f{mode:o}"));
        fs::write(&path, format!("mode {mode:o}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    let bytes = pack(src.path()).unwrap();
    unpack(&bytes, dest.path()).unwrap();

    for mode in modes {
        let path = dest.path().join("bin").join(format!("f{mode:o}"));
        let restored = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(restored, mode, "mode of {}", path.display());
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("mode {mode:o}"));
    }
}

#[test]
fn unchanged_content_packs_byte_identical_despite_mtime() {
    let src = TempDir::new().unwrap();
    build_tree(src.path());
    let first = pack(src.path()).unwrap();

    let later = FileTime::from_system_time(SystemTime::now() + Duration::from_secs(3600));
    set_file_mtime(src.path().join("README.md"), later).unwrap();
    set_file_mtime(src.path().join("src/main.rs"), later).unwrap();

    let second = pack(src.path()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn changed_content_changes_the_archive() {
    let src = TempDir::new().unwrap();
    build_tree(src.path());
    let first = pack(src.path()).unwrap();
    fs::write(src.path().join("src/main.rs"), "fn main() { println!(); }\n").unwrap();
    assert_ne!(first, pack(src.path()).unwrap());
}

#[test]
fn unpack_into_existing_tree_overwrites_files() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    build_tree(src.path());
    fs::create_dir_all(dest.path().join("src")).unwrap();
    fs::write(dest.path().join("src/main.rs"), "stale").unwrap();

    unpack(&pack(src.path()).unwrap(), dest.path()).unwrap();
    assert_eq!(
        fs::read_to_string(dest.path().join("src/main.rs")).unwrap(),
        "fn main() {}\n"
    );
}

#[test]
fn file_round_trip_via_disk() {
    let src = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    build_tree(src.path());

    let archive = scratch.path().join("ws.tar.zst");
    let size = pack_to_file(src.path(), &archive).unwrap();
    assert_eq!(size, fs::metadata(&archive).unwrap().len());

    unpack_file(&archive, dest.path()).unwrap();
    assert_eq!(collect(src.path()), collect(dest.path()));
}

#[test]
fn truncated_archive_is_not_fatal() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    for i in 0..8 {
        fs::write(
            src.path().join(format!("chunk{i}.bin")),
            pseudo_random(64 * 1024, i),
        )
        .unwrap();
    }
    let bytes = pack(src.path()).unwrap();
    let truncated = &bytes[..bytes.len() / 2];

    unpack(truncated, dest.path()).expect("damaged archives are tolerated");
    assert_eq!(
        fs::read(dest.path().join("chunk0.bin")).unwrap(),
        pseudo_random(64 * 1024, 0),
        "entries before the damage are intact"
    );
}

#[test]
fn escaping_entries_are_skipped() {
    let dest = TempDir::new().unwrap();
    let outside = dest.path().join("escape.txt");
    let inner = dest.path().join("inner");

    let mut tar_bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_bytes);

        let mut evil = tar::Header::new_old();
        let name = b"../escape.txt";
        evil.as_old_mut().name[..name.len()].copy_from_slice(name);
        evil.set_size(4);
        evil.set_mode(0o644);
        evil.set_entry_type(tar::EntryType::Regular);
        evil.set_cksum();
        builder.append(&evil, &b"evil"[..]).unwrap();

        let mut good = tar::Header::new_gnu();
        good.set_size(2);
        good.set_mode(0o644);
        good.set_entry_type(tar::EntryType::Regular);
        builder.append_data(&mut good, "ok.txt", &b"ok"[..]).unwrap();
        builder.finish().unwrap();
    }
    let compressed = zstd::encode_all(&tar_bytes[..], 3).unwrap();

    let summary = unpack(&compressed, &inner).unwrap();
    assert_eq!(summary.files, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!outside.exists());
    assert_eq!(fs::read_to_string(inner.join("ok.txt")).unwrap(), "ok");
}

#[test]
fn oversized_length_header_is_skipped_without_allocating() {
    let dest = TempDir::new().unwrap();

    // Header claims 8 GiB - 1 bytes; only one block of data follows.
    let mut header = tar::Header::new_gnu();
    header.set_path("huge.bin").unwrap();
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.as_gnu_mut().unwrap().size = *b"77777777777\0";
    header.set_cksum();
    assert_eq!(header.size().unwrap(), 0o77777777777);

    let mut tar_bytes = header.as_bytes().to_vec();
    tar_bytes.extend_from_slice(&[0xAB; 512]);
    let compressed = zstd::encode_all(&tar_bytes[..], 3).unwrap();

    let summary = unpack(&compressed, dest.path()).unwrap();
    assert_eq!(summary.files, 0);
    assert_eq!(summary.skipped, 1);
    assert!(!dest.path().join("huge.bin").exists());
}
