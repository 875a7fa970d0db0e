// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! End-to-end scenarios exercising the engine through its public surface:
//! content round-trips, quota atomicity, permission evaluation, path
//! equivalence, symlink cycle detection, removal accounting, and the
//! concrete visitors.

use std::io::SeekFrom;
use std::path::Path;

use crate::config::{FsConfig, QuotaPolicy};
use crate::content::MockContent;
use crate::error::FsError;
use crate::types::{Credentials, FileType, OpenOptions};
use crate::vfs::FsCore;
use crate::visit::{PrintVisitor, StructureVisitor};

fn create_test_fs() -> FsCore {
    FsCore::new(FsConfig::default())
}

fn quota_fs(max_bytes: u64) -> FsCore {
    FsCore::new(FsConfig {
        quota: QuotaPolicy {
            max_bytes: Some(max_bytes),
        },
        ..FsConfig::default()
    })
}

fn creds() -> Credentials {
    Credentials::root()
}

#[test]
fn writes_read_back_at_arbitrary_offsets() {
    let fs = create_test_fs();
    let handle = fs
        .open(&creds(), Path::new("/blob"), &OpenOptions::create_rw())
        .unwrap();

    for &(offset, data) in &[
        (0u64, &b"front"[..]),
        (100, b"gap-spanning payload"),
        (7, b"overlap"),
        (99, b"x"),
    ] {
        fs.write_at(&creds(), handle, offset, data).unwrap();
        let mut buf = vec![0u8; data.len()];
        assert_eq!(fs.read_at(&creds(), handle, offset, &mut buf).unwrap(), data.len());
        assert_eq!(buf, data);
    }
}

#[test]
fn sparse_files_declare_size_without_round_tripping() {
    let fs = create_test_fs();
    fs.create_sparse_file(&creds(), Path::new("/huge"), 10 * 1024 * 1024 * 1024)
        .unwrap();

    let attrs = fs.getattr(&creds(), Path::new("/huge")).unwrap();
    assert_eq!(attrs.kind, FileType::File);
    assert_eq!(attrs.len, 10 * 1024 * 1024 * 1024);

    // Writes are accepted but reads stay zero-filled by design.
    let handle = fs
        .open(&creds(), Path::new("/huge"), &OpenOptions::read_write())
        .unwrap();
    fs.write_at(&creds(), handle, 0, b"not stored").unwrap();
    let mut buf = [0xffu8; 10];
    assert_eq!(fs.read_at(&creds(), handle, 0, &mut buf).unwrap(), 10);
    assert_eq!(buf, [0u8; 10]);
}

#[test]
fn rejected_write_leaves_content_and_usage_untouched() {
    let fs = quota_fs(10);
    let handle = fs
        .open(&creds(), Path::new("/f"), &OpenOptions::create_rw())
        .unwrap();
    fs.write_at(&creds(), handle, 0, b"AAAA").unwrap();
    assert_eq!(fs.quota(&creds(), Path::new("/")).unwrap().used(), 4);

    // Ten more bytes at offset 2 would end at 12, over the 10-byte limit.
    assert!(matches!(
        fs.write_at(&creds(), handle, 2, &[0x42; 10]),
        Err(FsError::QuotaExceeded)
    ));

    assert_eq!(fs.quota(&creds(), Path::new("/")).unwrap().used(), 4);
    let mut buf = [0u8; 8];
    assert_eq!(fs.read_at(&creds(), handle, 0, &mut buf).unwrap(), 4);
    assert_eq!(&buf[..4], b"AAAA");
}

#[test]
fn quota_checks_cover_caller_supplied_content() {
    let fs = quota_fs(100);

    let mut content = MockContent::new();
    content.expect_size().return_const(200u64);
    content.expect_write().never();

    assert!(matches!(
        fs.create_file_with(&creds(), Path::new("/too-big"), Box::new(content)),
        Err(FsError::QuotaExceeded)
    ));
    assert!(matches!(
        fs.getattr(&creds(), Path::new("/too-big")),
        Err(FsError::NotFound)
    ));
    assert_eq!(fs.quota(&creds(), Path::new("/")).unwrap().used(), 0);
}

#[test]
fn nested_quota_scopes_all_govern_a_write() {
    let fs = quota_fs(1000);
    fs.mkdir(&creds(), Path::new("/project"), 0o755).unwrap();
    fs.set_quota(&creds(), Path::new("/project"), Some(10)).unwrap();

    let handle = fs
        .open(&creds(), Path::new("/project/f"), &OpenOptions::create_rw())
        .unwrap();
    // The root scope would allow this; the nearer scope refuses.
    assert!(matches!(
        fs.write_at(&creds(), handle, 0, &[1u8; 11]),
        Err(FsError::QuotaExceeded)
    ));
    fs.write_at(&creds(), handle, 0, &[1u8; 10]).unwrap();

    assert_eq!(fs.quota(&creds(), Path::new("/project")).unwrap().used(), 10);
    assert_eq!(fs.quota(&creds(), Path::new("/")).unwrap().used(), 10);
}

#[test]
fn group_class_grants_read_but_not_write() {
    let fs = create_test_fs();
    fs.create_file(&creds(), Path::new("/doc"), b"text").unwrap();
    fs.set_owner(&creds(), Path::new("/doc"), 1, 1).unwrap();
    fs.set_mode(&creds(), Path::new("/doc"), 0o640).unwrap();

    let requester = Credentials::new(2, 1);
    assert!(matches!(
        fs.access(&requester, Path::new("/doc"), false, true, false),
        Err(FsError::PermissionDenied)
    ));
    fs.access(&requester, Path::new("/doc"), true, false, false).unwrap();
}

#[test]
fn dot_dot_resolves_against_the_tree_not_the_text() {
    let fs = create_test_fs();
    fs.mkdir(&creds(), Path::new("/a"), 0o755).unwrap();
    fs.create_file(&creds(), Path::new("/a/b"), b"same node").unwrap();

    let direct = fs.realpath(&creds(), Path::new("/a/b")).unwrap();
    let winding = fs.realpath(&creds(), Path::new("/a/../a/b")).unwrap();
    assert_eq!(direct, winding);

    // Writing through one spelling is visible through the other.
    let handle = fs
        .open(&creds(), Path::new("/a/../a/b"), &OpenOptions::read_write())
        .unwrap();
    fs.write_at(&creds(), handle, 0, b"SAME").unwrap();
    let mut buf = [0u8; 4];
    let direct_handle = fs
        .open(&creds(), Path::new("/a/b"), &OpenOptions::read_only())
        .unwrap();
    fs.read_at(&creds(), direct_handle, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"SAME");
}

#[test]
fn dot_dot_at_the_root_stays_at_the_root() {
    let fs = create_test_fs();
    fs.mkdir(&creds(), Path::new("/only"), 0o755).unwrap();
    let attrs = fs.getattr(&creds(), Path::new("/../../only")).unwrap();
    assert_eq!(attrs.kind, FileType::Directory);
}

#[test]
fn self_referential_symlink_fails_with_too_many_symlinks() {
    let fs = create_test_fs();
    fs.symlink(&creds(), "/x", Path::new("/x")).unwrap();
    assert!(matches!(
        fs.getattr(&creds(), Path::new("/x")),
        Err(FsError::TooManySymlinks)
    ));
}

#[test]
fn mutual_symlink_cycle_fails_with_too_many_symlinks() {
    let fs = create_test_fs();
    fs.symlink(&creds(), "/b", Path::new("/a")).unwrap();
    fs.symlink(&creds(), "/a", Path::new("/b")).unwrap();
    assert!(matches!(
        fs.getattr(&creds(), Path::new("/a")),
        Err(FsError::TooManySymlinks)
    ));
}

#[test]
fn long_acyclic_chains_hit_the_hop_bound_too() {
    let fs = create_test_fs();
    fs.create_file(&creds(), Path::new("/end"), b"").unwrap();
    fs.symlink(&creds(), "/end", Path::new("/link0")).unwrap();
    for i in 1..=45 {
        let target = format!("/link{}", i - 1);
        let path = format!("/link{i}");
        fs.symlink(&creds(), &target, Path::new(&path)).unwrap();
    }

    // 30 hops resolve, 45 exceed the fixed bound of 40.
    fs.getattr(&creds(), Path::new("/link29")).unwrap();
    assert!(matches!(
        fs.getattr(&creds(), Path::new("/link44")),
        Err(FsError::TooManySymlinks)
    ));
}

#[test]
fn dangling_symlinks_fail_only_when_traversed() {
    let fs = create_test_fs();
    fs.symlink(&creds(), "/not/yet/there", Path::new("/pending")).unwrap();

    // The link itself is observable.
    assert_eq!(
        fs.lgetattr(&creds(), Path::new("/pending")).unwrap().kind,
        FileType::Symlink
    );
    assert!(matches!(
        fs.getattr(&creds(), Path::new("/pending")),
        Err(FsError::NotFound)
    ));
}

#[test]
fn directory_removal_accounts_quota_exactly() {
    let fs = quota_fs(1000);
    fs.mkdir(&creds(), Path::new("/test"), 0o755).unwrap();
    fs.create_file(&creds(), Path::new("/test/data"), b"0123456789").unwrap();
    fs.create_file(&creds(), Path::new("/keep"), b"abc").unwrap();
    assert_eq!(fs.quota(&creds(), Path::new("/")).unwrap().used(), 13);

    assert!(matches!(
        fs.rmdir(&creds(), Path::new("/test"), false),
        Err(FsError::DirectoryNotEmpty)
    ));
    assert_eq!(fs.quota(&creds(), Path::new("/")).unwrap().used(), 13);

    fs.rmdir(&creds(), Path::new("/test"), true).unwrap();
    assert_eq!(fs.quota(&creds(), Path::new("/")).unwrap().used(), 3);
    assert!(matches!(
        fs.getattr(&creds(), Path::new("/test/data")),
        Err(FsError::NotFound)
    ));
}

#[test]
fn rename_across_quota_scopes_rebalances_usage() {
    let fs = create_test_fs();
    fs.mkdir(&creds(), Path::new("/src"), 0o755).unwrap();
    fs.mkdir(&creds(), Path::new("/dst"), 0o755).unwrap();
    fs.set_quota(&creds(), Path::new("/src"), None).unwrap();
    fs.set_quota(&creds(), Path::new("/dst"), Some(4)).unwrap();
    fs.create_file(&creds(), Path::new("/src/big"), b"12345678").unwrap();
    fs.create_file(&creds(), Path::new("/src/small"), b"1234").unwrap();

    assert!(matches!(
        fs.rename(&creds(), Path::new("/src/big"), Path::new("/dst/big")),
        Err(FsError::QuotaExceeded)
    ));
    // The refused move left both trees as they were.
    assert_eq!(fs.getattr(&creds(), Path::new("/src/big")).unwrap().len, 8);
    assert_eq!(fs.quota(&creds(), Path::new("/src")).unwrap().used(), 12);

    fs.rename(&creds(), Path::new("/src/small"), Path::new("/dst/small")).unwrap();
    assert_eq!(fs.quota(&creds(), Path::new("/src")).unwrap().used(), 8);
    assert_eq!(fs.quota(&creds(), Path::new("/dst")).unwrap().used(), 4);
}

fn build_sample_tree(fs: &FsCore) {
    fs.mkdir(&creds(), Path::new("/root"), 0o755).unwrap();
    fs.mkdir(&creds(), Path::new("/root/test"), 0o755).unwrap();
    fs.mkdir(&creds(), Path::new("/root/test/foo"), 0o755).unwrap();
    fs.create_file(&creds(), Path::new("/root/test/foo/test.txt"), b"hello")
        .unwrap();
    fs.create_file(&creds(), Path::new("/root/test/baz.txt"), b"world")
        .unwrap();
    fs.create_file(&creds(), Path::new("/root/foo.txt"), b"").unwrap();
}

#[test]
fn structure_visitor_mirrors_the_tree() {
    let fs = create_test_fs();
    build_sample_tree(&fs);

    let mut visitor = StructureVisitor::new();
    fs.visit(&creds(), Path::new("/root"), &mut visitor).unwrap();
    assert_eq!(
        visitor.into_structure(),
        serde_json::json!({
            "root": {
                "test": {
                    "foo": {
                        "test.txt": "hello"
                    },
                    "baz.txt": "world"
                },
                "foo.txt": ""
            }
        })
    );
}

#[test]
fn print_visitor_indents_by_depth() {
    let fs = create_test_fs();
    build_sample_tree(&fs);

    let mut visitor = PrintVisitor::new(Vec::new());
    fs.visit(&creds(), Path::new("/root"), &mut visitor).unwrap();
    let output = String::from_utf8(visitor.into_inner()).unwrap();
    assert_eq!(
        output,
        "- root\n  - test\n    - foo\n      - test.txt\n    - baz.txt\n  - foo.txt\n"
    );
}

#[test]
fn independent_instances_do_not_share_state() {
    let fs_a = create_test_fs();
    let fs_b = create_test_fs();
    fs_a.create_file(&creds(), Path::new("/only-in-a"), b"").unwrap();

    assert!(matches!(
        fs_b.getattr(&creds(), Path::new("/only-in-a")),
        Err(FsError::NotFound)
    ));
}

#[test]
fn seek_past_end_materializes_zeroes_on_write() {
    let fs = create_test_fs();
    let handle = fs
        .open(&creds(), Path::new("/gappy"), &OpenOptions::create_rw())
        .unwrap();
    fs.write(&creds(), handle, b"ab").unwrap();
    fs.seek(handle, SeekFrom::Start(6)).unwrap();
    fs.write(&creds(), handle, b"yz").unwrap();

    assert_eq!(fs.getattr(&creds(), Path::new("/gappy")).unwrap().len, 8);
    let mut buf = [1u8; 8];
    fs.read_at(&creds(), handle, 0, &mut buf).unwrap();
    assert_eq!(&buf, b"ab\0\0\0\0yz");
}
