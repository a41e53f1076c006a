use std::path::{ Path, PathBuf };

use crate::error::HarnessError;
use crate::test::common::write_tree;
use crate::treediff::{ Side, TreeDifference, assert_dirs_equal, diff_trees };

fn pair() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let expected = tmp.path().join("expected");
    let got = tmp.path().join("got");
    std::fs::create_dir(&expected).unwrap();
    std::fs::create_dir(&got).unwrap();
    (tmp, expected, got)
}

#[test]
fn identical_trees() {
    let (_tmp, expected, got) = pair();
    let files: &[(&str, &[u8])] = &[("index.html", b"hello"), ("file/1/abc", b"\x00\x01"), ("catalog/v1", b"{}")];
    write_tree(&expected, files);
    write_tree(&got, files);

    assert!(diff_trees(&expected, &got).unwrap().is_empty());
    assert_dirs_equal(&expected, &got).unwrap();
}

#[test]
fn only_in_reports_top_directory() {
    let (_tmp, expected, got) = pair();
    write_tree(&expected, &[("common", b"x"), ("extra/a/b.txt", b"b"), ("extra/c", b"c")]);
    write_tree(&got, &[("common", b"x"), ("new.txt", b"n")]);

    let diffs = diff_trees(&expected, &got).unwrap();
    assert_eq!(
        diffs,
        vec![
            TreeDifference::OnlyIn { side: Side::Expected, path: PathBuf::from("extra") },
            TreeDifference::OnlyIn { side: Side::Got, path: PathBuf::from("new.txt") },
        ]
    );
    assert_eq!(diffs[0].to_string(), "Only in expected: extra");
    assert_eq!(diffs[1].path(), Path::new("new.txt"));
}

#[test]
fn empty_directory_counts() {
    let (_tmp, expected, got) = pair();
    std::fs::create_dir(expected.join("empty")).unwrap();

    let diffs = diff_trees(&expected, &got).unwrap();
    assert_eq!(diffs, vec![TreeDifference::OnlyIn { side: Side::Expected, path: PathBuf::from("empty") }]);
}

#[test]
fn file_versus_directory() {
    let (_tmp, expected, got) = pair();
    write_tree(&expected, &[("x", b"file")]);
    write_tree(&got, &[("x/y", b"nested")]);

    let diffs = diff_trees(&expected, &got).unwrap();
    assert_eq!(diffs, vec![TreeDifference::KindMismatch { path: PathBuf::from("x") }]);
    assert_eq!(diffs[0].to_string(), "File type differs: x");
}

#[test]
fn text_mismatch_is_unified_diff() {
    let (_tmp, expected, got) = pair();
    write_tree(&expected, &[("a.txt", b"keep\nold\n")]);
    write_tree(&got, &[("a.txt", b"keep\nnew\n")]);

    let diffs = diff_trees(&expected, &got).unwrap();
    assert_eq!(diffs.len(), 1);
    let TreeDifference::ContentMismatch { path, diff } = &diffs[0] else {
        panic!("expected ContentMismatch, got {:?}", diffs[0]);
    };
    assert_eq!(path, Path::new("a.txt"));
    assert!(diff.contains("--- expected/a.txt"), "{diff}");
    assert!(diff.contains("+++ got/a.txt"), "{diff}");
    assert!(diff.contains("-old"), "{diff}");
    assert!(diff.contains("+new"), "{diff}");
    assert!(diff.contains(" keep"), "{diff}");
}

#[test]
fn binary_mismatch() {
    let (_tmp, expected, got) = pair();
    write_tree(&expected, &[("blob", b"\xff\x00\x01")]);
    write_tree(&got, &[("blob", b"\xff\x00\x02")]);

    let diffs = diff_trees(&expected, &got).unwrap();
    assert_eq!(diffs[0].to_string(), "Binary files expected/blob and got/blob differ\n");
}

#[test]
fn assert_reports_every_difference() {
    let (_tmp, expected, got) = pair();
    write_tree(&expected, &[("a", b"1"), ("b", b"same")]);
    write_tree(&got, &[("b", b"same"), ("c", b"3")]);

    match assert_dirs_equal(&expected, &got) {
        Err(HarnessError::TreeMismatch(report)) => {
            assert_eq!(report, "Only in expected: a\nOnly in got: c");
        }
        other => panic!("expected TreeMismatch, got {other:?}"),
    }
}

#[test]
fn missing_root_is_io_error() {
    let (_tmp, expected, got) = pair();
    let err = diff_trees(&expected, &got.join("absent")).unwrap_err();
    assert!(matches!(err, HarnessError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound), "{err:?}");
}

#[cfg(unix)]
#[test]
fn linked_directories_compare_by_contents() {
    let (tmp, expected, got) = pair();
    write_tree(tmp.path(), &[("oa/f", b"1"), ("ob/f", b"2")]);
    std::os::unix::fs::symlink(tmp.path().join("oa"), expected.join("a")).unwrap();
    std::os::unix::fs::symlink(tmp.path().join("ob"), got.join("a")).unwrap();

    let diffs = diff_trees(&expected, &got).unwrap();
    assert_eq!(diffs.len(), 1, "{diffs:?}");
    assert_eq!(diffs[0].path(), Path::new("a/f"));
    assert!(matches!(diffs[0], TreeDifference::ContentMismatch { .. }));
}

#[cfg(unix)]
#[test]
fn link_to_identical_directory_is_equal() {
    let (tmp, expected, got) = pair();
    write_tree(&expected, &[("a/f", b"1")]);
    write_tree(tmp.path(), &[("outside/f", b"1")]);
    std::os::unix::fs::symlink(tmp.path().join("outside"), got.join("a")).unwrap();

    assert_eq!(diff_trees(&expected, &got).unwrap(), vec![]);
    assert_dirs_equal(&expected, &got).unwrap();
}
