//! 真实目录 -> walk -> format -> parse 的端到端往返测试.

use std::fs;
use std::io::Write;

use dirsnap::{format, parse, parse_file, walk};

#[test]
fn walked_tree_round_trips_through_text() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir(tmp.path().join("my dir")).unwrap();
    fs::write(tmp.path().join("my dir").join("file with spaces.txt"), b"x".repeat(123)).unwrap();
    fs::create_dir(tmp.path().join("empty")).unwrap();
    fs::create_dir_all(tmp.path().join("deep").join("deeper")).unwrap();
    fs::write(tmp.path().join("deep").join("deeper").join("leaf"), b"leaf").unwrap();
    fs::write(tmp.path().join("top.bin"), b"0123456789").unwrap();

    let tree = walk(tmp.path()).unwrap();
    let lines: Vec<String> = format(&tree).collect();

    // 文件夹的行先于其内容, 整体按字典序
    assert!(lines[0].starts_with("deep 4 0 "));
    assert!(lines[1].starts_with("deep/deeper 4 0 "));
    assert!(lines[2].starts_with("deep/deeper/leaf 8 4 "));
    assert!(lines[3].starts_with("empty 4 0 "));
    assert!(lines[4].starts_with("my dir 4 0 "));
    assert!(lines[5].starts_with("my dir/file with spaces.txt 8 123 "));
    assert!(lines[6].starts_with("top.bin 8 10 "));
    assert_eq!(lines.len(), 7);

    let parsed = parse(&lines).unwrap();
    assert_eq!(tree, parsed);
}

#[test]
fn snapshot_file_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();
    fs::write(tmp.path().join("sub").join("a.txt"), b"aaa").unwrap();

    let tree = walk(tmp.path()).unwrap();
    let snapshot_path = tmp.path().join("snapshot.txt");
    {
        let mut file = fs::File::create(&snapshot_path).unwrap();
        for line in format(&tree) {
            writeln!(file, "{line}").unwrap();
        }
    }
    let parsed = parse_file(&snapshot_path).unwrap();
    // snapshot.txt 本身是在 walk 之后创建的, 不在树里
    assert_eq!(tree, parsed);
}

#[test]
fn empty_directory_formats_to_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = walk(tmp.path()).unwrap();
    assert!(tree.is_empty());
    assert_eq!(format(&tree).count(), 0);
}
