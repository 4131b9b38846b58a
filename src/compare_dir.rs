//! 把一棵实际目录树和一份快照文件做对比:
//! 删除两边相同的条目后, 分别打印剩下的差异部分.
//!
//! 用法: `compare_dir [directory_path] [snapshot_file]`

use std::env;
use std::process::exit;

use dirsnap::{format, parse_file, remove_common, walk, Error, RcDirNode};

fn init(dir: &str, snapshot: &str) -> Result<(RcDirNode, RcDirNode), Error> {
    let root = walk(dir)?;
    let from_file = parse_file(snapshot)?;
    Ok((root, from_file))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} [directory_path] [snapshot_file]", args[0]);
        exit(1);
    }

    let (root, from_file) = match init(&args[1], &args[2]) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error initializing: {e}");
            exit(1);
        }
    };
    if let Err(e) = remove_common(&root, &from_file) {
        eprintln!("Error removing common: {e}");
        exit(1);
    }

    println!("From Path: ----------------------------------------");
    for line in format(&root) {
        println!("{line}");
    }
    println!("From File: ----------------------------------------");
    for line in format(&from_file) {
        println!("{line}");
    }
}
