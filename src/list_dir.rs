//! 列出一棵目录树: 每个条目一行快照格式, 输出到 stdout.
//!
//! 用法: `list_dir [directory_path]`, 缺省列出当前目录.

use std::env;
use std::process::exit;

use dirsnap::{format, walk};

fn main() {
    let args: Vec<String> = env::args().collect();
    let start_path = args.get(1).map_or(".", String::as_str);

    let root = match walk(start_path) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: {e}");
            exit(1);
        }
    };
    for line in format(&root) {
        println!("{line}");
    }
}
