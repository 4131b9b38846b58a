//! 对一棵目录子树建立内存快照(每个条目的名称, 类型, 大小, 修改时间),
//! 把快照序列化为文本或从文本重建, 并能对两棵树求结构差异:
//! 删除两边相同的部分, 只留下不同的条目.
//!
//! 入口:
//! - [`walk()`]: 递归读取真实目录树, 构建快照树;
//! - [`format`] / [`parse`]: 快照的文本编解码;
//! - [`remove_common`]: 原地求两棵树的差异.

mod codec;
mod diff;
mod tree;
mod walk;

pub use codec::{format, parse, parse_file, parse_reader, Lines, ParseError, ParseErrorKind};
pub use diff::{remove_common, Error as DiffError};
pub use tree::{DirNode, Entry, EntryKind, RcDirNode};
pub use walk::{walk, Error as WalkError};

use std::fmt::Debug;
use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// 读取快照文件时的 io 错误
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Walk(#[from] walk::Error),
    #[error(transparent)]
    Parse(#[from] codec::ParseError),
    #[error(transparent)]
    Diff(#[from] diff::Error),
}
