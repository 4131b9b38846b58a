use std::io;
use std::path::Path;

use chrono::DateTime;
use rustix::fd::OwnedFd;
use rustix::fs::{access, openat, statat, Access, AtFlags, Dir, FileType, Mode, OFlags, CWD};

use crate::tree::{EntryKind, RcDirNode};

/// 遍历目录树时产生的错误, 任何一个都会使整次遍历立即终止.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// 起始路径不可读
    #[error("cannot access {path}: {source}")]
    Access { path: String, source: io::Error },
    /// 目录无法以目录方式打开或读取
    #[error("cannot open directory {path}: {source}")]
    OpenDir { path: String, source: io::Error },
    /// 获取条目元数据失败
    #[error("cannot stat {path}: {source}")]
    Stat { path: String, source: io::Error },
    /// 修改时间无法表示为 UTC 日历时间
    #[error("mtime of {path} is out of the representable range")]
    Time { path: String },
}

/// 从 `start_path` 开始递归读取一棵目录树, 返回其根节点.
///
/// 目录内的 stat 和子目录的打开都是相对已打开的目录 fd 进行的
/// (`fstatat`/`openat`), 避免列出名称和读取元数据之间的 TOCTOU 竞争;
/// 符号链接以自身类型记录, 不会被跟随 (`AT_SYMLINK_NOFOLLOW`).
///
/// `.` 和 `..` 会被跳过. 每层目录的 fd 在该层递归返回前关闭,
/// fd 用量只和递归深度有关, 和树的大小无关.
pub fn walk(start_path: impl AsRef<Path>) -> Result<RcDirNode, Error> {
    let start_path = start_path.as_ref();
    log::debug!("walking {}", start_path.display());
    access(start_path, Access::READ_OK).map_err(|e| Error::Access {
        path: start_path.display().to_string(),
        source: e.into(),
    })?;
    let fd = openat(
        CWD,
        start_path,
        OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| Error::OpenDir {
        path: start_path.display().to_string(),
        source: e.into(),
    })?;
    let root = RcDirNode::new_root();
    read_dir(&root, fd)?;
    Ok(root)
}

/// 读取 `fd` 对应目录的全部条目到 `node`, 并递归读取子目录.
///
/// 持有 `fd` 的所有权, 无论成功还是出错返回, fd 都随作用域关闭.
fn read_dir(node: &RcDirNode, fd: OwnedFd) -> Result<(), Error> {
    let open_err = |e: rustix::io::Errno| Error::OpenDir {
        path: node.full_path(),
        source: e.into(),
    };
    let dir = Dir::read_from(&fd).map_err(open_err)?;
    for dent in dir {
        let dent = dent.map_err(open_err)?;
        let name = dent.file_name();
        if name.to_bytes() == b"." || name.to_bytes() == b".." {
            continue;
        }
        let stat = statat(&fd, name, AtFlags::SYMLINK_NOFOLLOW).map_err(|e| Error::Stat {
            path: format!("{}{}", node.full_path(), name.to_string_lossy()),
            source: e.into(),
        })?;
        let kind = entry_kind(FileType::from_raw_mode(stat.st_mode as _));
        let size = if kind.is_dir() { 0 } else { stat.st_size as u64 };
        let mtime = DateTime::from_timestamp(stat.st_mtime as i64, stat.st_mtime_nsec as u32)
            .ok_or_else(|| Error::Time {
                path: format!("{}{}", node.full_path(), name.to_string_lossy()),
            })?;
        let child = node.insert(name.to_string_lossy(), kind, size, mtime);
        if let Some(child) = child {
            // 子目录同样相对当前目录 fd 打开
            let sub = openat(
                &fd,
                name,
                OFlags::RDONLY | OFlags::DIRECTORY | OFlags::NOFOLLOW | OFlags::CLOEXEC,
                Mode::empty(),
            )
            .map_err(|e| Error::OpenDir {
                path: format!("{}{}", node.full_path(), name.to_string_lossy()),
                source: e.into(),
            })?;
            read_dir(&child, sub)?;
        }
    }
    Ok(())
}

/// stat 得到的文件类型到 `d_type` 风格编码的映射.
fn entry_kind(file_type: FileType) -> EntryKind {
    match file_type {
        FileType::RegularFile => EntryKind::File,
        FileType::Directory => EntryKind::Directory,
        FileType::Symlink => EntryKind::Symlink,
        FileType::Fifo => EntryKind::Fifo,
        FileType::Socket => EntryKind::Socket,
        FileType::CharacterDevice => EntryKind::CharDevice,
        FileType::BlockDevice => EntryKind::BlockDevice,
        FileType::Unknown => EntryKind::Unknown,
    }
}
