use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::tree::{EntryKind, RcDirNode};

/// 快照行里修改时间的格式: UTC 日期 + 固定 9 位纳秒小数.
const MTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// 解析快照行失败, 带出错的行号(从 1 开始)和出错的阶段.
#[derive(thiserror::Error, Debug)]
#[error("parse error at line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// 从行尾找不到四个空格分隔的尾部字段
    #[error("reading final four fields")]
    TrailingFields,
    /// 尾部字段无法解析
    #[error("invalid {field} field {value:?}")]
    Field { field: &'static str, value: String },
    /// 祖先目录在之前的行里没有出现过
    #[error("directory {path} not found")]
    MissingAncestor { path: String },
}

/// 深度优先, 按字典序格式化一棵树, 每个条目一行:
///
/// ```text
/// <完整路径> <类型编码> <大小> <YYYY-MM-DD> <HH:MM:SS.nnnnnnnnn>
/// ```
///
/// 文件夹条目的行先于其内容的行输出, 因此输出可以被 [`parse`] 逐行重建.
/// 返回的迭代器是惰性的, 重新调用 `format` 会产生完全相同的序列.
pub fn format(root: &RcDirNode) -> Lines {
    Lines {
        stack: vec![Frame::new(root, 0)],
        path: String::new(),
    }
}

/// [`format`] 返回的行迭代器.
///
/// 用显式的栈做深度优先遍历, `path` 维护当前的路径前缀,
/// 进入子目录时追加名称, 弹出栈帧时截断回原长度.
pub struct Lines {
    stack: Vec<Frame>,
    path: String,
}

struct Frame {
    node: RcDirNode,
    names: std::vec::IntoIter<String>,
    /// 弹出本帧时 path 截断到的长度
    prefix_len: usize,
}

impl Frame {
    fn new(node: &RcDirNode, prefix_len: usize) -> Frame {
        let names: Vec<String> = node.borrow().names().cloned().collect();
        Frame {
            node: RcDirNode::clone(node),
            names: names.into_iter(),
            prefix_len,
        }
    }
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(name) = frame.names.next() else {
                let frame = self.stack.pop()?;
                self.path.truncate(frame.prefix_len);
                continue;
            };
            let entry = {
                let node = frame.node.borrow();
                node.get(&name).map(|e| (e.kind, e.size, e.mtime, e.node()))
            };
            let Some((kind, size, mtime, child)) = entry else {
                continue;
            };
            let line = format!(
                "{}{} {} {} {}",
                self.path,
                name,
                kind.code(),
                size,
                mtime.format(MTIME_FORMAT),
            );
            if let Some(child) = child {
                let restore = self.path.len();
                self.path.push_str(&name);
                self.path.push('/');
                self.stack.push(Frame::new(&child, restore));
            }
            return Some(line);
        }
    }
}

/// 从快照行重建一棵树.
///
/// 行内路径可以含有空格, 因此尾部四个字段是从行尾向前数四个空格定位的.
/// 祖先目录必须在其内容之前出现(即 [`format`] 的输出顺序),
/// 乱序的输入会被拒绝而不是修补.
pub fn parse<I>(lines: I) -> Result<RcDirNode, ParseError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let root = RcDirNode::new_root();
    for (idx, line) in lines.into_iter().enumerate() {
        parse_line(&root, line.as_ref(), idx + 1)?;
    }
    Ok(root)
}

/// 同 [`parse`], 但从一个 [`BufRead`] 逐行读取.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<RcDirNode, crate::Error> {
    let root = RcDirNode::new_root();
    for (idx, line) in reader.lines().enumerate() {
        parse_line(&root, &line?, idx + 1)?;
    }
    Ok(root)
}

/// 同 [`parse`], 但直接使用快照文件的路径.
pub fn parse_file(path: impl AsRef<Path>) -> Result<RcDirNode, crate::Error> {
    log::debug!("parsing snapshot file {}", path.as_ref().display());
    parse_reader(BufReader::new(File::open(path)?))
}

fn parse_line(root: &RcDirNode, line: &str, line_no: usize) -> Result<(), ParseError> {
    // 从行尾向前数四个空格, 前面剩下的才是路径
    let bytes = line.as_bytes();
    let mut split = None;
    let mut remain = 4;
    for i in (0..bytes.len()).rev() {
        if bytes[i] == b' ' {
            remain -= 1;
            if remain == 0 {
                split = Some(i);
                break;
            }
        }
    }
    let Some(split) = split else {
        return Err(ParseError {
            line: line_no,
            kind: ParseErrorKind::TrailingFields,
        });
    };
    let (full_path, rest) = (&line[..split], &line[split + 1..]);
    let mut fields = rest.split(' ');
    let (Some(kind_s), Some(size_s), Some(date_s), Some(time_s)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(ParseError {
            line: line_no,
            kind: ParseErrorKind::TrailingFields,
        });
    };

    let field_err = |field: &'static str, value: &str| ParseError {
        line: line_no,
        kind: ParseErrorKind::Field {
            field,
            value: value.to_string(),
        },
    };
    let code: u32 = kind_s.parse().map_err(|_| field_err("type", kind_s))?;
    let size: u64 = size_s.parse().map_err(|_| field_err("size", size_s))?;
    let date: NaiveDate =
        NaiveDate::parse_from_str(date_s, "%Y-%m-%d").map_err(|_| field_err("date", date_s))?;
    let time: NaiveTime = NaiveTime::parse_from_str(time_s, "%H:%M:%S%.9f")
        .map_err(|_| field_err("time", time_s))?;
    let mtime = NaiveDateTime::new(date, time).and_utc();

    // 最后一个 `/` 之前是目录部分, 之后是条目名称
    let (dir_part, name) = match full_path.rfind('/') {
        Some(i) => (&full_path[..i], &full_path[i + 1..]),
        None => ("", full_path),
    };

    // 目录部分逐级在已建好的节点里解析, 不会在这里补建目录
    let mut cur = RcDirNode::clone(root);
    for comp in dir_part.split('/').filter(|c| !c.is_empty()) {
        let next = {
            let node = cur.borrow();
            match node.get(comp) {
                Some(entry) if entry.kind.is_dir() => entry.node(),
                _ => None,
            }
        };
        let Some(next) = next else {
            return Err(ParseError {
                line: line_no,
                kind: ParseErrorKind::MissingAncestor {
                    path: format!("{}{}", cur.full_path(), comp),
                },
            });
        };
        cur = next;
    }
    cur.insert(name, EntryKind::from_code(code), size, mtime);
    Ok(())
}
