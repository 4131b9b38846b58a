use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};

/// 文件(夹)条目的类型, 对应 POSIX dirent 的 `d_type` 整数编码.
///
/// 编码不在已知集合内的值保存在 [`Other`](EntryKind::Other) 中,
/// 保证 `from_code(code()) == self`, 从而快照解析能精确还原类型编码.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// DT_UNKNOWN
    Unknown,
    /// DT_FIFO
    Fifo,
    /// DT_CHR
    CharDevice,
    /// DT_DIR
    Directory,
    /// DT_BLK
    BlockDevice,
    /// DT_REG
    File,
    /// DT_LNK
    Symlink,
    /// DT_SOCK
    Socket,
    /// 未识别的类型编码
    Other(u32),
}

impl EntryKind {
    /// 返回类型的整数编码.
    pub fn code(self) -> u32 {
        match self {
            EntryKind::Unknown => 0,
            EntryKind::Fifo => 1,
            EntryKind::CharDevice => 2,
            EntryKind::Directory => 4,
            EntryKind::BlockDevice => 6,
            EntryKind::File => 8,
            EntryKind::Symlink => 10,
            EntryKind::Socket => 12,
            EntryKind::Other(code) => code,
        }
    }

    /// 从整数编码还原类型.
    pub fn from_code(code: u32) -> EntryKind {
        match code {
            0 => EntryKind::Unknown,
            1 => EntryKind::Fifo,
            2 => EntryKind::CharDevice,
            4 => EntryKind::Directory,
            6 => EntryKind::BlockDevice,
            8 => EntryKind::File,
            10 => EntryKind::Symlink,
            12 => EntryKind::Socket,
            code => EntryKind::Other(code),
        }
    }

    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }
}

/// 一个 [`Entry`] 记录了一个文件(夹)的元数据.
///
/// 文件夹条目在创建时同时创建并持有其子节点 [`DirNode`],
/// 非文件夹条目没有子节点.
#[derive(Debug)]
pub struct Entry {
    /// 条目类型
    pub kind: EntryKind,
    /// 大小, 文件夹恒为 0
    pub size: u64,
    /// 修改时间, 统一转换为 UTC
    pub mtime: DateTime<Utc>,
    /// 文件夹条目对应的子节点
    node: Option<RcDirNode>,
}

impl Entry {
    /// 返回子节点的一个强引用, 非文件夹条目返回 None.
    pub fn node(&self) -> Option<RcDirNode> {
        self.node.as_ref().map(RcDirNode::clone)
    }
}

impl PartialEq for Entry {
    /// 按 (类型, 大小, 修改时间) 以及子节点的递归内容比较, 不比较节点指针.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.size == other.size
            && self.mtime == other.mtime
            && self.node == other.node
    }
}

impl Eq for Entry {}

/// 目录树中的一层: 一个以名称为键, 按字典序迭代的条目表,
/// 加上指向父节点的弱引用.
///
/// 树由 [`walk`](crate::walk()) 或快照解析一次性构建,
/// 此后只会被 [`remove_common`](crate::remove_common) 收缩, 不做其他修改.
#[derive(Debug)]
pub struct DirNode {
    /// 本节点在父节点条目表中的名称, 根节点为空.
    name: String,
    /// 父节点的弱引用, 根节点为悬空引用.
    parent: Weak<RefCell<DirNode>>,
    entries: BTreeMap<String, Entry>,
}

impl DirNode {
    /// 尝试获取父节点的强引用.
    pub fn parent(&self) -> Option<RcDirNode> {
        self.parent.upgrade().map(RcDirNode)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// 按字典序迭代条目名称.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// 按字典序迭代 (名称, 条目).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    /// 从根节点往下拼接各级名称得到本节点的完整路径,
    /// 每级名称后跟一个 `/`, 根节点为空字符串.
    pub fn full_path(&self) -> String {
        let mut path = String::new();
        self.build_full_path(&mut path);
        path
    }

    fn build_full_path(&self, path: &mut String) {
        if let Some(parent) = self.parent.upgrade() {
            parent.borrow().build_full_path(path);
            path.push_str(&self.name);
            path.push('/');
        }
    }
}

impl PartialEq for DirNode {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for DirNode {}

/// 可以共享持有 [`DirNode`] 的引用计数类型.
pub struct RcDirNode(Rc<RefCell<DirNode>>);

impl RcDirNode {
    /// 创建一个空的根节点, 没有父节点也没有名称.
    pub fn new_root() -> RcDirNode {
        RcDirNode(Rc::new(RefCell::new(DirNode {
            name: String::new(),
            parent: Weak::new(),
            entries: BTreeMap::new(),
        })))
    }

    /// 在本节点下插入一个条目.
    ///
    /// 如果 `kind` 是文件夹, 同时创建一个空的子节点,
    /// 双向链接后返回其强引用; 否则返回 None.
    /// 同名条目会被整体替换.
    pub fn insert(
        &self,
        name: impl Into<String>,
        kind: EntryKind,
        size: u64,
        mtime: DateTime<Utc>,
    ) -> Option<RcDirNode> {
        let name = name.into();
        let node = kind.is_dir().then(|| {
            RcDirNode(Rc::new(RefCell::new(DirNode {
                name: name.clone(),
                parent: Rc::downgrade(&self.0),
                entries: BTreeMap::new(),
            })))
        });
        let child = node.as_ref().map(RcDirNode::clone);
        self.0
            .borrow_mut()
            .entries
            .insert(name, Entry { kind, size, mtime, node });
        child
    }

    /// 见 [`DirNode::full_path`].
    pub fn full_path(&self) -> String {
        self.0.borrow().full_path()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl Clone for RcDirNode {
    fn clone(&self) -> Self {
        RcDirNode(Rc::clone(&self.0))
    }
}

impl PartialEq for RcDirNode {
    fn eq(&self, other: &Self) -> bool {
        self.0.borrow().eq(&other.0.borrow())
    }
}

impl Eq for RcDirNode {}

impl Debug for RcDirNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rc")?; // 在结构体名称前面加上 Rc
        self.0.borrow().fmt(f)
    }
}

impl std::fmt::Display for RcDirNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_path())
    }
}

impl Deref for RcDirNode {
    type Target = Rc<RefCell<DirNode>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
