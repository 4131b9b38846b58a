use crate::tree::RcDirNode;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// 文件夹条目缺少子节点, 这属于树结构不变量被破坏, 不可恢复
    #[error("missing directory node for {path}")]
    MissingDirNode { path: String },
}

/// 原地删除两棵树中相同的条目, 只保留差异.
///
/// 对两边同名的条目:
/// - 两边都是文件夹: 无条件递归比较子节点(文件夹自身的大小和修改时间
///   不参与比较), 递归返回后各自独立检查 —— 哪边的子节点空了,
///   就从哪边删除该文件夹条目;
/// - 其他情况: 类型, 大小, 修改时间(秒和纳秒)完全一致时从两边删除,
///   否则两边都保留.
///
/// 只出现在一边的条目不会被动过. 算法是确定性且幂等的:
/// 对已经删完的两棵树再调用一次是空操作.
pub fn remove_common(a: &RcDirNode, b: &RcDirNode) -> Result<(), Error> {
    // 先拍下名称列表, 之后的删除就不会影响迭代
    let names: Vec<String> = a.borrow().names().cloned().collect();
    for name in names {
        let Some((a_kind, a_size, a_mtime, a_node)) = ({
            let node = a.borrow();
            node.get(&name).map(|e| (e.kind, e.size, e.mtime, e.node()))
        }) else {
            continue;
        };
        let Some((b_kind, b_size, b_mtime, b_node)) = ({
            let node = b.borrow();
            node.get(&name).map(|e| (e.kind, e.size, e.mtime, e.node()))
        }) else {
            continue;
        };
        if a_kind.is_dir() && b_kind.is_dir() {
            let (Some(a_child), Some(b_child)) = (a_node, b_node) else {
                return Err(Error::MissingDirNode {
                    path: format!("{}{}", a.full_path(), name),
                });
            };
            remove_common(&a_child, &b_child)?;
            if a_child.is_empty() {
                a.borrow_mut().remove(&name);
            }
            if b_child.is_empty() {
                b.borrow_mut().remove(&name);
            }
        } else if a_kind == b_kind && a_size == b_size && a_mtime == b_mtime {
            a.borrow_mut().remove(&name);
            b.borrow_mut().remove(&name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::format;
    use crate::tree::EntryKind;
    use chrono::{DateTime, Utc};

    fn mtime(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    /// A: a/x.txt, a/y.txt; B: a/x.txt, 其中 x.txt 两边完全一致.
    fn worked_example() -> (RcDirNode, RcDirNode) {
        let a = RcDirNode::new_root();
        let a_dir = a.insert("a", EntryKind::Directory, 0, mtime(1)).unwrap();
        a_dir.insert("x.txt", EntryKind::File, 10, mtime(100));
        a_dir.insert("y.txt", EntryKind::File, 20, mtime(200));

        let b = RcDirNode::new_root();
        let b_dir = b.insert("a", EntryKind::Directory, 0, mtime(2)).unwrap();
        b_dir.insert("x.txt", EntryKind::File, 10, mtime(100));
        (a, b)
    }

    #[test]
    fn removes_identical_and_prunes_emptied_dirs() {
        let (a, b) = worked_example();
        remove_common(&a, &b).unwrap();

        // A 一侧: a 非空, 只剩 y.txt
        let a_node = a.borrow();
        let a_dir = a_node.get("a").unwrap().node().unwrap();
        assert_eq!(a_dir.borrow().len(), 1);
        assert!(a_dir.borrow().get("y.txt").is_some());

        // B 一侧: a 被删空后整个剪掉
        assert!(b.is_empty());
    }

    #[test]
    fn is_idempotent() {
        let (a, b) = worked_example();
        remove_common(&a, &b).unwrap();
        let a_lines: Vec<String> = format(&a).collect();
        let b_lines: Vec<String> = format(&b).collect();

        remove_common(&a, &b).unwrap();
        assert_eq!(format(&a).collect::<Vec<String>>(), a_lines);
        assert_eq!(format(&b).collect::<Vec<String>>(), b_lines);
    }

    #[test]
    fn one_sided_entries_are_never_removed() {
        let a = RcDirNode::new_root();
        a.insert("only_a.txt", EntryKind::File, 1, mtime(1));
        let b = RcDirNode::new_root();
        b.insert("only_b.txt", EntryKind::File, 1, mtime(1));
        remove_common(&a, &b).unwrap();
        assert!(a.borrow().get("only_a.txt").is_some());
        assert!(b.borrow().get("only_b.txt").is_some());
    }

    #[test]
    fn recurses_into_dirs_with_differing_attributes() {
        // 文件夹自身的 mtime 不同, 但内容一致: 依然递归并剪空
        let a = RcDirNode::new_root();
        let a_dir = a.insert("d", EntryKind::Directory, 0, mtime(1)).unwrap();
        a_dir.insert("same.txt", EntryKind::File, 5, mtime(50));
        let b = RcDirNode::new_root();
        let b_dir = b.insert("d", EntryKind::Directory, 0, mtime(9)).unwrap();
        b_dir.insert("same.txt", EntryKind::File, 5, mtime(50));

        remove_common(&a, &b).unwrap();
        assert!(a.is_empty());
        assert!(b.is_empty());
    }

    #[test]
    fn mismatched_types_are_kept() {
        let a = RcDirNode::new_root();
        a.insert("x", EntryKind::File, 0, mtime(1));
        let b = RcDirNode::new_root();
        b.insert("x", EntryKind::Symlink, 0, mtime(1));
        remove_common(&a, &b).unwrap();
        assert!(a.borrow().get("x").is_some());
        assert!(b.borrow().get("x").is_some());
    }

    #[test]
    fn mtime_nanos_must_match_exactly() {
        let a = RcDirNode::new_root();
        a.insert(
            "x.txt",
            EntryKind::File,
            3,
            DateTime::from_timestamp(100, 1).unwrap(),
        );
        let b = RcDirNode::new_root();
        b.insert(
            "x.txt",
            EntryKind::File,
            3,
            DateTime::from_timestamp(100, 2).unwrap(),
        );
        remove_common(&a, &b).unwrap();
        assert!(!a.is_empty());
        assert!(!b.is_empty());
    }

    #[test]
    fn nested_dirs_prune_bottom_up() {
        let build = || {
            let root = RcDirNode::new_root();
            let d1 = root.insert("d1", EntryKind::Directory, 0, mtime(1)).unwrap();
            let d2 = d1.insert("d2", EntryKind::Directory, 0, mtime(2)).unwrap();
            d2.insert("leaf.txt", EntryKind::File, 7, mtime(3));
            root
        };
        let (a, b) = (build(), build());
        remove_common(&a, &b).unwrap();
        assert!(a.is_empty());
        assert!(b.is_empty());
    }
}
