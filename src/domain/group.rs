// ==========================================
// 高校排课系统 - 班级树与小组
// ==========================================
// 职责: 班级树的 arena 模型与遍历原语、子组划分
// 约定: number=0 / numerator=denominator=0 表示"合班"伪节点（整体，不是划分）
// 红线: 遍历一律为显式迭代，不做递归 ORM 式查询
// ==========================================

use crate::domain::types::{GroupId, GroupStreamId, SubGroupId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ==========================================
// GroupNode - 班级节点
// ==========================================
// 根节点 parent=None；group_stream 为存储+下传的缓存字段
// （派生读取的替代方案以写时传播换读时上溯，见设计文档）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    pub id: GroupId,
    pub group_stream: GroupStreamId,
    pub parent: Option<GroupId>,
    /// 0 = 合班（整个上级的并集），1..=8 = 显式划分序号
    pub number: u16,
}

impl GroupNode {
    /// 是否为合班伪节点
    pub fn is_union(&self) -> bool {
        self.number == 0
    }
}

// ==========================================
// SubGroup - 小组
// ==========================================
// numerator/denominator 同为 0 表示整班；否则 numerator ∈ 1..=denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroup {
    pub id: SubGroupId,
    pub group: GroupId,
    pub numerator: u16,
    pub denominator: u16,
}

impl SubGroup {
    /// 是否为整班小组
    pub fn is_union(&self) -> bool {
        self.numerator == 0 && self.denominator == 0
    }

    /// 是否为同一划分方案中的同一份
    pub fn same_split(&self, other: &SubGroup) -> bool {
        self.numerator == other.numerator && self.denominator == other.denominator
    }
}

// ==========================================
// GroupArena - 班级树 arena
// ==========================================
// 扁平节点表，整型主键寻址；树结构仅通过 parent 链表达
#[derive(Debug, Clone, Default)]
pub struct GroupArena {
    nodes: BTreeMap<GroupId, GroupNode>,
}

impl GroupArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// 装入节点（来自存储层的已持久化数据，不在此校验）
    pub fn insert(&mut self, node: GroupNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn get(&self, id: GroupId) -> Option<&GroupNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupNode> {
        self.nodes.values()
    }

    /// 指定年级组下的全部节点
    pub fn stream_groups(&self, stream: GroupStreamId) -> Vec<&GroupNode> {
        self.nodes
            .values()
            .filter(|n| n.group_stream == stream)
            .collect()
    }

    /// 直接子节点
    pub fn children(&self, id: GroupId) -> Vec<&GroupNode> {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(id))
            .collect()
    }

    /// 祖先链，自底向上（直接上级在前，根在后）
    ///
    /// 对损坏数据（parent 成环）有防护：遇到已访问节点即停止。
    pub fn ancestors(&self, id: GroupId) -> Vec<GroupId> {
        let mut result = Vec::new();
        let mut visited: HashSet<GroupId> = HashSet::new();
        visited.insert(id);

        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                break;
            }
            result.push(parent_id);
            current = self.nodes.get(&parent_id).and_then(|n| n.parent);
        }
        result
    }

    /// 以 id 为根的全部后代（不含自身），显式栈迭代
    pub fn descendants(&self, id: GroupId) -> Vec<GroupId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            for child in self.children(current) {
                result.push(child.id);
                stack.push(child.id);
            }
        }
        result
    }

    /// self 是否为 other 的祖先（沿 other 的 parent 链上溯能到达 self）
    pub fn is_ancestor_of(&self, id: GroupId, other: GroupId) -> bool {
        self.ancestors(other).contains(&id)
    }

    /// 子树最大深度: 叶子为 0，否则 1 + 子节点最大深度
    pub fn max_subtree_depth(&self, id: GroupId) -> u32 {
        let mut max_depth = 0u32;
        let mut stack = vec![(id, 0u32)];
        while let Some((current, depth)) = stack.pop() {
            if depth > max_depth {
                max_depth = depth;
            }
            for child in self.children(current) {
                stack.push((child.id, depth + 1));
            }
        }
        max_depth
    }

    /// 节点落位后的整树高度: 祖先数 + 1 + 子树最大深度
    pub fn occupied_height(&self, id: GroupId) -> u32 {
        self.ancestors(id).len() as u32 + 1 + self.max_subtree_depth(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, stream: i64, parent: Option<i64>, number: u16) -> GroupNode {
        GroupNode {
            id: GroupId(id),
            group_stream: GroupStreamId(stream),
            parent: parent.map(GroupId),
            number,
        }
    }

    /// 三层树: 1 ← 2 ← 4, 1 ← 3
    fn build_arena() -> GroupArena {
        let mut arena = GroupArena::new();
        arena.insert(node(1, 10, None, 0));
        arena.insert(node(2, 10, Some(1), 1));
        arena.insert(node(3, 10, Some(1), 2));
        arena.insert(node(4, 10, Some(2), 1));
        arena
    }

    #[test]
    fn test_ancestors_leaf_first() {
        let arena = build_arena();
        assert_eq!(arena.ancestors(GroupId(4)), vec![GroupId(2), GroupId(1)]);
        assert_eq!(arena.ancestors(GroupId(1)), Vec::<GroupId>::new());
    }

    #[test]
    fn test_descendants() {
        let arena = build_arena();
        let mut desc = arena.descendants(GroupId(1));
        desc.sort();
        assert_eq!(desc, vec![GroupId(2), GroupId(3), GroupId(4)]);
        assert!(arena.descendants(GroupId(4)).is_empty());
    }

    #[test]
    fn test_is_ancestor_of() {
        let arena = build_arena();
        assert!(arena.is_ancestor_of(GroupId(1), GroupId(4)));
        assert!(arena.is_ancestor_of(GroupId(2), GroupId(4)));
        assert!(!arena.is_ancestor_of(GroupId(3), GroupId(4)));
        assert!(!arena.is_ancestor_of(GroupId(4), GroupId(1)));
    }

    #[test]
    fn test_max_subtree_depth() {
        let arena = build_arena();
        assert_eq!(arena.max_subtree_depth(GroupId(1)), 2);
        assert_eq!(arena.max_subtree_depth(GroupId(2)), 1);
        assert_eq!(arena.max_subtree_depth(GroupId(4)), 0);
    }

    #[test]
    fn test_occupied_height() {
        let arena = build_arena();
        // 根: 0 祖先 + 1 + 深度 2 = 3
        assert_eq!(arena.occupied_height(GroupId(1)), 3);
        // 叶子: 2 祖先 + 1 + 0 = 3
        assert_eq!(arena.occupied_height(GroupId(4)), 3);
    }

    #[test]
    fn test_ancestors_cycle_guard() {
        // 损坏数据: 2 ↔ 3 成环，遍历必须终止
        let mut arena = GroupArena::new();
        arena.insert(node(2, 10, Some(3), 1));
        arena.insert(node(3, 10, Some(2), 2));
        let ancestors = arena.ancestors(GroupId(2));
        assert!(ancestors.len() <= 2);
    }

    #[test]
    fn test_subgroup_union() {
        let union = SubGroup {
            id: SubGroupId(1),
            group: GroupId(1),
            numerator: 0,
            denominator: 0,
        };
        let half = SubGroup {
            id: SubGroupId(2),
            group: GroupId(1),
            numerator: 1,
            denominator: 2,
        };
        assert!(union.is_union());
        assert!(!half.is_union());
        assert!(!union.same_split(&half));
    }
}
