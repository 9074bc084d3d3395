//! Conversion between LeetCode-style level-order lists and binary trees.
//!
//! Both directions walk the tree breadth-first with an explicit queue. Clone,
//! equality and drop are iterative too, so skewed trees of any depth are safe.

use std::collections::VecDeque;
use std::fmt;

use crate::Value;

pub struct TreeNode {
    pub val: Value,
    pub left: Option<Box<TreeNode>>,
    pub right: Option<Box<TreeNode>>,
}

impl TreeNode {
    pub fn new(val: Value) -> Self {
        Self {
            val,
            left: None,
            right: None,
        }
    }

    /// Number of nodes reachable from this node, including itself.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.left.as_deref());
            stack.extend(node.right.as_deref());
        }
        count
    }
}

impl Clone for TreeNode {
    fn clone(&self) -> Self {
        // Breadth-first numbering puts every child after its parent, so
        // rebuilding in reverse always finds the children already built.
        let mut nodes = vec![self];
        let mut links = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            let node = nodes[i];
            let left = node.left.as_deref().map(|child| {
                nodes.push(child);
                nodes.len() - 1
            });
            let right = node.right.as_deref().map(|child| {
                nodes.push(child);
                nodes.len() - 1
            });
            links.push((left, right));
            i += 1;
        }

        let mut built: Vec<Option<Box<TreeNode>>> = Vec::with_capacity(nodes.len());
        built.resize_with(nodes.len(), || None);
        for idx in (1..nodes.len()).rev() {
            let (left, right) = links[idx];
            let node = TreeNode {
                val: nodes[idx].val.clone(),
                left: left.and_then(|j| built[j].take()),
                right: right.and_then(|j| built[j].take()),
            };
            built[idx] = Some(Box::new(node));
        }

        let (left, right) = links[0];
        TreeNode {
            val: self.val.clone(),
            left: left.and_then(|j| built[j].take()),
            right: right.and_then(|j| built[j].take()),
        }
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.val != b.val {
                return false;
            }
            for (x, y) in [(&a.left, &b.left), (&a.right, &b.right)] {
                match (x.as_deref(), y.as_deref()) {
                    (Some(x), Some(y)) => stack.push((x, y)),
                    (None, None) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TreeNode")
            .field(&tree_to_list(Some(self)))
            .finish()
    }
}

impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut stack: Vec<Box<TreeNode>> = Vec::new();
        stack.extend(self.left.take());
        stack.extend(self.right.take());
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

/// Decode a level-order list into a tree.
///
/// Slots after the root are consumed in pairs (left, right) for each node in
/// FIFO order. A `Null` consumes its slot without creating a node, and only
/// created nodes get children of their own. Only an empty list yields `None`;
/// a `Null` in the root slot still makes a root node holding `Null`.
pub fn build_tree(values: &[Value]) -> Option<Box<TreeNode>> {
    let (first, rest) = values.split_first()?;

    let mut root = Box::new(TreeNode::new(first.clone()));
    {
        let mut queue: VecDeque<&mut TreeNode> = VecDeque::new();
        queue.push_back(&mut *root);
        let mut slots = rest.chunks(2);

        while let Some(node) = queue.pop_front() {
            let Some(pair) = slots.next() else {
                break;
            };
            let TreeNode { left, right, .. } = node;
            *left = new_child(pair.first());
            *right = new_child(pair.get(1));

            if let Some(left) = left.as_deref_mut() {
                queue.push_back(left);
            }
            if let Some(right) = right.as_deref_mut() {
                queue.push_back(right);
            }
        }
    }

    Some(root)
}

fn new_child(slot: Option<&Value>) -> Option<Box<TreeNode>> {
    slot.filter(|v| !v.is_null())
        .map(|v| Box::new(TreeNode::new(v.clone())))
}

/// Encode a tree as a level-order list with trailing nulls trimmed.
///
/// Every real node contributes its value and one slot per child, so missing
/// children of real nodes show up as `Null` before trimming.
pub fn tree_to_list(root: Option<&TreeNode>) -> Vec<Value> {
    let Some(root) = root else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut queue = VecDeque::from([Some(root)]);

    while let Some(slot) = queue.pop_front() {
        match slot {
            Some(node) => {
                out.push(node.val.clone());
                queue.push_back(node.left.as_deref());
                queue.push_back(node.right.as_deref());
            }
            None => out.push(Value::Null),
        }
    }

    while out.last().is_some_and(Value::is_null) {
        out.pop();
    }
    out
}
