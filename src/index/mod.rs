//! In-memory AVL index mapping the rendered value of one field to the file
//! position of the first record that carries it.

use std::cmp::Ordering;

type Link = Option<Box<Node>>;

#[derive(Debug)]
struct Node {
    key: String,
    position: u64,
    height: i32,
    left: Link,
    right: Link,
}

impl Node {
    fn new(key: &str, position: u64) -> Self {
        Self {
            key: key.to_string(),
            position,
            height: 1,
            left: None,
            right: None,
        }
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    fn balance(&self) -> i32 {
        height(&self.left) - height(&self.right)
    }
}

fn height(link: &Link) -> i32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

/// Restores `|balance| <= 1` at `node` after an insertion below it.
fn rebalance(mut node: Box<Node>) -> Box<Node> {
    let balance = node.balance();

    if balance > 1 {
        // Left-right case turns into left-left first.
        if let Some(left) = node.left.take() {
            node.left = Some(if left.balance() < 0 {
                rotate_left(left)
            } else {
                left
            });
        }
        return rotate_right(node);
    }

    if balance < -1 {
        // Right-left case turns into right-right first.
        if let Some(right) = node.right.take() {
            node.right = Some(if right.balance() > 0 {
                rotate_right(right)
            } else {
                right
            });
        }
        return rotate_left(node);
    }

    node
}

fn insert(link: Link, key: &str, position: u64, inserted: &mut bool) -> Box<Node> {
    let Some(mut node) = link else {
        *inserted = true;
        return Box::new(Node::new(key, position));
    };

    match key.cmp(node.key.as_str()) {
        Ordering::Less => node.left = Some(insert(node.left.take(), key, position, inserted)),
        Ordering::Greater => node.right = Some(insert(node.right.take(), key, position, inserted)),
        // Existing keys keep their original position.
        Ordering::Equal => return node,
    }

    node.update_height();
    rebalance(node)
}

fn collect_matching(link: &Link, needle: &str, out: &mut Vec<u64>) {
    if let Some(node) = link {
        collect_matching(&node.left, needle, out);
        if node.key.contains(needle) {
            out.push(node.position);
        }
        collect_matching(&node.right, needle, out);
    }
}

#[derive(Debug, Default)]
pub struct AvlIndex {
    root: Link,
    len: usize,
}

impl AvlIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn height(&self) -> i32 {
        height(&self.root)
    }

    /// Indexes `key` at `position`. Returns `false` and leaves the tree
    /// untouched if the key is already present.
    pub fn insert(&mut self, key: &str, position: u64) -> bool {
        let mut inserted = false;
        self.root = Some(insert(self.root.take(), key, position, &mut inserted));
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Exact match lookup.
    pub fn search(&self, key: &str) -> Option<u64> {
        let mut current = &self.root;
        while let Some(node) = current {
            current = match key.cmp(node.key.as_str()) {
                Ordering::Less => &node.left,
                Ordering::Greater => &node.right,
                Ordering::Equal => return Some(node.position),
            };
        }
        None
    }

    /// Positions of every key containing `needle`, in key order.
    pub fn collect_matching_substring(&self, needle: &str) -> Vec<u64> {
        let mut positions = Vec::new();
        collect_matching(&self.root, needle, &mut positions);
        positions
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Checks heights and balance factors of the whole tree, returning its
    /// height.
    fn check(link: &Link) -> i32 {
        let Some(node) = link else {
            return 0;
        };
        let left = check(&node.left);
        let right = check(&node.right);
        assert!((left - right).abs() <= 1, "unbalanced at {}", node.key);
        assert_eq!(node.height, 1 + left.max(right), "bad height at {}", node.key);
        if let Some(l) = &node.left {
            assert!(l.key < node.key);
        }
        if let Some(r) = &node.right {
            assert!(r.key > node.key);
        }
        node.height
    }

    fn keys(link: &Link, out: &mut Vec<String>) {
        if let Some(node) = link {
            keys(&node.left, out);
            out.push(node.key.clone());
            keys(&node.right, out);
        }
    }

    #[test]
    fn test_ascending_inserts_stay_balanced() {
        let mut index = AvlIndex::new();
        for i in 0..1000 {
            assert!(index.insert(&format!("{i:04}"), i));
            check(&index.root);
        }
        assert_eq!(index.len(), 1000);
        // 1000 nodes fit in an AVL tree of height at most 14.
        assert!(index.height() <= 14);
    }

    #[test]
    fn test_descending_inserts_stay_balanced() {
        let mut index = AvlIndex::new();
        for i in (0..500).rev() {
            index.insert(&i.to_string(), i);
        }
        check(&index.root);
        assert_eq!(index.len(), 500);
    }

    #[test]
    fn test_zig_zag_rotations() {
        // Left-right then right-left cases.
        for order in [["c", "a", "b"], ["a", "c", "b"]] {
            let mut index = AvlIndex::new();
            for (pos, key) in order.iter().enumerate() {
                index.insert(key, pos as u64);
            }
            assert_eq!(index.root.as_ref().unwrap().key, "b");
            assert_eq!(check(&index.root), 2);
        }
    }

    #[test]
    fn test_pseudo_random_inserts() {
        let mut index = AvlIndex::new();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for pos in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            index.insert(&(seed % 997).to_string(), pos);
        }
        check(&index.root);

        let mut sorted = Vec::new();
        keys(&index.root, &mut sorted);
        assert_eq!(sorted.len(), index.len());
        assert!(sorted.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_duplicate_keeps_first_position() {
        let mut index = AvlIndex::new();
        assert!(index.insert("alice", 1024));
        assert!(!index.insert("alice", 2048));
        assert_eq!(index.search("alice"), Some(1024));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_search() {
        let mut index = AvlIndex::new();
        for (pos, key) in ["m", "d", "x", "a", "f"].iter().enumerate() {
            index.insert(key, pos as u64 * 10);
        }
        assert_eq!(index.search("f"), Some(40));
        assert_eq!(index.search("x"), Some(20));
        assert_eq!(index.search("z"), None);
        assert_eq!(AvlIndex::new().search("a"), None);
    }

    #[test]
    fn test_substring_in_key_order() {
        let mut index = AvlIndex::new();
        index.insert("Malice", 3);
        index.insert("Bob", 2);
        index.insert("Alice", 1);
        index.insert("Charlie", 4);
        assert_eq!(index.collect_matching_substring("lic"), vec![1, 3]);
        assert_eq!(index.collect_matching_substring("li"), vec![1, 4, 3]);
        assert!(index.collect_matching_substring("zed").is_empty());
    }
}
