//! Height-balanced ordered map (AVL tree).
//!
//! Nodes own their children through `Option<Box<Node>>`. Every structural
//! mutation recomputes cached heights on the way back to the root and restores
//! `|height(left) - height(right)| <= 1` with single or double rotations.
//!
//! Insert and delete choose rotations differently:
//!
//! - **Insert** looks at which way the new key went below the unbalanced
//!   node's child (left-left, right-right, left-right, right-left).
//! - **Delete** looks at the child's balance factor and takes a single
//!   rotation whenever that balance is zero (`>= 0` / `<= 0`).
//!
//! Both rules produce valid AVL trees, but they do not produce the same shape
//! for the same key set, and downstream enumeration order ties depend on it.

use std::cmp::Ordering;
use std::mem;

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Box<Self> {
        Box::new(Self {
            key,
            value,
            left: None,
            right: None,
            height: 1,
        })
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    fn balance(&self) -> i64 {
        i64::from(height(&self.left)) - i64::from(height(&self.right))
    }
}

fn height<K, V>(link: &Link<K, V>) -> u32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn balance_of<K, V>(link: &Link<K, V>) -> i64 {
    link.as_ref().map_or(0, |node| node.balance())
}

fn rotate_left<K, V>(mut z: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let Some(mut y) = z.right.take() else {
        return z;
    };
    z.right = y.left.take();
    z.update_height();
    y.left = Some(z);
    y.update_height();
    y
}

fn rotate_right<K, V>(mut y: Box<Node<K, V>>) -> Box<Node<K, V>> {
    let Some(mut x) = y.left.take() else {
        return y;
    };
    y.left = x.right.take();
    y.update_height();
    x.right = Some(y);
    x.update_height();
    x
}

/// `below_child` is the direction the inserted key took at the child on the
/// insertion path, i.e. the outcome of comparing the key with the child's key.
fn rebalance_after_insert<K, V>(
    mut node: Box<Node<K, V>>,
    below_child: Option<Side>,
) -> Box<Node<K, V>> {
    node.update_height();
    let balance = node.balance();

    if balance > 1 {
        match below_child {
            Some(Side::Left) => return rotate_right(node),
            Some(Side::Right) => {
                node.left = node.left.take().map(rotate_left);
                return rotate_right(node);
            }
            None => {}
        }
    } else if balance < -1 {
        match below_child {
            Some(Side::Right) => return rotate_left(node),
            Some(Side::Left) => {
                node.right = node.right.take().map(rotate_right);
                return rotate_left(node);
            }
            None => {}
        }
    }
    node
}

fn rebalance_after_delete<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    node.update_height();
    let balance = node.balance();

    if balance > 1 {
        if balance_of(&node.left) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if balance_of(&node.right) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

fn insert_node<K: Ord, V>(
    link: Link<K, V>,
    key: K,
    value: V,
    replaced: &mut Option<V>,
) -> (Box<Node<K, V>>, Option<Side>) {
    let Some(mut node) = link else {
        return (Node::leaf(key, value), None);
    };

    let (side, below_child) = match key.cmp(&node.key) {
        Ordering::Less => {
            let (child, below) = insert_node(node.left.take(), key, value, replaced);
            node.left = Some(child);
            (Side::Left, below)
        }
        Ordering::Greater => {
            let (child, below) = insert_node(node.right.take(), key, value, replaced);
            node.right = Some(child);
            (Side::Right, below)
        }
        Ordering::Equal => {
            *replaced = Some(mem::replace(&mut node.value, value));
            return (node, None);
        }
    };

    // An in-place overwrite leaves every height untouched.
    if replaced.is_some() {
        return (node, Some(side));
    }
    (rebalance_after_insert(node, below_child), Some(side))
}

fn delete_node<K: Ord, V>(link: Link<K, V>, key: &K, removed: &mut Option<V>) -> Link<K, V> {
    let mut node = link?;

    match key.cmp(&node.key) {
        Ordering::Less => node.left = delete_node(node.left.take(), key, removed),
        Ordering::Greater => node.right = delete_node(node.right.take(), key, removed),
        Ordering::Equal => {
            let Node {
                value, left, right, ..
            } = *node;
            *removed = Some(value);
            return match (left, right) {
                (None, right) => right,
                (left, None) => left,
                (Some(left), Some(right)) => {
                    let (rest, mut successor) = take_min(right);
                    successor.left = Some(left);
                    successor.right = rest;
                    Some(rebalance_after_delete(successor))
                }
            };
        }
    }

    if removed.is_none() {
        return Some(node);
    }
    Some(rebalance_after_delete(node))
}

/// Detaches the minimum node of a subtree, rebalancing every node on the path.
fn take_min<K, V>(mut node: Box<Node<K, V>>) -> (Link<K, V>, Box<Node<K, V>>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance_after_delete(node)), min)
        }
    }
}

/// Ordered key/value map backed by an AVL tree.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<K: Ord, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`.
    ///
    /// An existing key keeps its node and gets the new value in place; the
    /// previous value is returned and the tree shape does not change.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut replaced = None;
        let (root, _) = insert_node(self.root.take(), key, value, &mut replaced);
        self.root = Some(root);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    /// Removes `key`, returning its value. A node with two children takes the
    /// in-order successor's place.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        let mut removed = None;
        self.root = delete_node(self.root.take(), key, &mut removed);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Replaces the value at an existing key. Returns `false` (and does
    /// nothing) when the key is absent. Never restructures the tree.
    pub fn update(&mut self, key: &K, value: V) -> bool {
        let mut link = self.root.as_deref_mut();
        while let Some(node) = link {
            match key.cmp(&node.key) {
                Ordering::Less => link = node.left.as_deref_mut(),
                Ordering::Greater => link = node.right.as_deref_mut(),
                Ordering::Equal => {
                    node.value = value;
                    return true;
                }
            }
        }
        false
    }

    pub fn lookup(&self, key: &K) -> Option<&V> {
        let mut link = self.root.as_deref();
        while let Some(node) = link {
            match key.cmp(&node.key) {
                Ordering::Less => link = node.left.as_deref(),
                Ordering::Greater => link = node.right.as_deref(),
                Ordering::Equal => return Some(&node.value),
            }
        }
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.lookup(key).is_some()
    }

    /// Check BST ordering, cached heights, the balance bound and the tracked
    /// node count. Returns a description of the first violation found.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn validate(&self) -> Result<(), String> {
        let mut visited = 0;
        validate_subtree(&self.root, None, None, &mut visited)?;
        if visited != self.len {
            return Err(format!(
                "tracked count {} does not match {visited} reachable nodes",
                self.len
            ));
        }
        Ok(())
    }
}

impl<K, V> OrderedMap<K, V> {
    /// Total number of nodes.
    pub fn count(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the root node; 0 for an empty map.
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    pub fn ascending(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.as_deref(), self.len, false)
    }

    pub fn descending(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.as_deref(), self.len, true)
    }
}

#[cfg(any(test, feature = "test-helpers"))]
fn validate_subtree<K: Ord, V>(
    link: &Link<K, V>,
    lower: Option<&K>,
    upper: Option<&K>,
    visited: &mut usize,
) -> Result<u32, String> {
    let Some(node) = link else {
        return Ok(0);
    };
    *visited += 1;

    if lower.is_some_and(|bound| node.key <= *bound) || upper.is_some_and(|bound| node.key >= *bound)
    {
        return Err("key out of order relative to an ancestor".to_string());
    }

    let left = validate_subtree(&node.left, lower, Some(&node.key), visited)?;
    let right = validate_subtree(&node.right, Some(&node.key), upper, visited)?;

    if node.height != 1 + left.max(right) {
        return Err(format!(
            "cached height {} differs from computed height {}",
            node.height,
            1 + left.max(right)
        ));
    }
    if left.abs_diff(right) > 1 {
        return Err(format!(
            "subtree heights {left} and {right} violate the balance bound"
        ));
    }
    Ok(node.height)
}

/// In-order iterator over an [`OrderedMap`], ascending or descending.
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
    descending: bool,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(root: Option<&'a Node<K, V>>, len: usize, descending: bool) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            descending,
            remaining: len,
        };
        iter.push_spine(root);
        iter
    }

    fn push_spine(&mut self, mut link: Option<&'a Node<K, V>>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = if self.descending {
                node.right.as_deref()
            } else {
                node.left.as_deref()
            };
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let next = if self.descending {
            node.left.as_deref()
        } else {
            node.right.as_deref()
        };
        self.push_spine(next);
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a OrderedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.ascending()
    }
}
