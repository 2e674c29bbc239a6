//! Snapshot of a coordination tree.
//!
//! A [`Node`] owns its children. Keys are full slash-separated paths, so a
//! child of `/foo` is keyed `/foo/hints`. The serialized form matches the etcd
//! v2 node shape (`key`, `dir`, `value`, `nodes`).

use serde::{Deserialize, Serialize};

/// A directory or leaf in the coordination tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    /// Full path of this node.
    pub key: String,

    /// Whether this node is a directory.
    #[serde(default)]
    pub dir: bool,

    /// Leaf value. Empty for directories.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    /// Child nodes of a directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

impl Node {
    /// Create a leaf node.
    #[must_use]
    pub fn leaf(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dir: false,
            value: value.into(),
            nodes: Vec::new(),
        }
    }

    /// Create a directory node.
    #[must_use]
    pub fn dir(key: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            key: key.into(),
            dir: true,
            value: String::new(),
            nodes,
        }
    }

    /// Last path segment of the key.
    #[must_use]
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Direct child with the given last path segment.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    /// Locate the descendant (or self) with the given full key.
    ///
    /// Descends one level at a time through children whose key prefixes `key`.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Node> {
        let key = normalize_key(key);
        let mut node = self;
        loop {
            if node.key == key {
                return Some(node);
            }
            node = node.nodes.iter().find(|child| is_ancestor_or_self(&child.key, key))?;
        }
    }

    /// Visit every leaf below this node, depth first.
    pub fn for_each_leaf<'a, E>(
        &'a self,
        f: &mut impl FnMut(&'a Node) -> Result<(), E>,
    ) -> Result<(), E> {
        if !self.dir {
            return f(self);
        }
        for child in &self.nodes {
            child.for_each_leaf(f)?;
        }
        Ok(())
    }

    /// Number of leaves below this node.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        if self.dir {
            self.nodes.iter().map(Node::leaf_count).sum()
        } else {
            1
        }
    }

    /// Insert a leaf at `key` below this directory, creating intermediate
    /// directories. Children are kept ordered by key.
    ///
    /// Returns `false` if `key` is not below this node or collides with an
    /// existing leaf on the path.
    pub fn insert_leaf(&mut self, key: &str, value: impl Into<String>) -> bool {
        let key = normalize_key(key);
        let Some(rest) = relative_to(&self.key, key) else {
            return false;
        };
        if !self.dir || rest.is_empty() {
            return false;
        }

        let mut node = self;
        let mut segments = rest.split('/').filter(|s| !s.is_empty()).peekable();
        while let Some(segment) = segments.next() {
            let child_key = join_key(&node.key, segment);
            let is_last = segments.peek().is_none();

            let idx = match node.nodes.binary_search_by(|n| n.key.as_str().cmp(&child_key)) {
                Ok(idx) => idx,
                Err(idx) => {
                    let child = if is_last {
                        Node::leaf(child_key.clone(), String::new())
                    } else {
                        Node::dir(child_key.clone(), Vec::new())
                    };
                    node.nodes.insert(idx, child);
                    idx
                }
            };

            let child = &mut node.nodes[idx];
            if is_last {
                if child.dir {
                    return false;
                }
                node = child;
                break;
            }
            if !child.dir {
                return false;
            }
            node = child;
        }

        if node.key != key {
            return false;
        }
        node.value = value.into();
        true
    }
}

/// Strip a trailing slash (except for the root `/`).
#[must_use]
pub fn normalize_key(key: &str) -> &str {
    if key.len() > 1 {
        key.strip_suffix('/').unwrap_or(key)
    } else {
        key
    }
}

/// Join a directory key and a child segment.
#[must_use]
pub fn join_key(dir: &str, segment: &str) -> String {
    let dir = normalize_key(dir);
    if dir.ends_with('/') {
        format!("{dir}{segment}")
    } else {
        format!("{dir}/{segment}")
    }
}

/// Path of `key` relative to `dir`, or `None` if `key` is not `dir` or below it.
#[must_use]
pub fn relative_to<'a>(dir: &str, key: &'a str) -> Option<&'a str> {
    let dir = normalize_key(dir);
    let rest = key.strip_prefix(dir)?;
    if rest.is_empty() {
        Some(rest)
    } else if dir.ends_with('/') {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

fn is_ancestor_or_self(ancestor: &str, key: &str) -> bool {
    relative_to(ancestor, key).is_some()
}
