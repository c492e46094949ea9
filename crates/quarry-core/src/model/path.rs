//! Module: model::path
//! Responsibility: hierarchical, lazily materialized attribute paths.
//! Does not own: entity metadata or key-path validation.
//! Boundary: consumed by the expression algebra and the query builder.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

///
/// PathNode
///
/// One arena slot. Children are recorded by index; the parent link is an
/// index as well, so the table never holds a reference cycle.
///

#[derive(Debug)]
struct PathNode {
    name: Option<Rc<str>>,
    key: Rc<str>,
    parent: Option<usize>,
    children: BTreeMap<Rc<str>, usize>,
}

///
/// PathTable
///
/// Append-only arena shared by every path derived from one root.
/// Nodes are never removed; the table lives as long as any handle does.
///

#[derive(Debug, Default)]
struct PathTable {
    nodes: RefCell<Vec<PathNode>>,
}

///
/// AttributePath
///
/// Handle to one node of an attribute-path tree, e.g. `department.name`.
///
/// `child(name)` memoizes: asking the same parent for the same name always
/// yields the same node, so two handles compare equal only when they refer to
/// the same node of the same tree (identity, not textual equality).
///

#[derive(Clone)]
pub struct AttributePath {
    table: Rc<PathTable>,
    index: usize,
}

impl AttributePath {
    /// Create the unnamed root of a new attribute-path tree.
    #[must_use]
    pub fn root() -> Self {
        let table = PathTable::default();
        table.nodes.borrow_mut().push(PathNode {
            name: None,
            key: Rc::from(""),
            parent: None,
            children: BTreeMap::new(),
        });

        Self {
            table: Rc::new(table),
            index: 0,
        }
    }

    /// Return the child named `name`, creating it on first access.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        if let Some(index) = self.node(|node| node.children.get(name).copied()) {
            return self.at(index);
        }

        let mut nodes = self.table.nodes.borrow_mut();
        let index = nodes.len();
        let name: Rc<str> = Rc::from(name);
        let parent_key = &nodes[self.index].key;
        let key: Rc<str> = if parent_key.is_empty() {
            Rc::clone(&name)
        } else {
            Rc::from(format!("{parent_key}.{name}"))
        };

        nodes.push(PathNode {
            name: Some(Rc::clone(&name)),
            key,
            parent: Some(self.index),
            children: BTreeMap::new(),
        });
        nodes[self.index].children.insert(name, index);
        drop(nodes);

        self.at(index)
    }

    /// Dotted key path joining every ancestor segment (`""` for the root).
    #[must_use]
    pub fn key(&self) -> Rc<str> {
        self.node(|node| Rc::clone(&node.key))
    }

    /// Last path segment, or `None` for the root.
    #[must_use]
    pub fn name(&self) -> Option<Rc<str>> {
        self.node(|node| node.name.clone())
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.node(|node| node.parent).map(|index| self.at(index))
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.index == 0
    }

    /// Path segments from the root down, root excluded.
    #[must_use]
    pub fn segments(&self) -> Vec<Rc<str>> {
        let nodes = self.table.nodes.borrow();
        let mut segments = Vec::new();
        let mut cursor = Some(self.index);

        while let Some(index) = cursor {
            let node = &nodes[index];
            if let Some(name) = &node.name {
                segments.push(Rc::clone(name));
            }
            cursor = node.parent;
        }
        segments.reverse();

        segments
    }

    /// Number of nodes materialized in this path's tree, root included.
    #[must_use]
    pub fn materialized_len(&self) -> usize {
        self.table.nodes.borrow().len()
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn node<T>(&self, read: impl FnOnce(&PathNode) -> T) -> T {
        read(&self.table.nodes.borrow()[self.index])
    }

    fn at(&self, index: usize) -> Self {
        Self {
            table: Rc::clone(&self.table),
            index,
        }
    }
}

impl PartialEq for AttributePath {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.table, &other.table) && self.index == other.index
    }
}

impl Eq for AttributePath {}

impl Hash for AttributePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.table).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttributePath").field(&self.key()).finish()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
