// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Cursors
//!
//! A [`Cursor`] is a root-first ancestry path from a compilation unit down
//! to a focus node. Cursors clone `Arc` handles rather than borrowing, so
//! they never extend a node's lifetime and stay cheap to copy - but they are
//! only meaningful for the exact tree version they were built against.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::tree::{Kind, NodeId, Tree};

type Path = SmallVec<[Arc<Tree>; 8]>;

/// Non-empty root-first path; the head is always a [`Kind::Unit`].
#[derive(Debug, Clone)]
pub struct Cursor {
    path: Path,
}

impl Cursor {
    /// Build the path from `root` (which must be a compilation unit) to the
    /// node with identity `id`. Returns `None` when the root is not a unit
    /// or the id is not in the tree.
    #[must_use]
    pub fn to(root: &Arc<Tree>, id: NodeId) -> Option<Self> {
        if root.kind() != Kind::Unit {
            return None;
        }
        let mut path = Path::new();
        if search(root, id, &mut path) {
            Some(Self { path })
        } else {
            None
        }
    }

    /// The node the cursor points at.
    #[must_use]
    pub fn focus(&self) -> &Arc<Tree> {
        &self.path[self.path.len() - 1]
    }

    /// The compilation unit at the head of the path.
    #[must_use]
    pub fn unit(&self) -> &Arc<Tree> {
        &self.path[0]
    }

    /// Length of the path, focus included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Root-first view of the whole path.
    #[must_use]
    pub fn nodes(&self) -> &[Arc<Tree>] {
        &self.path
    }

    /// The cursor one step shallower, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.path.len() <= 1 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].iter().cloned().collect(),
        })
    }

    /// The nearest strict ancestor satisfying `pred`, as a cursor.
    #[must_use]
    pub fn drop_parent_until(&self, pred: impl Fn(&Tree) -> bool) -> Option<Self> {
        let mut len = self.path.len();
        while len > 1 {
            len -= 1;
            if pred(&self.path[len - 1]) {
                return Some(Self {
                    path: self.path[..len].iter().cloned().collect(),
                });
            }
        }
        None
    }

    /// The nearest node of the given variant, the focus included.
    #[must_use]
    pub fn first_enclosing(&self, kind: Kind) -> Option<&Arc<Tree>> {
        self.path.iter().rev().find(|n| n.kind() == kind)
    }

    /// Whether any node on the path carries the given identity.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.path.iter().any(|n| n.id() == id)
    }

    /// The cursor shortened to its first `len` nodes.
    pub(crate) fn truncated(&self, len: usize) -> Self {
        debug_assert!(len >= 1 && len <= self.path.len());
        Self {
            path: self.path[..len].iter().cloned().collect(),
        }
    }
}

fn search(node: &Arc<Tree>, id: NodeId, path: &mut Path) -> bool {
    path.push(node.clone());
    if node.id() == id {
        return true;
    }
    for child in node.children() {
        if search(child, id, path) {
            return true;
        }
    }
    path.pop();
    false
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::{JavaParser, SourceParser};
    use crate::tree::descendants;

    fn parse(source: &str) -> Arc<Tree> {
        let mut units = JavaParser::new().parse(source).expect("host should parse");
        units.remove(0)
    }

    fn find(root: &Arc<Tree>, kind: Kind, text: &str) -> Arc<Tree> {
        descendants(root)
            .find(|n| n.kind() == kind && n.print().contains(text))
            .expect("node should exist")
    }

    #[test]
    fn test_cursor_path_and_depth() {
        let unit = parse("class A { void m() { int x = 1; } }");
        let stmt = find(&unit, Kind::VarDecls, "int x");
        let cursor = Cursor::to(&unit, stmt.id()).expect("path should resolve");
        // unit > class > class body > method > method body > statement
        assert_eq!(cursor.depth(), 6);
        assert_eq!(cursor.focus().id(), stmt.id());
        assert_eq!(cursor.unit().id(), unit.id());
        assert!(cursor.contains(unit.id()));
        assert!(!cursor.contains(NodeId::fresh()));
    }

    #[test]
    fn test_parent_walks_to_root() {
        let unit = parse("class A { void m() { int x = 1; } }");
        let stmt = find(&unit, Kind::VarDecls, "int x");
        let mut cursor = Cursor::to(&unit, stmt.id()).expect("path should resolve");
        let mut steps = 0;
        while let Some(parent) = cursor.parent() {
            cursor = parent;
            steps += 1;
        }
        assert_eq!(steps, 5);
        assert_eq!(cursor.focus().kind(), Kind::Unit);
    }

    #[test]
    fn test_first_enclosing_and_drop_parent_until() {
        let unit = parse("class A { void m() { int x = 1; } }");
        let stmt = find(&unit, Kind::VarDecls, "int x");
        let cursor = Cursor::to(&unit, stmt.id()).expect("path should resolve");

        assert_eq!(
            cursor.first_enclosing(Kind::Unit).map(|n| n.id()),
            Some(unit.id())
        );
        assert_eq!(
            cursor.first_enclosing(Kind::Method).map(|n| n.kind()),
            Some(Kind::Method)
        );

        let method = cursor
            .drop_parent_until(|n| n.kind() == Kind::Method)
            .expect("method ancestor");
        assert_eq!(method.focus().kind(), Kind::Method);
        assert!(method.depth() < cursor.depth());
    }

    #[test]
    fn test_to_rejects_unknown_id_and_non_unit_root() {
        let unit = parse("class A {}");
        assert!(Cursor::to(&unit, NodeId::fresh()).is_none());
        let class = find(&unit, Kind::Class, "class A");
        assert!(Cursor::to(&class, class.id()).is_none());
    }
}
