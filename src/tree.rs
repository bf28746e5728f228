// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Immutable AST with Stable Identity
//!
//! The tree model for the template engine. Nodes are a tagged [`Tree`] enum
//! with `Arc`-shared children: a rewrite returns a fresh root while aliasing
//! every unchanged subtree, so structural sharing is observable through node
//! identity.
//!
//! ## Key Types
//!
//! - [`Tree`] - The tagged node variant (compilation unit down to literals)
//! - [`Kind`] - The parallel fieldless discriminant, used for ancestor queries
//! - [`NodeId`] - Stable identity, preserved across rewrites
//! - [`Space`] / [`Comment`] - Leading trivia owned by exactly one node
//!
//! ## Identity rules
//!
//! The parser assigns every node a fresh [`NodeId`]. Rewrites that produce a
//! modified copy of a node keep the original id; only genuinely new nodes
//! (reparsed template output) receive new ids. Prefix trivia belongs to
//! exactly one node - when a parsed child is folded into a larger node, its
//! prefix *moves* to the new owner.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Stable unique identity of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Mint a fresh identity. Called by the parser for every produced node.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    Line,
    Block,
}

/// A single comment, with the whitespace that follows it.
///
/// For a line comment the suffix begins with the newline that terminated it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub style: CommentStyle,
    /// Literal text between the delimiters.
    pub text: String,
    pub suffix: String,
}

/// Leading trivia of a node: whitespace followed by an ordered comment list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Space {
    pub whitespace: String,
    pub comments: Vec<Comment>,
}

impl Space {
    pub fn new(whitespace: impl Into<String>) -> Self {
        Self {
            whitespace: whitespace.into(),
            comments: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.whitespace.is_empty() && self.comments.is_empty()
    }

    /// Whether any block comment carries exactly `text` as its payload.
    #[must_use]
    pub fn has_block_comment(&self, text: &str) -> bool {
        self.comments
            .iter()
            .any(|c| c.style == CommentStyle::Block && c.text == text)
    }

    /// A copy with the first block comment matching `text` removed.
    #[must_use]
    pub fn without_block_comment(&self, text: &str) -> Self {
        let mut out = self.clone();
        if let Some(idx) = out
            .comments
            .iter()
            .position(|c| c.style == CommentStyle::Block && c.text == text)
        {
            out.comments.remove(idx);
        }
        out
    }
}

/// Variant discriminant of [`Tree`], for kind queries on cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Unit,
    Import,
    Class,
    Method,
    Block,
    VarDecls,
    Variable,
    Modifier,
    Annotation,
    TypeRef,
    Ident,
    Literal,
    Unary,
    Binary,
    Assign,
    Call,
    FieldAccess,
    Paren,
    ExprStmt,
    Return,
    Empty,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Compilation unit: the root of one parsed source file.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: NodeId,
    /// Owns the file-leading trivia.
    pub prefix: Space,
    pub imports: Vec<Arc<Tree>>,
    pub classes: Vec<Arc<Tree>>,
    /// Trivia between the last declaration and end of file.
    pub eof: Space,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub id: NodeId,
    pub prefix: Space,
    pub is_static: bool,
    /// Dotted path as written, e.g. `java.util.List` or `java.util.*`.
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub id: NodeId,
    pub prefix: Space,
    pub modifiers: Vec<Arc<Tree>>,
    pub name: Arc<Tree>,
    pub body: Arc<Tree>,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub id: NodeId,
    pub prefix: Space,
    pub annotations: Vec<Arc<Tree>>,
    pub modifiers: Vec<Arc<Tree>>,
    /// Absent for constructors.
    pub return_type: Option<Arc<Tree>>,
    pub name: Arc<Tree>,
    /// Each parameter is a single-variable [`VarDecls`].
    pub params: Vec<Arc<Tree>>,
    /// Absent body prints as a `;` stub.
    pub body: Option<Arc<Tree>>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub prefix: Space,
    pub is_static: bool,
    pub statements: Vec<Arc<Tree>>,
    /// Trivia before the closing brace.
    pub end: Space,
}

/// A variable declaration group: `int x = 1, y = 2`.
#[derive(Debug, Clone)]
pub struct VarDecls {
    pub id: NodeId,
    pub prefix: Space,
    pub modifiers: Vec<Arc<Tree>>,
    pub type_ref: Arc<Tree>,
    pub vars: Vec<Arc<Tree>>,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub id: NodeId,
    pub prefix: Space,
    pub name: String,
    pub initializer: Option<Arc<Tree>>,
}

#[derive(Debug, Clone)]
pub struct Modifier {
    pub id: NodeId,
    pub prefix: Space,
    pub keyword: String,
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub id: NodeId,
    pub prefix: Space,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TypeRef {
    pub id: NodeId,
    pub prefix: Space,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Ident {
    pub id: NodeId,
    pub prefix: Space,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Literal {
    pub id: NodeId,
    pub prefix: Space,
    /// Raw source form, quotes included for strings and chars.
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Unary {
    pub id: NodeId,
    pub prefix: Space,
    pub op: String,
    pub expr: Arc<Tree>,
}

#[derive(Debug, Clone)]
pub struct Binary {
    pub id: NodeId,
    pub prefix: Space,
    pub left: Arc<Tree>,
    pub op: String,
    pub right: Arc<Tree>,
}

#[derive(Debug, Clone)]
pub struct Assign {
    pub id: NodeId,
    pub prefix: Space,
    pub target: Arc<Tree>,
    pub value: Arc<Tree>,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub id: NodeId,
    pub prefix: Space,
    pub target: Arc<Tree>,
    pub args: Vec<Arc<Tree>>,
}

#[derive(Debug, Clone)]
pub struct FieldAccess {
    pub id: NodeId,
    pub prefix: Space,
    pub target: Arc<Tree>,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Paren {
    pub id: NodeId,
    pub prefix: Space,
    pub expr: Arc<Tree>,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub id: NodeId,
    pub prefix: Space,
    pub expr: Arc<Tree>,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub id: NodeId,
    pub prefix: Space,
    pub expr: Option<Arc<Tree>>,
}

/// A bare `;` statement or class-body member.
#[derive(Debug, Clone)]
pub struct Empty {
    pub id: NodeId,
    pub prefix: Space,
}

/// A single AST node. Children are `Arc`-shared; see the module docs for the
/// identity and trivia-ownership rules.
#[derive(Debug, Clone)]
pub enum Tree {
    Unit(Unit),
    Import(Import),
    Class(Class),
    Method(Method),
    Block(Block),
    VarDecls(VarDecls),
    Variable(Variable),
    Modifier(Modifier),
    Annotation(Annotation),
    TypeRef(TypeRef),
    Ident(Ident),
    Literal(Literal),
    Unary(Unary),
    Binary(Binary),
    Assign(Assign),
    Call(Call),
    FieldAccess(FieldAccess),
    Paren(Paren),
    ExprStmt(ExprStmt),
    Return(Return),
    Empty(Empty),
}

macro_rules! for_all_variants {
    ($node:expr, $n:ident => $body:expr) => {
        match $node {
            Tree::Unit($n) => $body,
            Tree::Import($n) => $body,
            Tree::Class($n) => $body,
            Tree::Method($n) => $body,
            Tree::Block($n) => $body,
            Tree::VarDecls($n) => $body,
            Tree::Variable($n) => $body,
            Tree::Modifier($n) => $body,
            Tree::Annotation($n) => $body,
            Tree::TypeRef($n) => $body,
            Tree::Ident($n) => $body,
            Tree::Literal($n) => $body,
            Tree::Unary($n) => $body,
            Tree::Binary($n) => $body,
            Tree::Assign($n) => $body,
            Tree::Call($n) => $body,
            Tree::FieldAccess($n) => $body,
            Tree::Paren($n) => $body,
            Tree::ExprStmt($n) => $body,
            Tree::Return($n) => $body,
            Tree::Empty($n) => $body,
        }
    };
}

impl Tree {
    #[must_use]
    pub fn id(&self) -> NodeId {
        for_all_variants!(self, n => n.id)
    }

    #[must_use]
    pub fn prefix(&self) -> &Space {
        for_all_variants!(self, n => &n.prefix)
    }

    pub(crate) fn prefix_mut(&mut self) -> &mut Space {
        for_all_variants!(self, n => &mut n.prefix)
    }

    /// Move the prefix out, leaving an empty one behind. Used by the parser
    /// when a child's trivia is transferred to a new owning node.
    pub(crate) fn take_prefix(&mut self) -> Space {
        std::mem::take(self.prefix_mut())
    }

    /// A copy of this node with a different prefix and the same identity.
    #[must_use]
    pub fn with_prefix(&self, prefix: Space) -> Self {
        let mut out = self.clone();
        *out.prefix_mut() = prefix;
        out
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Self::Unit(_) => Kind::Unit,
            Self::Import(_) => Kind::Import,
            Self::Class(_) => Kind::Class,
            Self::Method(_) => Kind::Method,
            Self::Block(_) => Kind::Block,
            Self::VarDecls(_) => Kind::VarDecls,
            Self::Variable(_) => Kind::Variable,
            Self::Modifier(_) => Kind::Modifier,
            Self::Annotation(_) => Kind::Annotation,
            Self::TypeRef(_) => Kind::TypeRef,
            Self::Ident(_) => Kind::Ident,
            Self::Literal(_) => Kind::Literal,
            Self::Unary(_) => Kind::Unary,
            Self::Binary(_) => Kind::Binary,
            Self::Assign(_) => Kind::Assign,
            Self::Call(_) => Kind::Call,
            Self::FieldAccess(_) => Kind::FieldAccess,
            Self::Paren(_) => Kind::Paren,
            Self::ExprStmt(_) => Kind::ExprStmt,
            Self::Return(_) => Kind::Return,
            Self::Empty(_) => Kind::Empty,
        }
    }

    /// Children in syntactic order.
    #[must_use]
    pub fn children(&self) -> Vec<&Arc<Tree>> {
        match self {
            Self::Unit(u) => u.imports.iter().chain(u.classes.iter()).collect(),
            Self::Import(_)
            | Self::Modifier(_)
            | Self::Annotation(_)
            | Self::TypeRef(_)
            | Self::Ident(_)
            | Self::Literal(_)
            | Self::Empty(_) => Vec::new(),
            Self::Class(c) => {
                let mut out: Vec<_> = c.modifiers.iter().collect();
                out.push(&c.name);
                out.push(&c.body);
                out
            }
            Self::Method(m) => {
                let mut out: Vec<_> = m.annotations.iter().chain(m.modifiers.iter()).collect();
                out.extend(m.return_type.iter());
                out.push(&m.name);
                out.extend(m.params.iter());
                out.extend(m.body.iter());
                out
            }
            Self::Block(b) => b.statements.iter().collect(),
            Self::VarDecls(v) => {
                let mut out: Vec<_> = v.modifiers.iter().collect();
                out.push(&v.type_ref);
                out.extend(v.vars.iter());
                out
            }
            Self::Variable(v) => v.initializer.iter().collect(),
            Self::Unary(u) => vec![&u.expr],
            Self::Binary(b) => vec![&b.left, &b.right],
            Self::Assign(a) => vec![&a.target, &a.value],
            Self::Call(c) => {
                let mut out = vec![&c.target];
                out.extend(c.args.iter());
                out
            }
            Self::FieldAccess(f) => vec![&f.target],
            Self::Paren(p) => vec![&p.expr],
            Self::ExprStmt(e) => vec![&e.expr],
            Self::Return(r) => r.expr.iter().collect(),
        }
    }

    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(
            self.kind(),
            Kind::Block | Kind::VarDecls | Kind::ExprStmt | Kind::Return | Kind::Empty
        )
    }

    /// Whether the *enclosing* printer emits this statement's terminating
    /// `;`. This ordering is what lets a post-node hook splice text between
    /// a statement and its semicolon.
    #[must_use]
    pub fn needs_semicolon(&self) -> bool {
        matches!(self.kind(), Kind::VarDecls | Kind::ExprStmt | Kind::Return)
    }

    /// Full printed form, including the node's own prefix.
    #[must_use]
    pub fn print(&self) -> String {
        crate::printer::print_tree(self)
    }

    /// Printed form with surrounding whitespace removed; this is the shape
    /// template parameters substitute as.
    #[must_use]
    pub fn print_trimmed(&self) -> String {
        self.print().trim().to_string()
    }

    /// Rebuild this node by mapping every child, preserving identity. When
    /// no child changes, the original `Arc` is returned so untouched
    /// subtrees stay aliased.
    pub(crate) fn map_children(
        node: &Arc<Self>,
        f: &mut impl FnMut(&Arc<Self>) -> Arc<Self>,
    ) -> Arc<Self> {
        let mut changed = false;
        let mut map = |child: &Arc<Self>| {
            let out = f(child);
            if !Arc::ptr_eq(&out, child) {
                changed = true;
            }
            out
        };
        let rebuilt = match &**node {
            Self::Unit(u) => Self::Unit(Unit {
                imports: u.imports.iter().map(&mut map).collect(),
                classes: u.classes.iter().map(&mut map).collect(),
                ..u.clone()
            }),
            Self::Class(c) => Self::Class(Class {
                modifiers: c.modifiers.iter().map(&mut map).collect(),
                name: map(&c.name),
                body: map(&c.body),
                ..c.clone()
            }),
            Self::Method(m) => Self::Method(Method {
                annotations: m.annotations.iter().map(&mut map).collect(),
                modifiers: m.modifiers.iter().map(&mut map).collect(),
                return_type: m.return_type.as_ref().map(&mut map),
                name: map(&m.name),
                params: m.params.iter().map(&mut map).collect(),
                body: m.body.as_ref().map(&mut map),
                ..m.clone()
            }),
            Self::Block(b) => Self::Block(Block {
                statements: b.statements.iter().map(&mut map).collect(),
                ..b.clone()
            }),
            Self::VarDecls(v) => Self::VarDecls(VarDecls {
                modifiers: v.modifiers.iter().map(&mut map).collect(),
                type_ref: map(&v.type_ref),
                vars: v.vars.iter().map(&mut map).collect(),
                ..v.clone()
            }),
            Self::Variable(v) => Self::Variable(Variable {
                initializer: v.initializer.as_ref().map(&mut map),
                ..v.clone()
            }),
            Self::Unary(u) => Self::Unary(Unary {
                expr: map(&u.expr),
                ..u.clone()
            }),
            Self::Binary(b) => Self::Binary(Binary {
                left: map(&b.left),
                right: map(&b.right),
                ..b.clone()
            }),
            Self::Assign(a) => Self::Assign(Assign {
                target: map(&a.target),
                value: map(&a.value),
                ..a.clone()
            }),
            Self::Call(c) => Self::Call(Call {
                target: map(&c.target),
                args: c.args.iter().map(&mut map).collect(),
                ..c.clone()
            }),
            Self::FieldAccess(fa) => Self::FieldAccess(FieldAccess {
                target: map(&fa.target),
                ..fa.clone()
            }),
            Self::Paren(p) => Self::Paren(Paren {
                expr: map(&p.expr),
                ..p.clone()
            }),
            Self::ExprStmt(e) => Self::ExprStmt(ExprStmt {
                expr: map(&e.expr),
                ..e.clone()
            }),
            Self::Return(r) => Self::Return(Return {
                expr: r.expr.as_ref().map(&mut map),
                ..r.clone()
            }),
            Self::Import(_)
            | Self::Modifier(_)
            | Self::Annotation(_)
            | Self::TypeRef(_)
            | Self::Ident(_)
            | Self::Literal(_)
            | Self::Empty(_) => return node.clone(),
        };
        if changed { Arc::new(rebuilt) } else { node.clone() }
    }
}

/// Pre-order iteration over a subtree, the node itself included.
pub fn descendants(node: &Arc<Tree>) -> impl Iterator<Item = Arc<Tree>> {
    let mut stack = vec![node.clone()];
    std::iter::from_fn(move || {
        let node = stack.pop()?;
        let children: Vec<_> = node.children().into_iter().cloned().collect();
        stack.extend(children.into_iter().rev());
        Some(node)
    })
}

/// Whether `id` names the node itself or anything below it.
#[must_use]
pub fn subtree_contains(node: &Arc<Tree>, id: NodeId) -> bool {
    descendants(node).any(|n| n.id() == id)
}

#[cfg(test)]
mod test {
    use super::*;

    fn leaf(name: &str) -> Arc<Tree> {
        Arc::new(Tree::Ident(Ident {
            id: NodeId::fresh(),
            prefix: Space::default(),
            name: name.into(),
        }))
    }

    #[test]
    fn test_identity_survives_prefix_rewrite() {
        let node = leaf("x");
        let rewritten = node.with_prefix(Space::new("  "));
        assert_eq!(node.id(), rewritten.id());
        assert_eq!(rewritten.prefix().whitespace, "  ");
    }

    #[test]
    fn test_map_children_aliases_unchanged() {
        let left = leaf("a");
        let right = leaf("b");
        let bin = Arc::new(Tree::Binary(Binary {
            id: NodeId::fresh(),
            prefix: Space::default(),
            left: left.clone(),
            op: "+".into(),
            right: right.clone(),
        }));
        let same = Tree::map_children(&bin, &mut |c| c.clone());
        assert!(Arc::ptr_eq(&same, &bin));

        let swapped = Tree::map_children(&bin, &mut |c| {
            if c.id() == left.id() { leaf("z") } else { c.clone() }
        });
        assert!(!Arc::ptr_eq(&swapped, &bin));
        assert_eq!(swapped.id(), bin.id());
        // untouched child stays aliased
        match &*swapped {
            Tree::Binary(b) => assert!(Arc::ptr_eq(&b.right, &right)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_block_comment_lookup_and_removal() {
        let space = Space {
            whitespace: " ".into(),
            comments: vec![
                Comment {
                    style: CommentStyle::Block,
                    text: "keep".into(),
                    suffix: String::new(),
                },
                Comment {
                    style: CommentStyle::Block,
                    text: "drop".into(),
                    suffix: String::new(),
                },
            ],
        };
        assert!(space.has_block_comment("drop"));
        let cleaned = space.without_block_comment("drop");
        assert!(!cleaned.has_block_comment("drop"));
        assert!(cleaned.has_block_comment("keep"));
        assert_eq!(cleaned.whitespace, " ");
    }

    #[test]
    fn test_descendants_preorder() {
        let inner = leaf("x");
        let stmt = Arc::new(Tree::ExprStmt(ExprStmt {
            id: NodeId::fresh(),
            prefix: Space::default(),
            expr: inner.clone(),
        }));
        let ids: Vec<_> = descendants(&stmt).map(|n| n.id()).collect();
        assert_eq!(ids, vec![stmt.id(), inner.id()]);
        assert!(subtree_contains(&stmt, inner.id()));
        assert!(!subtree_contains(&inner, stmt.id()));
    }
}
