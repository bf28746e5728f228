// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Tree Printing
//!
//! Serialises a [`Tree`] back to source text. [`TreePrinter`] is the seam
//! the marker emitter plugs into: it exposes a pre-node and a post-node hook
//! around every printed node, plus an import-injection point on the
//! compilation unit, all receiving the shared text accumulator explicitly.
//!
//! Prefix trivia is printed verbatim from each node's [`Space`]; spacing
//! *inside* a node (around operators, after keywords) is normalised to
//! single spaces. Statement-terminating semicolons are written by the
//! enclosing container so the post-node hook runs between a statement's
//! text and its `;`.

use crate::tree::{Comment, CommentStyle, Space, Tree, Unit};

/// Printer base: override the hooks, or a whole node body, per variant.
pub trait TreePrinter {
    /// Runs before a node's prefix and body are written.
    fn pre_node(&mut self, _node: &Tree, _out: &mut String) {}

    /// Runs after a node's body, before any container-owned `;`.
    fn post_node(&mut self, _node: &Tree, _out: &mut String) {}

    /// Runs on the compilation unit between the host imports and the first
    /// class declaration.
    fn extra_imports(&mut self, _unit: &Unit, _out: &mut String) {}

    fn print_node(&mut self, node: &Tree, out: &mut String) {
        self.pre_node(node, out);
        print_space(node.prefix(), out);
        self.print_body(node, out);
        self.post_node(node, out);
    }

    /// Variant dispatch for a node's body (everything after the prefix).
    fn print_body(&mut self, node: &Tree, out: &mut String) {
        print_default(self, node, out);
    }
}

/// The plain printer: no hooks, no splice.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPrinter;

impl TreePrinter for DefaultPrinter {}

/// Print a standalone node. Statements that rely on their container for the
/// terminating `;` get one appended, so a printed statement is well formed
/// on its own.
#[must_use]
pub fn print_tree(node: &Tree) -> String {
    let mut out = String::new();
    DefaultPrinter.print_node(node, &mut out);
    if node.needs_semicolon() {
        out.push(';');
    }
    out
}

pub fn print_space(space: &Space, out: &mut String) {
    out.push_str(&space.whitespace);
    for comment in &space.comments {
        print_comment(comment, out);
    }
}

fn print_comment(comment: &Comment, out: &mut String) {
    match comment.style {
        CommentStyle::Line => {
            out.push_str("//");
            out.push_str(&comment.text);
        }
        CommentStyle::Block => {
            out.push_str("/*");
            out.push_str(&comment.text);
            out.push_str("*/");
        }
    }
    out.push_str(&comment.suffix);
}

fn print_default<P: TreePrinter + ?Sized>(p: &mut P, node: &Tree, out: &mut String) {
    match node {
        Tree::Unit(u) => {
            for import in &u.imports {
                p.print_node(import, out);
            }
            p.extra_imports(u, out);
            for class in &u.classes {
                p.print_node(class, out);
            }
            print_space(&u.eof, out);
        }
        Tree::Import(i) => {
            out.push_str("import ");
            if i.is_static {
                out.push_str("static ");
            }
            out.push_str(&i.path);
            out.push(';');
        }
        Tree::Class(c) => {
            for modifier in &c.modifiers {
                p.print_node(modifier, out);
            }
            if !c.modifiers.is_empty() {
                out.push(' ');
            }
            out.push_str("class");
            p.print_node(&c.name, out);
            p.print_node(&c.body, out);
        }
        Tree::Method(m) => {
            for annotation in &m.annotations {
                p.print_node(annotation, out);
            }
            for modifier in &m.modifiers {
                p.print_node(modifier, out);
            }
            if let Some(return_type) = &m.return_type {
                p.print_node(return_type, out);
            }
            p.print_node(&m.name, out);
            out.push('(');
            for (i, param) in m.params.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                p.print_node(param, out);
            }
            out.push(')');
            match &m.body {
                Some(body) => p.print_node(body, out),
                None => out.push(';'),
            }
        }
        Tree::Block(b) => {
            if b.is_static {
                out.push_str("static ");
            }
            out.push('{');
            for statement in &b.statements {
                p.print_node(statement, out);
                if statement.needs_semicolon() {
                    out.push(';');
                }
            }
            print_space(&b.end, out);
            out.push('}');
        }
        Tree::VarDecls(v) => {
            for modifier in &v.modifiers {
                p.print_node(modifier, out);
            }
            p.print_node(&v.type_ref, out);
            for (i, var) in v.vars.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                p.print_node(var, out);
            }
        }
        Tree::Variable(v) => {
            out.push_str(&v.name);
            if let Some(init) = &v.initializer {
                out.push_str(" =");
                p.print_node(init, out);
            }
        }
        Tree::Modifier(m) => out.push_str(&m.keyword),
        Tree::Annotation(a) => {
            out.push('@');
            out.push_str(&a.name);
        }
        Tree::TypeRef(t) => out.push_str(&t.name),
        Tree::Ident(i) => out.push_str(&i.name),
        Tree::Literal(l) => out.push_str(&l.value),
        Tree::Unary(u) => {
            out.push_str(&u.op);
            p.print_node(&u.expr, out);
        }
        Tree::Binary(b) => {
            p.print_node(&b.left, out);
            out.push(' ');
            out.push_str(&b.op);
            p.print_node(&b.right, out);
        }
        Tree::Assign(a) => {
            p.print_node(&a.target, out);
            out.push_str(" =");
            p.print_node(&a.value, out);
        }
        Tree::Call(c) => {
            p.print_node(&c.target, out);
            out.push('(');
            for (i, arg) in c.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                p.print_node(arg, out);
            }
            out.push(')');
        }
        Tree::FieldAccess(f) => {
            p.print_node(&f.target, out);
            out.push('.');
            out.push_str(&f.name);
        }
        Tree::Paren(pa) => {
            out.push('(');
            p.print_node(&pa.expr, out);
            out.push(')');
        }
        Tree::ExprStmt(e) => p.print_node(&e.expr, out),
        Tree::Return(r) => {
            out.push_str("return");
            if let Some(expr) = &r.expr {
                p.print_node(expr, out);
            }
        }
        Tree::Empty(_) => out.push(';'),
    }
}
