// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pruning: reduce the host unit to the minimal context that still parses
//! around the insertion point.
//!
//! Rules, applied by a single match-dispatched visit that tracks its own
//! ancestor stack:
//!
//! - class bodies keep their member layout;
//! - a block on the insertion path keeps statements up to and including the
//!   one containing the insertion point, a block off the path is emptied;
//! - a method off the path is stubbed (annotations cleared, body removed);
//! - a variable whose scope is live at the insertion point is renamed with a
//!   `_` prefix so the template may redeclare the original name, any other
//!   variable loses its initializer.
//!
//! Identity is preserved throughout: rebuilt nodes keep their ids and
//! untouched subtrees stay `Arc`-aliased.

use std::sync::Arc;

use crate::cursor::Cursor;
use crate::tree::{Block, Kind, Method, Tree, Variable};

pub(crate) fn prune(unit: &Arc<Tree>, insertion: &Cursor) -> Arc<Tree> {
    let mut stack = Vec::new();
    visit(unit, insertion, &mut stack)
}

fn visit(node: &Arc<Tree>, insertion: &Cursor, stack: &mut Vec<Arc<Tree>>) -> Arc<Tree> {
    stack.push(node.clone());
    let out = match &**node {
        Tree::Block(b) => visit_block(node, b, insertion, stack),
        Tree::Method(m) => visit_method(node, m, insertion, stack),
        Tree::Variable(v) => visit_variable(node, v, insertion, stack),
        _ => Tree::map_children(node, &mut |c| visit(c, insertion, stack)),
    };
    stack.pop();
    out
}

fn visit_block(
    node: &Arc<Tree>,
    block: &Block,
    insertion: &Cursor,
    stack: &mut Vec<Arc<Tree>>,
) -> Arc<Tree> {
    let parent_is_class = stack
        .len()
        .checked_sub(2)
        .is_some_and(|i| stack[i].kind() == Kind::Class);
    if parent_is_class {
        return Tree::map_children(node, &mut |c| visit(c, insertion, stack));
    }
    if insertion.contains(block.id) && insertion.focus().id() != block.id {
        let mut statements = Vec::new();
        for statement in &block.statements {
            let on_path = insertion.contains(statement.id());
            statements.push(visit(statement, insertion, stack));
            if on_path {
                break;
            }
        }
        return Arc::new(Tree::Block(Block {
            statements,
            ..block.clone()
        }));
    }
    if block.statements.is_empty() {
        return node.clone();
    }
    Arc::new(Tree::Block(Block {
        statements: Vec::new(),
        ..block.clone()
    }))
}

fn visit_method(
    node: &Arc<Tree>,
    method: &Method,
    insertion: &Cursor,
    stack: &mut Vec<Arc<Tree>>,
) -> Arc<Tree> {
    if insertion.contains(method.id) {
        return Tree::map_children(node, &mut |c| visit(c, insertion, stack));
    }
    // signature stub: params still visit so in-scope rules apply uniformly
    let params: Vec<_> = method
        .params
        .iter()
        .map(|p| visit(p, insertion, stack))
        .collect();
    let already_stubbed = method.annotations.is_empty()
        && method.body.is_none()
        && params
            .iter()
            .zip(&method.params)
            .all(|(new, old)| Arc::ptr_eq(new, old));
    if already_stubbed {
        return node.clone();
    }
    Arc::new(Tree::Method(Method {
        annotations: Vec::new(),
        params,
        body: None,
        ..method.clone()
    }))
}

fn visit_variable(
    node: &Arc<Tree>,
    var: &Variable,
    insertion: &Cursor,
    stack: &mut Vec<Arc<Tree>>,
) -> Arc<Tree> {
    let scope = stack[..stack.len() - 1]
        .iter()
        .rev()
        .find(|n| matches!(n.kind(), Kind::Block | Kind::Method));
    let in_scope = scope.is_some_and(|s| insertion.contains(s.id()));
    if in_scope {
        // the template may redeclare this name; step the original aside
        let initializer = var
            .initializer
            .as_ref()
            .map(|init| visit(init, insertion, stack));
        return Arc::new(Tree::Variable(Variable {
            name: format!("_{}", var.name),
            initializer,
            ..var.clone()
        }));
    }
    if var.initializer.is_none() {
        return node.clone();
    }
    Arc::new(Tree::Variable(Variable {
        initializer: None,
        ..var.clone()
    }))
}
