// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Auto-Formatting
//!
//! Reconciles a freshly-extracted snippet's whitespace with its host scope.
//!
//! The snippet's root prefix whitespace is replaced by the scope focus's
//! prefix whitespace, and interior lines are shifted from the snippet's own
//! base indentation to the host's. Only whitespace changes: node identities,
//! comments, and structure pass through untouched, which also makes the pass
//! idempotent.
//!
//! Space-based indentation only; tabs pass through unshifted.

use std::sync::Arc;

use crate::cursor::Cursor;
use crate::error::FormatError;
use crate::template::emitter::{SNIPPET_MARKER_END, SNIPPET_MARKER_START};
use crate::tree::{Space, Tree, descendants};

/// Reformat `snippet` against the insertion scope's conventions.
pub fn auto_format(snippet: &Arc<Tree>, scope: &Cursor) -> Result<Arc<Tree>, FormatError> {
    check_marker_residue(snippet)?;
    let host_ws = scope.focus().prefix().whitespace.clone();
    let target = indent_of(&host_ws).to_string();
    let base = indent_of(&snippet.prefix().whitespace).to_string();
    let shifted = rewrite_spaces(snippet, &|s| reindent(s, &base, &target));
    let mut prefix = shifted.prefix().clone();
    prefix.whitespace = host_ws;
    Ok(Arc::new(shifted.with_prefix(prefix)))
}

/// A snippet that still carries a splice marker means the extractor failed
/// to strip it; formatting such a tree would leak the marker into host code.
fn check_marker_residue(snippet: &Arc<Tree>) -> Result<(), FormatError> {
    let tainted = descendants(snippet).any(|n| {
        let mut spaces = vec![n.prefix().clone()];
        match &*n {
            Tree::Block(b) => spaces.push(b.end.clone()),
            Tree::Unit(u) => spaces.push(u.eof.clone()),
            _ => {}
        }
        spaces.iter().any(|s| {
            s.has_block_comment(SNIPPET_MARKER_START) || s.has_block_comment(SNIPPET_MARKER_END)
        })
    });
    if tainted {
        return Err(FormatError::MarkerResidue {
            printed: snippet.print(),
        });
    }
    Ok(())
}

/// The indentation of the last line in `ws`, empty when `ws` is single-line.
fn indent_of(ws: &str) -> &str {
    match ws.rfind('\n') {
        Some(i) => &ws[i + 1..],
        None => "",
    }
}

fn reindent(space: &Space, base: &str, target: &str) -> Space {
    let mut out = space.clone();
    out.whitespace = shift_ws(&out.whitespace, base, target);
    for comment in &mut out.comments {
        comment.suffix = shift_ws(&comment.suffix, base, target);
    }
    out
}

fn shift_ws(ws: &str, base: &str, target: &str) -> String {
    match ws.rfind('\n') {
        Some(i) => {
            let (head, seg) = ws.split_at(i + 1);
            let seg = seg.strip_prefix(base).unwrap_or(seg);
            let mut out = String::with_capacity(head.len() + target.len() + seg.len());
            out.push_str(head);
            out.push_str(target);
            out.push_str(seg);
            out
        }
        None => ws.to_string(),
    }
}

/// Rebuild a subtree with every [`Space`] passed through `f`, identities
/// preserved.
fn rewrite_spaces(node: &Arc<Tree>, f: &impl Fn(&Space) -> Space) -> Arc<Tree> {
    let mapped = Tree::map_children(node, &mut |c| rewrite_spaces(c, f));
    let mut tree = (*mapped).clone();
    let prefix = f(tree.prefix());
    *tree.prefix_mut() = prefix;
    match &mut tree {
        Tree::Block(b) => b.end = f(&b.end),
        Tree::Unit(u) => u.eof = f(&u.eof),
        _ => {}
    }
    Arc::new(tree)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::{JavaParser, SourceParser};
    use crate::tree::Kind;

    fn parse(source: &str) -> Arc<Tree> {
        let mut units = JavaParser::new().parse(source).expect("should parse");
        units.remove(0)
    }

    fn stmt_cursor(unit: &Arc<Tree>, text: &str) -> Cursor {
        let stmt = descendants(unit)
            .find(|n| n.kind() == Kind::VarDecls && n.print().contains(text))
            .expect("statement");
        Cursor::to(unit, stmt.id()).expect("cursor")
    }

    #[test]
    fn test_snippet_adopts_host_indentation() {
        let host = parse("class A {\n    void m() {\n        int x = 1;\n    }\n}");
        let scope = stmt_cursor(&host, "int x");

        let donor = parse("class D { void d() { int a = 2; } }");
        let snippet = descendants(&donor)
            .find(|n| n.kind() == Kind::VarDecls && n.print().contains("int a"))
            .expect("snippet");

        let formatted = auto_format(&snippet, &scope).expect("should format");
        assert_eq!(formatted.prefix().whitespace, "\n        ");
        assert_eq!(formatted.id(), snippet.id());
        assert_eq!(formatted.print_trimmed(), "int a = 2;");
    }

    #[test]
    fn test_idempotent() {
        let host = parse("class A {\n    void m() {\n        int x = 1;\n    }\n}");
        let scope = stmt_cursor(&host, "int x");
        let donor = parse("class D { void d() { int a = 2; } }");
        let snippet = descendants(&donor)
            .find(|n| n.kind() == Kind::VarDecls && n.print().contains("int a"))
            .expect("snippet");

        let once = auto_format(&snippet, &scope).expect("should format");
        let twice = auto_format(&once, &scope).expect("should format");
        assert_eq!(once.print(), twice.print());
    }

    #[test]
    fn test_marker_residue_is_rejected() {
        use crate::tree::{Comment, CommentStyle};

        let donor = parse("class D { void d() { int a = 2; } }");
        let snippet = descendants(&donor)
            .find(|n| n.kind() == Kind::VarDecls)
            .expect("snippet");
        let mut prefix = snippet.prefix().clone();
        prefix.comments.push(Comment {
            style: CommentStyle::Block,
            text: SNIPPET_MARKER_START.into(),
            suffix: String::new(),
        });
        let tainted = Arc::new(snippet.with_prefix(prefix));
        let scope = stmt_cursor(&donor, "int a");
        let err = auto_format(&tainted, &scope).expect_err("should reject");
        assert!(matches!(err, FormatError::MarkerResidue { .. }));
    }
}
