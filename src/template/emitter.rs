// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Marker-splicing printer.
//!
//! Prints the pruned unit and injects the substituted template text exactly
//! once, wrapped in the opaque block-comment markers, at the node whose
//! identity equals the insertion focus: in the pre-node hook for a *before*
//! splice, in the post-node hook for *after*. The post hook runs between a
//! statement's text and the container-owned `;`, which is why an *after*
//! splice inside a block prepends its own `;` first. Template imports are
//! appended after the host imports while the unit prints.

use std::sync::Arc;

use crate::cursor::Cursor;
use crate::printer::TreePrinter;
use crate::template::ImportSpec;
use crate::tree::{Kind, NodeId, Tree, Unit};

/// Block-comment payloads delimiting the spliced region. Chosen so no
/// realistic template text collides with them.
pub(crate) const SNIPPET_MARKER_START: &str = "<<<<START>>>>";
pub(crate) const SNIPPET_MARKER_END: &str = "<<<<END>>>>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Before,
    After,
}

/// Print `pruned` with the template text spliced at the insertion point.
pub(crate) fn emit(
    pruned: &Arc<Tree>,
    insertion: &Cursor,
    direction: Direction,
    wrap_block: bool,
    text: &str,
    imports: &[ImportSpec],
) -> String {
    let parent_is_block = insertion
        .parent()
        .is_some_and(|p| p.focus().kind() == Kind::Block);
    let mut emitter = MarkerEmitter {
        focus: insertion.focus().id(),
        direction,
        wrap_block,
        prepend_semi: parent_is_block,
        text,
        imports,
        fired: false,
    };
    let mut out = String::new();
    emitter.print_node(pruned, &mut out);
    out
}

struct MarkerEmitter<'a> {
    focus: NodeId,
    direction: Direction,
    wrap_block: bool,
    /// The statement's own `;` has not been printed yet when the after-hook
    /// runs inside a block.
    prepend_semi: bool,
    text: &'a str,
    imports: &'a [ImportSpec],
    fired: bool,
}

impl MarkerEmitter<'_> {
    fn splice(&mut self, out: &mut String) {
        self.fired = true;
        if self.direction == Direction::After && self.prepend_semi {
            out.push(';');
        }
        if self.wrap_block {
            out.push('{');
        }
        out.push_str("/*");
        out.push_str(SNIPPET_MARKER_START);
        out.push_str("*/");
        out.push_str(self.text);
        out.push_str("/*");
        out.push_str(SNIPPET_MARKER_END);
        out.push_str("*/");
        if self.wrap_block {
            out.push('}');
        }
    }
}

impl TreePrinter for MarkerEmitter<'_> {
    fn pre_node(&mut self, node: &Tree, out: &mut String) {
        if self.direction == Direction::Before && !self.fired && node.id() == self.focus {
            self.splice(out);
        }
    }

    fn post_node(&mut self, node: &Tree, out: &mut String) {
        if self.direction == Direction::After && !self.fired && node.id() == self.focus {
            self.splice(out);
        }
    }

    fn extra_imports(&mut self, _unit: &Unit, out: &mut String) {
        for import in self.imports {
            out.push_str("import ");
            if import.is_static {
                out.push_str("static ");
            }
            out.push_str(&import.path);
            out.push_str(";\n");
        }
    }
}
