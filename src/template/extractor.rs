// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Snippet extraction from the reparsed synthetic unit.
//!
//! A pre-order walk inspects every prefix space (and the closing space of
//! blocks and the unit) for the splice markers. Between the markers, every
//! node whose immediate parent was not itself collected is recorded with its
//! depth; descendants of collected nodes are over-collected one level down
//! and filtered out at the end by the depth check, which is what guarantees
//! no returned node is an ancestor of another.
//!
//! The first collected element is dropped as wrapping scaffold when the end
//! marker turns up *inside* it - that is the synthetic block a
//! member-initialiser splice is wrapped in.

use std::sync::Arc;

use rapidhash::RapidHashSet;

use crate::error::ExtractionError;
use crate::template::emitter::{SNIPPET_MARKER_END, SNIPPET_MARKER_START};
use crate::tree::{NodeId, Space, Tree};

pub(crate) fn extract(unit: &Arc<Tree>) -> Result<Vec<Arc<Tree>>, ExtractionError> {
    let mut extractor = Extractor::default();
    let mut stack = Vec::new();
    extractor.walk(unit, &mut stack)?;
    if extractor.collecting || !extractor.started {
        return Err(ExtractionError::MissingEnd);
    }
    Ok(extractor.into_snippets())
}

#[derive(Default)]
struct Extractor {
    collecting: bool,
    started: bool,
    start_depth: usize,
    elements: Vec<(usize, Arc<Tree>)>,
    collected: RapidHashSet<NodeId>,
}

impl Extractor {
    fn walk(
        &mut self,
        node: &Arc<Tree>,
        stack: &mut Vec<Arc<Tree>>,
    ) -> Result<(), ExtractionError> {
        stack.push(node.clone());
        let depth = stack.len();
        self.on_node(node, depth, stack)?;
        for child in node.children() {
            self.walk(child, stack)?;
        }
        match &**node {
            Tree::Block(b) => self.on_closing_space(&b.end, depth, stack)?,
            Tree::Unit(u) => self.on_closing_space(&u.eof, depth, stack)?,
            _ => {}
        }
        stack.pop();
        Ok(())
    }

    fn on_node(
        &mut self,
        node: &Arc<Tree>,
        depth: usize,
        stack: &[Arc<Tree>],
    ) -> Result<(), ExtractionError> {
        let space = node.prefix();
        let has_start = space.has_block_comment(SNIPPET_MARKER_START);
        let has_end = space.has_block_comment(SNIPPET_MARKER_END);
        if has_start {
            self.started = true;
            if has_end {
                // empty splice: nothing between the markers
                self.collecting = false;
                return Ok(());
            }
            self.collecting = true;
            if matches!(&**node, Tree::Unit(_)) {
                // splice landed in the file-leading trivia; the unit itself
                // is host scaffolding, its direct children are the snippets
                self.start_depth = depth + 1;
            } else {
                self.start_depth = depth;
                self.collected.insert(node.id());
                let cleaned = node.with_prefix(space.without_block_comment(SNIPPET_MARKER_START));
                self.elements.push((depth, Arc::new(cleaned)));
            }
            return Ok(());
        }
        if has_end {
            return self.end_collecting(stack);
        }
        if self.collecting {
            let parent_collected = stack
                .len()
                .checked_sub(2)
                .is_some_and(|i| self.collected.contains(&stack[i].id()));
            if !parent_collected {
                self.collected.insert(node.id());
                self.elements.push((depth, node.clone()));
            }
        }
        Ok(())
    }

    fn on_closing_space(
        &mut self,
        space: &Space,
        depth: usize,
        stack: &[Arc<Tree>],
    ) -> Result<(), ExtractionError> {
        let has_start = space.has_block_comment(SNIPPET_MARKER_START);
        let has_end = space.has_block_comment(SNIPPET_MARKER_END);
        if has_start {
            self.started = true;
            if has_end {
                self.collecting = false;
                return Ok(());
            }
            // nothing to record in a closing space; aim at the children
            self.collecting = true;
            self.start_depth = depth + 1;
            return Ok(());
        }
        if has_end {
            return self.end_collecting(stack);
        }
        Ok(())
    }

    fn end_collecting(&mut self, stack: &[Arc<Tree>]) -> Result<(), ExtractionError> {
        if !self.started {
            return Err(ExtractionError::EndBeforeStart);
        }
        self.collecting = false;
        if self.elements.len() > 1 {
            let first_id = self.elements[0].1.id();
            if stack.iter().any(|n| n.id() == first_id) {
                // the first element encloses the end marker: it is the
                // synthetic wrapping block, not template content
                self.elements.remove(0);
                self.start_depth += 1;
            }
        }
        Ok(())
    }

    fn into_snippets(self) -> Vec<Arc<Tree>> {
        let start_depth = self.start_depth;
        self.elements
            .into_iter()
            .filter(|(depth, _)| *depth == start_depth)
            .map(|(_, node)| node)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::{JavaParser, SourceParser};
    use crate::tree::Kind;

    fn parse(source: &str) -> Arc<Tree> {
        let mut units = JavaParser::quiet().parse(source).expect("should parse");
        units.remove(0)
    }

    #[test]
    fn test_single_statement_between_markers() {
        let unit = parse(
            "class A { void m() { int x = 1;/*<<<<START>>>>*/f(x);/*<<<<END>>>>*/; } }",
        );
        let snippets = extract(&unit).expect("should extract");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].kind(), Kind::ExprStmt);
        assert_eq!(snippets[0].print_trimmed(), "f(x);");
    }

    #[test]
    fn test_start_marker_is_stripped_from_snippet() {
        let unit = parse(
            "class A { void m() { int x = 1;/*<<<<START>>>>*/f(x);/*<<<<END>>>>*/; } }",
        );
        let snippets = extract(&unit).expect("should extract");
        assert!(!snippets[0].prefix().has_block_comment(SNIPPET_MARKER_START));
    }

    #[test]
    fn test_multiple_statements_same_depth() {
        let unit = parse(
            "class A { void m() {/*<<<<START>>>>*/int a = 1; int b = 2;/*<<<<END>>>>*/ int x = 1; } }",
        );
        let snippets = extract(&unit).expect("should extract");
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].print_trimmed(), "int a = 1;");
        assert_eq!(snippets[1].print_trimmed(), "int b = 2;");
    }

    #[test]
    fn test_end_marker_in_block_closing_space() {
        let unit = parse("class A { {/*<<<<START>>>>*/1 + 2/*<<<<END>>>>*/} }");
        let snippets = extract(&unit).expect("should extract");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].kind(), Kind::ExprStmt);
        assert_eq!(snippets[0].print_trimmed(), "1 + 2;");
    }

    #[test]
    fn test_start_marker_on_compilation_unit() {
        let unit = parse("/*<<<<START>>>>*/class B {}/*<<<<END>>>>*/class A {}");
        let snippets = extract(&unit).expect("should extract");
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].kind(), Kind::Class);
        assert_eq!(snippets[0].print_trimmed(), "class B {}");
    }

    #[test]
    fn test_no_descendant_pairs_in_result() {
        let unit = parse(
            "class A { void m() {/*<<<<START>>>>*/a = b + c(1); int k = 2;/*<<<<END>>>>*/ int x = 1; } }",
        );
        let snippets = extract(&unit).expect("should extract");
        assert_eq!(snippets.len(), 2);
        for (i, a) in snippets.iter().enumerate() {
            for (j, b) in snippets.iter().enumerate() {
                if i != j {
                    assert!(!crate::tree::subtree_contains(a, b.id()));
                }
            }
        }
    }

    #[test]
    fn test_missing_end_marker_errors() {
        let unit = parse("class A { void m() {/*<<<<START>>>>*/f(x); } }");
        assert!(matches!(extract(&unit), Err(ExtractionError::MissingEnd)));
    }

    #[test]
    fn test_end_without_start_errors() {
        let unit = parse("class A { void m() { f(x);/*<<<<END>>>>*/ } }");
        assert!(matches!(
            extract(&unit),
            Err(ExtractionError::EndBeforeStart)
        ));
    }

    #[test]
    fn test_no_markers_at_all_errors() {
        let unit = parse("class A {}");
        assert!(matches!(extract(&unit), Err(ExtractionError::MissingEnd)));
    }

    #[test]
    fn test_empty_splice_yields_no_snippets() {
        let unit = parse("class A { void m() {/*<<<<START>>>>*//*<<<<END>>>>*/ int x = 1; } }");
        let snippets = extract(&unit).expect("should extract");
        assert!(snippets.is_empty());
    }
}
