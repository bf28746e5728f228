// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Parsing
//!
//! [`SourceParser`] is the seam between the template engine and whatever
//! produces trees from text: `parse` yields compilation units in order (the
//! engine consumes only the first) and `reset` clears any per-parse state
//! before the engine reuses the handle.
//!
//! [`JavaParser`] is the shipped implementation, covering the Java-like
//! subset the tree models. It is intentionally lenient about statement
//! terminators (see the grammar module) and records what it tolerated as
//! warnings - reported through `tracing` by default, suppressed by
//! [`JavaParser::quiet`], which is what templates bind when no parser is
//! supplied.

use std::sync::Arc;

use crate::error::ParseError;
use crate::tree::Tree;

mod grammar;
mod lexer;

use grammar::Grammar;

/// Parser collaborator contract.
pub trait SourceParser {
    /// Parse `source` into compilation units, in source order.
    fn parse(&mut self, source: &str) -> Result<Vec<Arc<Tree>>, ParseError>;

    /// Clear per-parse state. Called by the engine before every reuse.
    fn reset(&mut self);
}

/// Recursive-descent parser for the Java-like subset.
#[derive(Debug)]
pub struct JavaParser {
    report_warnings: bool,
    warnings: Vec<String>,
}

impl JavaParser {
    /// A parser that reports recoverable oddities via `tracing::warn`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            report_warnings: true,
            warnings: Vec::new(),
        }
    }

    /// A parser with warning output suppressed. Warnings are still
    /// collected and inspectable through [`JavaParser::warnings`].
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            report_warnings: false,
            warnings: Vec::new(),
        }
    }

    /// Warnings accumulated since the last [`SourceParser::reset`].
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for JavaParser {
    fn parse(&mut self, source: &str) -> Result<Vec<Arc<Tree>>, ParseError> {
        let tokens = lexer::lex(source)?;
        let mut grammar = Grammar::new(tokens, self.report_warnings);
        let unit = grammar.parse_unit()?;
        self.warnings.append(&mut grammar.warnings);
        Ok(vec![Arc::new(Tree::Unit(unit))])
    }

    fn reset(&mut self) {
        self.warnings.clear();
    }
}
