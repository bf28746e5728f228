// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

/*!
Templated snippet generation for automated refactoring.

Given a parsed host file, a cursor pointing into it, and a source fragment
with positional placeholders, `stitch` produces fully-parsed, formatted
subtrees ready to splice into the host at that position. The pipeline behind
[`Template::generate_before`]/[`Template::generate_after`]:

1. resolve the insertion scope from the cursor;
2. prune the host unit to the minimal context that still parses;
3. print the pruned tree with the substituted fragment spliced between
   opaque block-comment markers;
4. reparse the synthesized source;
5. extract exactly the marked subtrees;
6. reformat each against the host scope.

The tree model, cursors, printer hooks, and the parser seam are public so
refactoring recipes can be built on top; the pruner, marker emitter, and
extractor are implementation details of [`Template`].
*/

pub mod cursor;
pub mod error;
pub mod format;
pub mod parse;
pub mod printer;
pub mod template;
pub mod tree;

pub use cursor::Cursor;
pub use error::{ExtractionError, FormatError, ParseError, Result, TemplateError};
pub use format::auto_format;
pub use parse::{JavaParser, SourceParser};
pub use printer::{DefaultPrinter, TreePrinter};
pub use template::{DEFAULT_PARAMETER_MARKER, Param, Template, TemplateBuilder};
pub use tree::{Kind, NodeId, Space, Tree};
