// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Templates
//!
//! The public facade of the engine: build a [`Template`] once from a source
//! fragment with positional placeholders, then generate parsed, formatted
//! snippets against any insertion cursor.
//!
//! ```rust
//! use stitch::{Cursor, Param, Template};
//! use stitch::parse::{JavaParser, SourceParser};
//! use stitch::tree::{Kind, descendants};
//!
//! let host = JavaParser::new()
//!     .parse("class A { void m() { int x = 1; } }")
//!     .unwrap()
//!     .remove(0);
//! let stmt = descendants(&host)
//!     .find(|n| n.kind() == Kind::VarDecls)
//!     .unwrap();
//! let cursor = Cursor::to(&host, stmt.id()).unwrap();
//!
//! let mut template = Template::builder("System.out.println(#{});")
//!     .imports(["java.lang.System"])
//!     .unwrap()
//!     .build();
//! let snippets = template
//!     .generate_after(&cursor, &[Param::from("x")])
//!     .unwrap();
//! assert_eq!(snippets[0].print_trimmed(), "System.out.println(x);");
//! ```
//!
//! A generate call runs the whole materialisation pipeline in strict
//! sequence: resolve the insertion scope, prune the host unit, print it with
//! the substituted text spliced between markers, reparse, extract the marked
//! subtrees, and reformat each against the host scope. The template owns its
//! parser handle and `generate` takes `&mut self`, so exclusive use of that
//! mutable parser state is enforced by the borrow checker; share templates
//! across threads by giving each thread its own.

use std::fmt;
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::error::{Result, TemplateError};
use crate::format::auto_format;
use crate::parse::{JavaParser, SourceParser};
use crate::tree::{Kind, Tree};

pub(crate) mod emitter;
pub(crate) mod extractor;
pub(crate) mod pruner;

use emitter::Direction;

/// The default positional placeholder.
pub const DEFAULT_PARAMETER_MARKER: &str = "#{}";

/// A positional template parameter.
///
/// Tree parameters substitute as their trimmed printed form; everything else
/// substitutes through its `Display` text.
#[derive(Debug, Clone)]
pub enum Param {
    Tree(Arc<Tree>),
    Text(String),
}

impl Param {
    fn render(&self) -> String {
        match self {
            Self::Tree(node) => node.print_trimmed(),
            Self::Text(text) => text.clone(),
        }
    }
}

impl From<Arc<Tree>> for Param {
    fn from(node: Arc<Tree>) -> Self {
        Self::Tree(node)
    }
}

impl From<&Arc<Tree>> for Param {
    fn from(node: &Arc<Tree>) -> Self {
        Self::Tree(node.clone())
    }
}

impl From<&str> for Param {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<String> for Param {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

macro_rules! display_params {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Param {
            fn from(value: $ty) -> Self {
                Self::Text(value.to_string())
            }
        })+
    };
}

display_params!(i32, i64, u32, u64, f64, bool, char);

#[derive(Debug, Clone)]
pub(crate) struct ImportSpec {
    pub path: String,
    pub is_static: bool,
}

/// Builder for [`Template`]; see the module docs for the full pipeline.
pub struct TemplateBuilder {
    code: String,
    imports: Vec<ImportSpec>,
    marker: String,
    parser: Option<Box<dyn SourceParser>>,
}

impl std::fmt::Debug for TemplateBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateBuilder")
            .field("code", &self.code)
            .field("imports", &self.imports)
            .field("marker", &self.marker)
            .field("parser", &self.parser.as_ref().map(|_| "<dyn SourceParser>"))
            .finish()
    }
}

impl TemplateBuilder {
    /// Type imports to add to every synthesized unit. Specifiers must be
    /// bare fully-qualified names: no `import `/`static ` prefix, no
    /// terminator.
    pub fn imports<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            validate_import(&name)?;
            self.imports.push(ImportSpec {
                path: name,
                is_static: false,
            });
        }
        Ok(self)
    }

    /// Static imports, validated like [`TemplateBuilder::imports`].
    pub fn static_imports<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            validate_import(&name)?;
            self.imports.push(ImportSpec {
                path: name,
                is_static: true,
            });
        }
        Ok(self)
    }

    /// Override the placeholder token (default `#{}`). An empty marker
    /// falls back to the default.
    #[must_use]
    pub fn parameter_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !marker.is_empty() {
            self.marker = marker;
        }
        self
    }

    /// Override the parser. Without this, `build` binds a
    /// warning-suppressed [`JavaParser`].
    #[must_use]
    pub fn parser(mut self, parser: Box<dyn SourceParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Trim the fragment, count its placeholders, and freeze the bundle.
    #[must_use]
    pub fn build(self) -> Template {
        let code = self.code.trim().to_string();
        let param_count = code.matches(self.marker.as_str()).count();
        Template {
            code,
            imports: self.imports,
            marker: self.marker,
            parser: self
                .parser
                .unwrap_or_else(|| Box::new(JavaParser::quiet())),
            param_count,
        }
    }
}

/// A reusable templated snippet generator.
pub struct Template {
    code: String,
    imports: Vec<ImportSpec>,
    marker: String,
    parser: Box<dyn SourceParser>,
    param_count: usize,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("code", &self.code)
            .field("marker", &self.marker)
            .field("param_count", &self.param_count)
            .finish_non_exhaustive()
    }
}

impl Template {
    #[must_use]
    pub fn builder(code: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            code: code.into(),
            imports: Vec::new(),
            marker: DEFAULT_PARAMETER_MARKER.to_string(),
            parser: None,
        }
    }

    /// Number of placeholder occurrences in the fragment.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.param_count
    }

    /// Generate snippets spliced ahead of the node at the cursor's focus.
    pub fn generate_before(&mut self, cursor: &Cursor, params: &[Param]) -> Result<Vec<Arc<Tree>>> {
        self.generate(cursor, params, Direction::Before)
    }

    /// Generate snippets spliced behind the node at the cursor's focus.
    pub fn generate_after(&mut self, cursor: &Cursor, params: &[Param]) -> Result<Vec<Arc<Tree>>> {
        self.generate(cursor, params, Direction::After)
    }

    fn generate(
        &mut self,
        cursor: &Cursor,
        params: &[Param],
        direction: Direction,
    ) -> Result<Vec<Arc<Tree>>> {
        if params.len() != self.param_count {
            return Err(TemplateError::ParameterArity {
                expected: self.param_count,
                actual: params.len(),
            });
        }
        let substituted = substitute(&self.code, &self.marker, params);
        let (insertion, member_initialiser) = insertion_scope(cursor);
        let pruned = pruner::prune(insertion.unit(), &insertion);
        let synthesized = emitter::emit(
            &pruned,
            &insertion,
            direction,
            member_initialiser,
            &substituted,
            &self.imports,
        );
        tracing::debug!(source = %synthesized, "synthesized template source");
        self.parser.reset();
        let units = self
            .parser
            .parse(&synthesized)
            .map_err(|cause| TemplateError::Parse {
                cause,
                synthesized: synthesized.clone(),
            })?;
        let Some(synthetic) = units.into_iter().next() else {
            return Err(TemplateError::Parse {
                cause: crate::error::ParseError::new("parser produced no compilation unit", 0),
                synthesized,
            });
        };
        let snippets = extractor::extract(&synthetic)?;
        snippets
            .iter()
            .map(|snippet| auto_format(snippet, &insertion).map_err(TemplateError::from))
            .collect()
    }
}

/// Walk the cursor outward to the first node whose parent is a block or the
/// unit, noting on the way whether an intermediate ancestor is a variable
/// declared directly in a class body (a field initialiser, which needs the
/// `{ ... }` wrap to parse in statement context).
fn insertion_scope(cursor: &Cursor) -> (Cursor, bool) {
    let nodes = cursor.nodes();
    let mut idx = nodes.len() - 1;
    let mut member_initialiser = false;
    while idx > 0 {
        if matches!(nodes[idx - 1].kind(), Kind::Block | Kind::Unit) {
            break;
        }
        if nodes[idx].kind() == Kind::Variable
            && idx >= 3
            && nodes[idx - 1].kind() == Kind::VarDecls
            && nodes[idx - 2].kind() == Kind::Block
            && nodes[idx - 3].kind() == Kind::Class
        {
            member_initialiser = true;
        }
        idx -= 1;
    }
    (cursor.truncated(idx + 1), member_initialiser)
}

/// Left-to-right, single-shot substitution: each placeholder occurrence is
/// replaced exactly once, and the scan resumes after the replacement, so a
/// value containing the marker never cascades.
fn substitute(code: &str, marker: &str, params: &[Param]) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    for param in params {
        match rest.find(marker) {
            Some(at) => {
                out.push_str(&rest[..at]);
                out.push_str(&param.render());
                rest = &rest[at + marker.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn validate_import(name: &str) -> Result<()> {
    if name.starts_with("import ") || name.starts_with("static ") {
        return Err(TemplateError::MalformedImport {
            spec: name.to_string(),
            reason: "specifier must be a bare fully-qualified name",
        });
    }
    if name.ends_with(';') || name.ends_with('\n') {
        return Err(TemplateError::MalformedImport {
            spec: name.to_string(),
            reason: "specifier must not be terminated",
        });
    }
    Ok(())
}
