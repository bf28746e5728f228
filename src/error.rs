// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error taxonomy for the template pipeline.
//!
//! Every error propagates out of `generate`; nothing is swallowed. Argument
//! errors surface before any parser work, parse errors carry the full
//! synthesized source for diagnostics, and extraction/format errors indicate
//! an internal invariant violation of the emitter or extractor.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// The caller supplied a different number of parameters than the
    /// template has placeholder occurrences.
    #[error("template expects {expected} parameter(s) but {actual} were supplied")]
    ParameterArity { expected: usize, actual: usize },

    /// An import specifier failed validation in the builder.
    #[error("malformed import specifier `{spec}`: {reason}")]
    MalformedImport { spec: String, reason: &'static str },

    /// The parser rejected the synthesized source. The emitted text is
    /// attached so the failure can be reproduced outside the pipeline.
    #[error("failed to reparse synthesized source: {cause}\n--- synthesized source ---\n{synthesized}")]
    Parse {
        #[source]
        cause: ParseError,
        synthesized: String,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// The parser collaborator's own error model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    /// One-based line in the parsed text.
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// The extractor walked the synthetic unit without finding a well-formed
/// marker pair. Both cases mean the emitter printed something it should not
/// have.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("synthetic unit ended before the end marker was reached")]
    MissingEnd,
    #[error("end marker encountered before any start marker")]
    EndBeforeStart,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A snippet reached the formatter with a splice marker still attached.
    #[error("snippet still carries a splice marker and cannot be formatted:\n{printed}")]
    MarkerResidue { printed: String },
}
