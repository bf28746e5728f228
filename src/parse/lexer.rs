// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Token scanner. Every token carries the [`Space`] scanned before it -
//! whitespace plus comments - which the grammar later moves onto the owning
//! node. The trailing space of the file rides on the final `Eof` token.

use crate::error::ParseError;
use crate::tree::{Comment, CommentStyle, Space};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokKind {
    Word,
    Number,
    Str,
    Char,
    Punct,
    Eof,
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokKind,
    pub text: String,
    pub space: Space,
    /// One-based line of the token's first character.
    pub line: usize,
}

impl Default for Token {
    fn default() -> Self {
        Self {
            kind: TokKind::Eof,
            text: String::new(),
            space: Space::default(),
            line: 0,
        }
    }
}

pub(crate) fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    Scanner {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
    }
    .run()
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let space = self.scan_space()?;
            let line = self.line;
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokKind::Eof,
                    text: String::new(),
                    space,
                    line,
                });
                return Ok(tokens);
            };
            let token = if is_word_start(c) {
                self.scan_word(space, line)
            } else if c.is_ascii_digit() {
                self.scan_number(space, line)
            } else if c == '"' {
                self.scan_quoted('"', TokKind::Str, space, line)?
            } else if c == '\'' {
                self.scan_quoted('\'', TokKind::Char, space, line)?
            } else if c.is_ascii_punctuation() {
                self.scan_punct(space, line)
            } else {
                return Err(ParseError::new(format!("unexpected character `{c}`"), line));
            };
            tokens.push(token);
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Whitespace and comments up to the next token.
    fn scan_space(&mut self) -> Result<Space, ParseError> {
        let mut space = Space::default();
        loop {
            let mut ws = String::new();
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    ws.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            match space.comments.last_mut() {
                Some(last) => last.suffix.push_str(&ws),
                None => space.whitespace.push_str(&ws),
            }
            if self.peek() == Some('/') && self.peek_at(1) == Some('/') {
                self.bump();
                self.bump();
                let mut text = String::new();
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    text.push(c);
                    self.bump();
                }
                space.comments.push(Comment {
                    style: CommentStyle::Line,
                    text,
                    suffix: String::new(),
                });
            } else if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
                let line = self.line;
                self.bump();
                self.bump();
                let mut text = String::new();
                loop {
                    if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                        self.bump();
                        self.bump();
                        break;
                    }
                    match self.bump() {
                        Some(c) => text.push(c),
                        None => return Err(ParseError::new("unterminated block comment", line)),
                    }
                }
                space.comments.push(Comment {
                    style: CommentStyle::Block,
                    text,
                    suffix: String::new(),
                });
            } else {
                return Ok(space);
            }
        }
    }

    fn scan_word(&mut self, space: Space, line: usize) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_word_continue(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token {
            kind: TokKind::Word,
            text,
            space,
            line,
        }
    }

    fn scan_number(&mut self, space: Space, line: usize) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else if c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token {
            kind: TokKind::Number,
            text,
            space,
            line,
        }
    }

    fn scan_quoted(
        &mut self,
        quote: char,
        kind: TokKind,
        space: Space,
        line: usize,
    ) -> Result<Token, ParseError> {
        let mut text = String::new();
        text.push(quote);
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    text.push('\\');
                    match self.bump() {
                        Some(c) => text.push(c),
                        None => return Err(ParseError::new("unterminated escape", line)),
                    }
                }
                Some(c) if c == quote => {
                    text.push(c);
                    return Ok(Token {
                        kind,
                        text,
                        space,
                        line,
                    });
                }
                Some(c) => text.push(c),
                None => return Err(ParseError::new("unterminated literal", line)),
            }
        }
    }

    fn scan_punct(&mut self, space: Space, line: usize) -> Token {
        const DOUBLES: [&str; 6] = ["&&", "||", "==", "!=", "<=", ">="];
        let first = self.bump().unwrap_or_default();
        let mut text = String::from(first);
        if let Some(next) = self.peek() {
            let pair: String = [first, next].iter().collect();
            if DOUBLES.contains(&pair.as_str()) {
                text.push(next);
                self.bump();
            }
        }
        Token {
            kind: TokKind::Punct,
            text,
            space,
            line,
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
