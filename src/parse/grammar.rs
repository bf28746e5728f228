// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Recursive-descent grammar over the token stream.
//!
//! The grammar is deliberately lenient about statement-terminating
//! semicolons: the template pipeline legitimately splices un-terminated
//! expression fragments into initializer blocks, so a missing `;` before a
//! closing brace is a *warning*, not an error. Everything else that falls
//! outside the supported subset is a hard [`ParseError`].
//!
//! Trivia ownership: each node takes the [`Space`] of its first token; when
//! a parsed child becomes part of a larger node (binary fold, call chain,
//! statement wrapper) the child's prefix moves to the new owner via
//! [`Tree::take_prefix`].

use std::sync::Arc;

use crate::error::ParseError;
use crate::parse::lexer::{TokKind, Token};
use crate::tree::{
    Annotation, Assign, Binary, Block, Call, Class, Empty, ExprStmt, FieldAccess, Ident, Import,
    Literal, Method, Modifier, NodeId, Paren, Return, Space, Tree, TypeRef, Unary, Unit, VarDecls,
    Variable,
};

const MODIFIERS: [&str; 11] = [
    "public",
    "private",
    "protected",
    "static",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
];

fn is_modifier(word: &str) -> bool {
    MODIFIERS.contains(&word)
}

fn is_reserved_expr_word(word: &str) -> bool {
    matches!(word, "true" | "false" | "null" | "return" | "new" | "class")
}

pub(crate) struct Grammar {
    toks: Vec<Token>,
    pos: usize,
    report_warnings: bool,
    pub(crate) warnings: Vec<String>,
}

impl Grammar {
    pub(crate) fn new(toks: Vec<Token>, report_warnings: bool) -> Self {
        Self {
            toks,
            pos: 0,
            report_warnings,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn parse_unit(&mut self) -> Result<Unit, ParseError> {
        // The unit owns the file-leading trivia.
        let prefix = std::mem::take(&mut self.toks[self.pos].space);
        let mut imports = Vec::new();
        while self.at_word("import") {
            imports.push(Arc::new(Tree::Import(self.parse_import()?)));
        }
        let mut classes = Vec::new();
        loop {
            if self.at_kind(TokKind::Eof) {
                break;
            }
            if self.at_punct(";") {
                self.warn("stray `;` at top level");
                self.bump();
                continue;
            }
            let modifiers = self.parse_modifiers();
            if self.at_word("class") {
                classes.push(Arc::new(Tree::Class(self.parse_class(modifiers)?)));
            } else {
                return Err(self.error("expected class declaration"));
            }
        }
        let eof = std::mem::take(&mut self.toks[self.pos].space);
        Ok(Unit {
            id: NodeId::fresh(),
            prefix,
            imports,
            classes,
            eof,
        })
    }

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        let kw = self.bump();
        let is_static = if self.at_word("static") {
            self.bump();
            true
        } else {
            false
        };
        let mut path = self.expect_word()?.text;
        while self.at_punct(".") {
            self.bump();
            if self.at_punct("*") {
                self.bump();
                path.push_str(".*");
                break;
            }
            let part = self.expect_word()?;
            path.push('.');
            path.push_str(&part.text);
        }
        self.expect_punct(";")?;
        Ok(Import {
            id: NodeId::fresh(),
            prefix: kw.space,
            is_static,
            path,
        })
    }

    fn parse_modifiers(&mut self) -> Vec<Tree> {
        let mut out = Vec::new();
        while self.peek().kind == TokKind::Word && is_modifier(&self.peek().text) {
            let tok = self.bump();
            out.push(Tree::Modifier(Modifier {
                id: NodeId::fresh(),
                prefix: tok.space,
                keyword: tok.text,
            }));
        }
        out
    }

    fn parse_class(&mut self, mut modifiers: Vec<Tree>) -> Result<Class, ParseError> {
        let kw = self.bump(); // `class`
        let prefix = match modifiers.first_mut() {
            Some(m) => m.take_prefix(),
            None => kw.space,
        };
        let name_tok = self.expect_word()?;
        let name = Ident {
            id: NodeId::fresh(),
            prefix: name_tok.space,
            name: name_tok.text,
        };
        let body = self.parse_class_body()?;
        Ok(Class {
            id: NodeId::fresh(),
            prefix,
            modifiers: arcs(modifiers),
            name: Arc::new(Tree::Ident(name)),
            body: Arc::new(Tree::Block(body)),
        })
    }

    fn parse_class_body(&mut self) -> Result<Block, ParseError> {
        let open = self.expect_punct("{")?;
        let mut statements = Vec::new();
        let end;
        loop {
            if self.at_kind(TokKind::Eof) {
                return Err(self.error("unexpected end of input in class body"));
            }
            if self.at_punct("}") {
                end = self.bump().space;
                break;
            }
            statements.push(Arc::new(self.parse_member()?));
        }
        Ok(Block {
            id: NodeId::fresh(),
            prefix: open.space,
            is_static: false,
            statements,
            end,
        })
    }

    fn parse_member(&mut self) -> Result<Tree, ParseError> {
        if self.at_punct(";") {
            let tok = self.bump();
            return Ok(Tree::Empty(Empty {
                id: NodeId::fresh(),
                prefix: tok.space,
            }));
        }
        let mut annotations = Vec::new();
        while self.at_punct("@") {
            let at = self.bump();
            let name = self.expect_word()?;
            annotations.push(Tree::Annotation(Annotation {
                id: NodeId::fresh(),
                prefix: at.space,
                name: name.text,
            }));
        }
        let mut modifiers = self.parse_modifiers();
        if self.at_word("class") {
            if !annotations.is_empty() {
                self.warn("annotations on a nested class are not supported and were dropped");
            }
            return Ok(Tree::Class(self.parse_class(modifiers)?));
        }
        if self.at_punct("{") {
            let is_static = modifiers
                .iter()
                .any(|m| matches!(m, Tree::Modifier(x) if x.keyword == "static"));
            if modifiers.len() > usize::from(is_static) {
                self.warn("unexpected modifiers on an initializer block");
            }
            let prefix = modifiers.first_mut().map(Tree::take_prefix);
            let block = self.parse_block(prefix, is_static)?;
            return Ok(Tree::Block(block));
        }
        let mut type_ref = self.parse_type()?;
        if self.at_punct("(") {
            // constructor: the parsed "type" is really the name
            if type_ref.name.contains('.') {
                return Err(self.error("constructor name must not be qualified"));
            }
            let name = Ident {
                id: NodeId::fresh(),
                prefix: std::mem::take(&mut type_ref.prefix),
                name: type_ref.name,
            };
            return self.finish_method(annotations, modifiers, None, name);
        }
        let name_tok = self.expect_word()?;
        if self.at_punct("(") {
            let name = Ident {
                id: NodeId::fresh(),
                prefix: name_tok.space,
                name: name_tok.text,
            };
            return self.finish_method(annotations, modifiers, Some(type_ref), name);
        }
        if !annotations.is_empty() {
            self.warn("annotations on a field are not supported and were dropped");
        }
        let decls = self.finish_var_decls(modifiers, type_ref, name_tok)?;
        Ok(Tree::VarDecls(decls))
    }

    fn finish_method(
        &mut self,
        mut annotations: Vec<Tree>,
        mut modifiers: Vec<Tree>,
        mut return_type: Option<TypeRef>,
        mut name: Ident,
    ) -> Result<Tree, ParseError> {
        let prefix = if let Some(a) = annotations.first_mut() {
            a.take_prefix()
        } else if let Some(m) = modifiers.first_mut() {
            m.take_prefix()
        } else if let Some(t) = return_type.as_mut() {
            std::mem::take(&mut t.prefix)
        } else {
            std::mem::take(&mut name.prefix)
        };
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.at_punct(")") {
            loop {
                params.push(Arc::new(self.parse_param()?));
                if self.at_punct(",") {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        let body = if self.at_punct(";") {
            self.bump();
            None
        } else if self.at_punct("{") {
            Some(Arc::new(Tree::Block(self.parse_block(None, false)?)))
        } else {
            return Err(self.error("expected method body or `;`"));
        };
        Ok(Tree::Method(Method {
            id: NodeId::fresh(),
            prefix,
            annotations: arcs(annotations),
            modifiers: arcs(modifiers),
            return_type: return_type.map(|t| Arc::new(Tree::TypeRef(t))),
            name: Arc::new(Tree::Ident(name)),
            params,
            body,
        }))
    }

    fn parse_param(&mut self) -> Result<Tree, ParseError> {
        let mut modifiers = self.parse_modifiers();
        let mut type_ref = self.parse_type()?;
        let name_tok = self.expect_word()?;
        let prefix = match modifiers.first_mut() {
            Some(m) => m.take_prefix(),
            None => std::mem::take(&mut type_ref.prefix),
        };
        let var = Tree::Variable(Variable {
            id: NodeId::fresh(),
            prefix: name_tok.space,
            name: name_tok.text,
            initializer: None,
        });
        Ok(Tree::VarDecls(VarDecls {
            id: NodeId::fresh(),
            prefix,
            modifiers: arcs(modifiers),
            type_ref: Arc::new(Tree::TypeRef(type_ref)),
            vars: vec![Arc::new(var)],
        }))
    }

    fn parse_type(&mut self) -> Result<TypeRef, ParseError> {
        let tok = self.expect_word()?;
        let mut name = tok.text;
        while self.at_punct(".") && self.word_at(self.pos + 1).is_some() {
            self.bump();
            let part = self.bump();
            name.push('.');
            name.push_str(&part.text);
        }
        Ok(TypeRef {
            id: NodeId::fresh(),
            prefix: tok.space,
            name,
        })
    }

    fn parse_block(
        &mut self,
        outer_prefix: Option<Space>,
        is_static: bool,
    ) -> Result<Block, ParseError> {
        let open = self.expect_punct("{")?;
        let prefix = outer_prefix.unwrap_or(open.space);
        let mut statements = Vec::new();
        let end;
        loop {
            if self.at_kind(TokKind::Eof) {
                return Err(self.error("unexpected end of input in block"));
            }
            if self.at_punct("}") {
                end = self.bump().space;
                break;
            }
            statements.push(Arc::new(self.parse_statement()?));
        }
        Ok(Block {
            id: NodeId::fresh(),
            prefix,
            is_static,
            statements,
            end,
        })
    }

    fn parse_statement(&mut self) -> Result<Tree, ParseError> {
        if self.at_punct(";") {
            let tok = self.bump();
            return Ok(Tree::Empty(Empty {
                id: NodeId::fresh(),
                prefix: tok.space,
            }));
        }
        if self.at_punct("{") {
            return Ok(Tree::Block(self.parse_block(None, false)?));
        }
        if self.at_word("static") && self.punct_at(self.pos + 1, "{") {
            let kw = self.bump();
            return Ok(Tree::Block(self.parse_block(Some(kw.space), true)?));
        }
        if self.at_word("return") {
            let kw = self.bump();
            let expr = if self.at_punct(";") || self.at_punct("}") {
                None
            } else {
                Some(Arc::new(self.parse_expr()?))
            };
            self.terminate_statement()?;
            return Ok(Tree::Return(Return {
                id: NodeId::fresh(),
                prefix: kw.space,
                expr,
            }));
        }
        if self.looks_like_decl() {
            let modifiers = self.parse_modifiers();
            let type_ref = self.parse_type()?;
            let name_tok = self.expect_word()?;
            let decls = self.finish_var_decls(modifiers, type_ref, name_tok)?;
            return Ok(Tree::VarDecls(decls));
        }
        let mut expr = self.parse_expr()?;
        let prefix = expr.take_prefix();
        self.terminate_statement()?;
        Ok(Tree::ExprStmt(ExprStmt {
            id: NodeId::fresh(),
            prefix,
            expr: Arc::new(expr),
        }))
    }

    /// Variables after the first declared name, the lenient terminator, and
    /// the group assembly (prefix stolen from the first modifier or the
    /// type).
    fn finish_var_decls(
        &mut self,
        mut modifiers: Vec<Tree>,
        mut type_ref: TypeRef,
        name_tok: Token,
    ) -> Result<VarDecls, ParseError> {
        let mut vars = vec![self.parse_variable(name_tok)?];
        while self.at_punct(",") {
            self.bump();
            let tok = self.expect_word()?;
            vars.push(self.parse_variable(tok)?);
        }
        self.terminate_statement()?;
        let prefix = match modifiers.first_mut() {
            Some(m) => m.take_prefix(),
            None => std::mem::take(&mut type_ref.prefix),
        };
        Ok(VarDecls {
            id: NodeId::fresh(),
            prefix,
            modifiers: arcs(modifiers),
            type_ref: Arc::new(Tree::TypeRef(type_ref)),
            vars: arcs(vars),
        })
    }

    fn parse_variable(&mut self, name_tok: Token) -> Result<Tree, ParseError> {
        let initializer = if self.at_punct("=") {
            self.bump();
            Some(Arc::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Tree::Variable(Variable {
            id: NodeId::fresh(),
            prefix: name_tok.space,
            name: name_tok.text,
            initializer,
        }))
    }

    /// Lookahead-only test for `[modifiers] Type name ...` without consuming
    /// anything, so expression statements never need backtracking.
    fn looks_like_decl(&self) -> bool {
        let mut j = self.pos;
        while self.word_at(j).is_some_and(is_modifier) {
            j += 1;
        }
        let Some(first) = self.word_at(j) else {
            return false;
        };
        if is_reserved_expr_word(first) {
            return false;
        }
        j += 1;
        while self.punct_at(j, ".") && self.word_at(j + 1).is_some() {
            j += 2;
        }
        self.word_at(j).is_some()
    }

    fn parse_expr(&mut self) -> Result<Tree, ParseError> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Result<Tree, ParseError> {
        let mut lhs = self.parse_binary(0)?;
        if self.at_punct("=") {
            self.bump();
            let value = self.parse_assign()?;
            let prefix = lhs.take_prefix();
            lhs = Tree::Assign(Assign {
                id: NodeId::fresh(),
                prefix,
                target: Arc::new(lhs),
                value: Arc::new(value),
            });
        }
        Ok(lhs)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Tree, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some(prec) = self.peek_binary_prec() {
            if prec < min_prec {
                break;
            }
            let op = self.bump();
            let right = self.parse_binary(prec + 1)?;
            let prefix = lhs.take_prefix();
            lhs = Tree::Binary(Binary {
                id: NodeId::fresh(),
                prefix,
                left: Arc::new(lhs),
                op: op.text,
                right: Arc::new(right),
            });
        }
        Ok(lhs)
    }

    fn peek_binary_prec(&self) -> Option<u8> {
        if self.peek().kind != TokKind::Punct {
            return None;
        }
        Some(match self.peek().text.as_str() {
            "||" => 1,
            "&&" => 2,
            "|" => 3,
            "^" => 4,
            "&" => 5,
            "==" | "!=" => 6,
            "<" | ">" | "<=" | ">=" => 7,
            "+" | "-" => 8,
            "*" | "/" | "%" => 9,
            _ => return None,
        })
    }

    fn parse_unary(&mut self) -> Result<Tree, ParseError> {
        if self.peek().kind == TokKind::Punct
            && matches!(self.peek().text.as_str(), "-" | "+" | "!" | "~")
        {
            let op = self.bump();
            let expr = self.parse_unary()?;
            return Ok(Tree::Unary(Unary {
                id: NodeId::fresh(),
                prefix: op.space,
                op: op.text,
                expr: Arc::new(expr),
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Tree, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at_punct(".") && self.word_at(self.pos + 1).is_some() {
                self.bump();
                let name = self.bump();
                let prefix = expr.take_prefix();
                expr = Tree::FieldAccess(FieldAccess {
                    id: NodeId::fresh(),
                    prefix,
                    target: Arc::new(expr),
                    name: name.text,
                });
            } else if self.at_punct("(") {
                self.bump();
                let mut args = Vec::new();
                if !self.at_punct(")") {
                    loop {
                        args.push(Arc::new(self.parse_expr()?));
                        if self.at_punct(",") {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
                self.expect_punct(")")?;
                let prefix = expr.take_prefix();
                expr = Tree::Call(Call {
                    id: NodeId::fresh(),
                    prefix,
                    target: Arc::new(expr),
                    args,
                });
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Tree, ParseError> {
        match self.peek().kind {
            TokKind::Number | TokKind::Str | TokKind::Char => {
                let tok = self.bump();
                Ok(Tree::Literal(Literal {
                    id: NodeId::fresh(),
                    prefix: tok.space,
                    value: tok.text,
                }))
            }
            TokKind::Word if matches!(self.peek().text.as_str(), "true" | "false" | "null") => {
                let tok = self.bump();
                Ok(Tree::Literal(Literal {
                    id: NodeId::fresh(),
                    prefix: tok.space,
                    value: tok.text,
                }))
            }
            TokKind::Word => {
                // `new`, `class` and friends are outside the expression
                // subset; a bare identifier here would swallow them and
                // leave the rest of the construct unconsumed
                if is_reserved_expr_word(&self.peek().text) {
                    return Err(self.error(&format!(
                        "expected expression, found `{}`",
                        self.peek().text
                    )));
                }
                let tok = self.bump();
                Ok(Tree::Ident(Ident {
                    id: NodeId::fresh(),
                    prefix: tok.space,
                    name: tok.text,
                }))
            }
            TokKind::Punct if self.at_punct("(") => {
                let open = self.bump();
                let expr = self.parse_expr()?;
                self.expect_punct(")")?;
                Ok(Tree::Paren(Paren {
                    id: NodeId::fresh(),
                    prefix: open.space,
                    expr: Arc::new(expr),
                }))
            }
            _ => Err(self.error(&format!(
                "expected expression, found `{}`",
                describe(self.peek())
            ))),
        }
    }

    /// Statement terminator. Lenient only ahead of a closing brace or end
    /// of input, where the member-initialiser wrap legitimately splices
    /// un-terminated expression fragments; anywhere else a missing `;` is a
    /// hard error.
    fn terminate_statement(&mut self) -> Result<(), ParseError> {
        if self.at_punct(";") {
            self.bump();
            return Ok(());
        }
        if self.at_punct("}") || self.at_kind(TokKind::Eof) {
            self.warn("missing `;` after statement");
            return Ok(());
        }
        Err(self.error(&format!(
            "expected `;`, found `{}`",
            describe(self.peek())
        )))
    }

    // --- token plumbing ---

    fn peek(&self) -> &Token {
        &self.toks[self.pos]
    }

    fn word_at(&self, j: usize) -> Option<&str> {
        self.toks
            .get(j)
            .filter(|t| t.kind == TokKind::Word)
            .map(|t| t.text.as_str())
    }

    fn punct_at(&self, j: usize, text: &str) -> bool {
        self.toks
            .get(j)
            .is_some_and(|t| t.kind == TokKind::Punct && t.text == text)
    }

    fn at_kind(&self, kind: TokKind) -> bool {
        self.peek().kind == kind
    }

    fn at_word(&self, text: &str) -> bool {
        self.peek().kind == TokKind::Word && self.peek().text == text
    }

    fn at_punct(&self, text: &str) -> bool {
        self.peek().kind == TokKind::Punct && self.peek().text == text
    }

    fn bump(&mut self) -> Token {
        if self.at_kind(TokKind::Eof) {
            return Token::default();
        }
        let tok = std::mem::take(&mut self.toks[self.pos]);
        self.pos += 1;
        tok
    }

    fn expect_word(&mut self) -> Result<Token, ParseError> {
        if self.peek().kind == TokKind::Word {
            Ok(self.bump())
        } else {
            Err(self.error(&format!(
                "expected identifier, found `{}`",
                describe(self.peek())
            )))
        }
    }

    fn expect_punct(&mut self, text: &str) -> Result<Token, ParseError> {
        if self.at_punct(text) {
            Ok(self.bump())
        } else {
            Err(self.error(&format!(
                "expected `{text}`, found `{}`",
                describe(self.peek())
            )))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::new(message, self.peek().line)
    }

    fn warn(&mut self, message: &str) {
        if self.report_warnings {
            tracing::warn!(line = self.peek().line, "{message}");
        }
        self.warnings.push(message.to_string());
    }
}

fn describe(tok: &Token) -> &str {
    if tok.kind == TokKind::Eof {
        "end of input"
    } else {
        &tok.text
    }
}

fn arcs(trees: Vec<Tree>) -> Vec<Arc<Tree>> {
    trees.into_iter().map(Arc::new).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse::lexer::lex;
    use crate::tree::{Kind, descendants};

    fn parse_tree(source: &str) -> (Arc<Tree>, Vec<String>) {
        let mut grammar = Grammar::new(lex(source).expect("should lex"), false);
        let unit = grammar.parse_unit().expect("should parse");
        (Arc::new(Tree::Unit(unit)), grammar.warnings)
    }

    fn parse_err(source: &str) -> ParseError {
        let mut grammar = Grammar::new(lex(source).expect("should lex"), false);
        grammar.parse_unit().expect_err("should fail")
    }

    #[test]
    fn test_missing_semicolon_before_closing_brace_is_tolerated() {
        let (unit, warnings) = parse_tree("class A { { f(x) } }");
        assert!(warnings.iter().any(|w| w.contains("missing `;`")));
        let stmt = descendants(&unit)
            .find(|n| n.kind() == Kind::ExprStmt)
            .expect("statement");
        assert_eq!(stmt.print_trimmed(), "f(x);");
    }

    #[test]
    fn test_missing_semicolon_mid_block_is_an_error() {
        let err = parse_err("class A { void m() { int x = 1 int y = 2; } }");
        assert!(err.message.contains("expected `;`"), "{}", err.message);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_new_expression_is_rejected() {
        let err = parse_err("class A { void m() { Object o = new Foo(); } }");
        assert!(err.message.contains("`new`"), "{}", err.message);
    }

    #[test]
    fn test_class_in_expression_position_is_rejected() {
        let err = parse_err("class A { void m() { x = class; } }");
        assert!(err.message.contains("`class`"), "{}", err.message);
    }

    #[test]
    fn test_return_in_expression_position_is_rejected() {
        let err = parse_err("class A { void m() { int x = return; } }");
        assert!(err.message.contains("`return`"), "{}", err.message);
    }

    #[test]
    fn test_keyword_literals_still_parse_in_expressions() {
        let (unit, warnings) = parse_tree("class A { void m() { flag = true; } }");
        assert!(warnings.is_empty());
        let literal = descendants(&unit)
            .find(|n| n.kind() == Kind::Literal)
            .expect("literal");
        assert_eq!(literal.print_trimmed(), "true");
    }

    #[test]
    fn test_declaration_lookahead_distinguishes_call_chains() {
        let (unit, _) = parse_tree("class A { void m() { a.b.C d = e; a.b.c(); } }");
        let kinds: Vec<_> = descendants(&unit)
            .filter(|n| n.is_statement() && n.kind() != Kind::Block)
            .map(|n| n.kind())
            .collect();
        assert_eq!(kinds, vec![Kind::VarDecls, Kind::ExprStmt]);
    }
}
