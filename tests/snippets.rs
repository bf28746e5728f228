// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end generate scenarios: host source in, formatted snippets out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stitch::tree::{Kind, NodeId, Tree, descendants};
use stitch::{Cursor, JavaParser, Param, ParseError, SourceParser, Template, TemplateError};

fn parse(source: &str) -> Arc<Tree> {
    let mut units = JavaParser::new().parse(source).expect("host should parse");
    units.remove(0)
}

fn cursor_at(unit: &Arc<Tree>, kind: Kind, text: &str) -> Cursor {
    let node = descendants(unit)
        .find(|n| n.kind() == kind && n.print().contains(text))
        .expect("node should exist");
    Cursor::to(unit, node.id()).expect("cursor should resolve")
}

fn host_ids(unit: &Arc<Tree>) -> Vec<NodeId> {
    descendants(unit).map(|n| n.id()).collect()
}

#[test]
fn statement_after_statement() {
    let host = parse("class A { void m() { int x = 1; int y = 2; } }");
    let cursor = cursor_at(&host, Kind::VarDecls, "int x");

    let mut template = Template::builder("System.out.println(#{});")
        .imports(["java.lang.System"])
        .expect("valid import")
        .build();
    let snippets = template
        .generate_after(&cursor, &[Param::from("x")])
        .expect("should generate");

    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].kind(), Kind::ExprStmt);
    assert_eq!(snippets[0].print_trimmed(), "System.out.println(x);");
}

#[test]
fn field_initialiser_is_wrapped_and_unwrapped() {
    let host = parse("class A { int f = 0; }");
    let cursor = cursor_at(&host, Kind::Literal, "0");

    let mut template = Template::builder("1 + #{}").build();
    let snippets = template
        .generate_before(&cursor, &[Param::from(2)])
        .expect("should generate");

    assert_eq!(snippets.len(), 1);
    let expr = match &*snippets[0] {
        Tree::ExprStmt(stmt) => stmt.expr.clone(),
        other => panic!("expected expression statement, got {:?}", other.kind()),
    };
    assert_eq!(expr.kind(), Kind::Binary);
    assert_eq!(expr.print_trimmed(), "1 + 2");
}

#[test]
fn before_first_declaration_without_imports() {
    let host = parse("class A {}");
    let cursor = cursor_at(&host, Kind::Class, "class A");

    let mut template = Template::builder("class B {}").build();
    let snippets = template
        .generate_before(&cursor, &[])
        .expect("should generate");

    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].kind(), Kind::Class);
    assert_eq!(snippets[0].print_trimmed(), "class B {}");
}

#[test]
fn before_first_declaration_with_imports() {
    let host = parse("class A {}");
    let cursor = cursor_at(&host, Kind::Class, "class A");

    let mut template = Template::builder("class B {}")
        .imports(["java.util.List"])
        .expect("valid import")
        .build();
    let snippets = template
        .generate_before(&cursor, &[])
        .expect("should generate");

    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].print_trimmed(), "class B {}");
}

#[test]
fn in_scope_variables_are_renamed_for_the_splice() {
    let host = parse("class A { void m(int i) { int j = i; } }");
    let cursor = cursor_at(&host, Kind::VarDecls, "int j");

    // the template redeclares `i`; pruning must have stepped the parameter
    // aside for the synthesized source to stay unambiguous
    let mut template = Template::builder("int i = #{};").build();
    let snippets = template
        .generate_before(&cursor, &[Param::from(0)])
        .expect("should generate");

    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].print_trimmed(), "int i = 0;");
}

#[test]
fn multiple_statements_extract_in_order() {
    let host = parse("class A { void m() { int x = 1; } }");
    let cursor = cursor_at(&host, Kind::VarDecls, "int x");

    let mut template = Template::builder("int a = 1; int b = 2;").build();
    let snippets = template
        .generate_after(&cursor, &[])
        .expect("should generate");

    let printed: Vec<_> = snippets.iter().map(|s| s.print_trimmed()).collect();
    assert_eq!(printed, vec!["int a = 1;", "int b = 2;"]);
}

#[test]
fn multiple_declarations_at_unit_level() {
    let host = parse("class A {}");
    let cursor = cursor_at(&host, Kind::Class, "class A");

    let mut template = Template::builder("class B {} class C {}").build();
    let snippets = template
        .generate_before(&cursor, &[])
        .expect("should generate");

    let printed: Vec<_> = snippets.iter().map(|s| s.print_trimmed()).collect();
    assert_eq!(printed, vec!["class B {}", "class C {}"]);
}

#[test]
fn after_splice_on_a_field_parses_as_initializer_block() {
    let host = parse("class A { int f = 0; }");
    let cursor = cursor_at(&host, Kind::Literal, "0");

    let mut template = Template::builder("g();").build();
    let snippets = template
        .generate_after(&cursor, &[])
        .expect("should generate");

    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].print_trimmed(), "g();");
}

struct CountingParser {
    inner: JavaParser,
    calls: Arc<AtomicUsize>,
}

impl SourceParser for CountingParser {
    fn parse(&mut self, source: &str) -> Result<Vec<Arc<Tree>>, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.parse(source)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

#[test]
fn arity_mismatch_fails_before_any_parse() {
    let host = parse("class A { void m() { int x = 1; } }");
    let cursor = cursor_at(&host, Kind::VarDecls, "int x");

    let calls = Arc::new(AtomicUsize::new(0));
    let mut template = Template::builder("f(#{}, #{});")
        .parser(Box::new(CountingParser {
            inner: JavaParser::quiet(),
            calls: calls.clone(),
        }))
        .build();
    assert_eq!(template.parameter_count(), 2);

    let err = template
        .generate_after(&cursor, &[Param::from("x")])
        .expect_err("arity mismatch");
    assert!(matches!(
        err,
        TemplateError::ParameterArity {
            expected: 2,
            actual: 1
        }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // with matching arity the injected parser is actually used
    let snippets = template
        .generate_after(&cursor, &[Param::from("x"), Param::from("y")])
        .expect("should generate");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(snippets[0].print_trimmed(), "f(x, y);");
}

#[test]
fn snippets_are_fresh_identities() {
    let host = parse("class A { void m() { int x = 1; } }");
    let cursor = cursor_at(&host, Kind::VarDecls, "int x");
    let known = host_ids(&host);

    let mut template = Template::builder("int a = #{};").build();
    for snippets in [
        template
            .generate_before(&cursor, &[Param::from(1)])
            .expect("before"),
        template
            .generate_after(&cursor, &[Param::from(1)])
            .expect("after"),
    ] {
        for snippet in &snippets {
            assert!(descendants(snippet).all(|n| !known.contains(&n.id())));
        }
    }
}

#[test]
fn snippets_carry_no_marker_comments() {
    let host = parse("class A { void m() { int x = 1; } }");
    let cursor = cursor_at(&host, Kind::VarDecls, "int x");

    let mut template = Template::builder("int a = 1; int b = 2;").build();
    let snippets = template
        .generate_after(&cursor, &[])
        .expect("should generate");

    for snippet in &snippets {
        for node in descendants(snippet) {
            assert!(
                node.prefix().comments.iter().all(|c| !c.text.contains("<<<<")),
                "marker leaked into {}",
                node.print()
            );
        }
    }
}

#[test]
fn parse_failures_attach_the_synthesized_source() {
    let host = parse("class A { void m() { int x = 1; } }");
    let cursor = cursor_at(&host, Kind::VarDecls, "int x");

    let mut template = Template::builder(")").build();
    let err = template
        .generate_before(&cursor, &[])
        .expect_err("template cannot parse");
    match err {
        TemplateError::Parse { synthesized, .. } => {
            assert!(synthesized.contains("<<<<START>>>>"));
            assert!(synthesized.contains("int _x"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn generated_snippets_adopt_host_indentation() {
    let host = parse("class A {\n    void m() {\n        int x = 1;\n    }\n}");
    let cursor = cursor_at(&host, Kind::VarDecls, "int x");

    let mut template = Template::builder("f(#{});").build();
    let snippets = template
        .generate_after(&cursor, &[Param::from("x")])
        .expect("should generate");

    assert_eq!(snippets[0].prefix().whitespace, "\n        ");
    assert_eq!(snippets[0].print(), "\n        f(x);");
}
