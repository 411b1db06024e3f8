//! CTE registration: reference-identity dedup, restatement, clones and
//! recursive rendering.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::ast::expr::Expr;
use crate::ast::stmt::{Cte, FromItem, SelectQuery, SelectStatement, Statement};
use crate::compiler::compile;
use crate::dialect::Dialect;
use crate::error::CompileError;

fn body_select(table: &str) -> SelectStatement {
    SelectStatement {
        columns: vec![Expr::table_column(table, "x")],
        from: vec![FromItem::table(table)],
        ..SelectStatement::default()
    }
}

fn select_from_ctes(ctes: Vec<Arc<Cte>>) -> Statement {
    let first = ctes[0].name.clone();
    Statement::Select(SelectStatement {
        columns: vec![Expr::table_column(&first, "x")],
        from: ctes.into_iter().map(FromItem::Cte).collect(),
        ..SelectStatement::default()
    })
}

#[test]
fn test_same_arc_registers_once() {
    let cte = Cte::new("src", body_select("u"));
    let stmt = select_from_ctes(vec![Arc::clone(&cte), cte]);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql.matches(" AS (").count(), 1);
    assert_eq!(
        compiled.sql,
        "WITH src AS (SELECT u.x FROM u) SELECT src.x FROM src, src"
    );
}

#[test]
fn test_unrelated_same_name_conflicts() {
    let one = Cte::new("cte1", body_select("u"));
    let two = Cte::new("cte1", body_select("v"));
    let stmt = select_from_ctes(vec![one, two]);
    let err = compile(&stmt, &Dialect::sqlite()).unwrap_err();
    match err {
        CompileError::StructuralConflict(message) => {
            assert!(message.contains("cte1"));
            assert!(message.contains("unrelated"));
        }
        other => panic!("expected StructuralConflict, got {:?}", other),
    }
}

#[test]
fn test_structural_clone_is_reused() {
    let original = Cte::new("src", body_select("u"));
    let clone = Arc::new(Cte {
        clone_of: Some(Arc::clone(&original)),
        ..(*original).clone()
    });
    let stmt = select_from_ctes(vec![original, clone]);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql.matches(" AS (").count(), 1);
}

#[test]
fn test_restatement_replaces_older_definition() {
    let older = Cte::new("src", body_select("u"));
    let newer = Arc::new(Cte {
        body: SelectQuery::from(body_select("v")),
        restates: Some(Arc::clone(&older)),
        ..(*older).clone()
    });
    let stmt = select_from_ctes(vec![older, newer]);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql.matches(" AS (").count(), 1);
    assert!(compiled.sql.contains("SELECT v.x FROM v"));
    assert!(!compiled.sql.contains("FROM u"));
}

#[test]
fn test_recursive_without_columns_is_an_error() {
    let cte = Arc::new(Cte {
        recursive: true,
        ..(*Cte::new("nums", body_select("u"))).clone()
    });
    let stmt = select_from_ctes(vec![cte]);
    let err = compile(&stmt, &Dialect::sqlite()).unwrap_err();
    match err {
        CompileError::MissingRequirement(message) => {
            assert!(message.contains("nums"));
            assert!(message.contains("column list"));
        }
        other => panic!("expected MissingRequirement, got {:?}", other),
    }
}

#[test]
fn test_recursive_with_columns_renders_with_recursive() {
    let cte = Arc::new(Cte {
        recursive: true,
        columns: vec!["n".to_string()],
        ..(*Cte::new("nums", body_select("u"))).clone()
    });
    let stmt = select_from_ctes(vec![cte]);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert!(compiled.sql.starts_with("WITH RECURSIVE nums(n) AS ("));
}

#[test]
fn test_nest_here_in_two_places_is_an_error() {
    let original = Cte::new("src", body_select("u"));
    let first = Arc::new(Cte {
        nest_here: true,
        restates: Some(Arc::clone(&original)),
        ..(*original).clone()
    });
    let second = Arc::new(Cte {
        nest_here: true,
        restates: Some(Arc::clone(&original)),
        ..(*original).clone()
    });
    let stmt = select_from_ctes(vec![first, second]);
    let err = compile(&stmt, &Dialect::sqlite()).unwrap_err();
    match err {
        CompileError::StructuralConflict(message) => {
            assert!(message.contains("nest_here"));
        }
        other => panic!("expected StructuralConflict, got {:?}", other),
    }
}

#[test]
fn test_nest_here_shared_across_levels_renders_once() {
    let cte = Arc::new(Cte {
        nest_here: true,
        ..(*Cte::new("src", body_select("u"))).clone()
    });
    let sub = SelectStatement {
        columns: vec![Expr::table_column("src", "x")],
        from: vec![FromItem::Cte(Arc::clone(&cte))],
        ..SelectStatement::default()
    };
    let stmt = Statement::Select(SelectStatement {
        columns: vec![Expr::table_column("src", "x")],
        from: vec![
            FromItem::Cte(cte),
            FromItem::Subquery {
                query: Box::new(SelectQuery::from(sub)),
                alias: "sq".to_string(),
                lateral: false,
            },
        ],
        ..SelectStatement::default()
    });
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql.matches(" AS (").count(), 1);
    assert_eq!(
        compiled.sql,
        "WITH src AS (SELECT u.x FROM u) \
         SELECT src.x FROM src, (SELECT src.x AS src_x FROM src) AS sq"
    );
}

#[test]
fn test_two_distinct_ctes_render_comma_separated() {
    let a = Cte::new("a_src", body_select("u"));
    let b = Cte::new("b_src", body_select("v"));
    let stmt = select_from_ctes(vec![a, b]);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "WITH a_src AS (SELECT u.x FROM u), b_src AS (SELECT v.x FROM v) \
         SELECT a_src.x FROM a_src, b_src"
    );
}
