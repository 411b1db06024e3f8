//! DDL rendering: tables, indexes, sequences, constraints and comments.

use pretty_assertions::assert_eq;

use crate::ast::ddl::{
    ColumnDef, Computed, CreateTable, DdlStatement, Identity, IndexDef, RefAction, SequenceDef,
    TableConstraint,
};
use crate::ast::expr::Expr;
use crate::ast::stmt::{Statement, TableRef};
use crate::compiler::{CompileOptions, ConstraintNamer, compile, compile_with_options};
use crate::dialect::Dialect;
use crate::error::CompileError;

fn ddl(stmt: DdlStatement) -> Statement {
    Statement::Ddl(stmt)
}

#[test]
fn test_create_table_with_column_options() {
    let create = CreateTable::new(
        TableRef::new("users"),
        vec![
            ColumnDef::new("id", "INTEGER").primary_key(),
            ColumnDef::new("name", "VARCHAR(50)").not_null(),
            ColumnDef::new("score", "INTEGER").default_value(0),
        ],
    );
    let compiled = compile(&ddl(DdlStatement::CreateTable(create)), &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE TABLE users (id INTEGER NOT NULL PRIMARY KEY, \
         name VARCHAR(50) NOT NULL, score INTEGER DEFAULT 0)"
    );
}

#[test]
fn test_table_level_pk_suppresses_column_flag() {
    let mut create = CreateTable::new(
        TableRef::new("pairs"),
        vec![
            ColumnDef::new("a", "INTEGER").primary_key(),
            ColumnDef::new("b", "INTEGER").primary_key(),
        ],
    );
    create.constraints = vec![TableConstraint::PrimaryKey {
        name: None,
        columns: vec!["a".to_string(), "b".to_string()],
    }];
    let compiled = compile(&ddl(DdlStatement::CreateTable(create)), &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE TABLE pairs (a INTEGER NOT NULL, b INTEGER NOT NULL, PRIMARY KEY (a, b))"
    );
}

#[test]
fn test_create_table_without_columns_is_an_error() {
    let create = CreateTable::new(TableRef::new("empty_one"), vec![]);
    let err = compile(&ddl(DdlStatement::CreateTable(create)), &Dialect::sqlite()).unwrap_err();
    match err {
        CompileError::MissingRequirement(message) => {
            assert!(message.contains("empty_one"));
        }
        other => panic!("expected MissingRequirement, got {:?}", other),
    }
}

#[test]
fn test_check_constraint_inlines_literals() {
    let mut create = CreateTable::new(
        TableRef::new("t"),
        vec![ColumnDef::new("score", "INTEGER")],
    );
    create.constraints = vec![TableConstraint::Check {
        name: Some("score_positive".to_string()),
        expr: Expr::binary(
            Expr::column("score"),
            crate::ast::operators::Operator::Gt,
            Expr::bind_value("threshold", 0),
        ),
    }];
    let compiled = compile(&ddl(DdlStatement::CreateTable(create)), &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE TABLE t (score INTEGER, CONSTRAINT score_positive CHECK (score > 0))"
    );
    assert!(compiled.binds.is_empty());
}

struct PrefixNamer;

impl ConstraintNamer for PrefixNamer {
    fn name_constraint(&self, kind: &str, table: &str, columns: &[String]) -> Option<String> {
        Some(format!("{}_{}_{}", kind, table, columns.join("_")))
    }
}

#[test]
fn test_naming_convention_fills_missing_names() {
    let mut create = CreateTable::new(
        TableRef::new("t"),
        vec![ColumnDef::new("a", "INTEGER")],
    );
    create.constraints = vec![TableConstraint::Unique {
        name: None,
        columns: vec!["a".to_string()],
    }];
    let options = CompileOptions {
        constraint_namer: Some(std::sync::Arc::new(PrefixNamer)),
        ..CompileOptions::default()
    };
    let compiled = compile_with_options(
        &ddl(DdlStatement::CreateTable(create)),
        &Dialect::sqlite(),
        options,
    )
    .unwrap();
    assert!(compiled.sql.contains("CONSTRAINT uq_t_a UNIQUE (a)"));
}

#[test]
fn test_foreign_key_with_actions() {
    let constraint = TableConstraint::ForeignKey {
        name: Some("fk_orders_user".to_string()),
        columns: vec!["user_id".to_string()],
        ref_table: TableRef::new("users"),
        ref_columns: vec!["id".to_string()],
        on_delete: Some(RefAction::Cascade),
        on_update: Some(RefAction::SetNull),
        deferrable: true,
        initially_deferred: true,
    };
    let stmt = ddl(DdlStatement::AddConstraint {
        table: TableRef::new("orders"),
        constraint,
    });
    let compiled = compile(&stmt, &Dialect::postgres()).unwrap();
    assert_eq!(
        compiled.sql,
        "ALTER TABLE orders ADD CONSTRAINT fk_orders_user FOREIGN KEY (user_id) \
         REFERENCES users (id) ON DELETE CASCADE ON UPDATE SET NULL \
         DEFERRABLE INITIALLY DEFERRED"
    );
}

#[test]
fn test_create_and_drop_index() {
    let index = IndexDef {
        name: Some("ix_t_a".to_string()),
        table: Some(TableRef::new("t")),
        columns: vec![Expr::column("a"), Expr::func("lower", vec![Expr::column("b")])],
        unique: true,
    };
    let compiled = compile(
        &ddl(DdlStatement::CreateIndex(index.clone())),
        &Dialect::sqlite(),
    )
    .unwrap();
    assert_eq!(compiled.sql, "CREATE UNIQUE INDEX ix_t_a ON t (a, lower(b))");

    let dropped = compile(&ddl(DdlStatement::DropIndex(index)), &Dialect::sqlite()).unwrap();
    assert_eq!(dropped.sql, "DROP INDEX ix_t_a");
}

#[test]
fn test_drop_unnamed_index_is_an_error() {
    let index = IndexDef {
        name: None,
        table: Some(TableRef::new("t")),
        columns: vec![Expr::column("a")],
        unique: false,
    };
    let err = compile(&ddl(DdlStatement::DropIndex(index)), &Dialect::sqlite()).unwrap_err();
    assert!(matches!(err, CompileError::MissingRequirement(_)));
}

#[test]
fn test_drop_table_variants() {
    let stmt = ddl(DdlStatement::DropTable {
        table: TableRef::new("t"),
        if_exists: true,
        cascade: true,
    });
    let compiled = compile(&stmt, &Dialect::postgres()).unwrap();
    assert_eq!(compiled.sql, "DROP TABLE IF EXISTS t CASCADE");
}

#[test]
fn test_sequences_gated_by_dialect() {
    let mut seq = SequenceDef::new("order_ids");
    seq.start = Some(100);
    seq.increment = Some(5);
    seq.cycle = true;
    let stmt = ddl(DdlStatement::CreateSequence(seq.clone()));

    let compiled = compile(&stmt, &Dialect::postgres()).unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE SEQUENCE order_ids START WITH 100 INCREMENT BY 5 CYCLE"
    );

    let err = compile(&stmt, &Dialect::mysql()).unwrap_err();
    match err {
        CompileError::UnsupportedConstruct(message) => {
            assert!(message.contains("mysql"));
        }
        other => panic!("expected UnsupportedConstruct, got {:?}", other),
    }

    let dropped = compile(&ddl(DdlStatement::DropSequence(seq)), &Dialect::postgres()).unwrap();
    assert_eq!(dropped.sql, "DROP SEQUENCE order_ids");
}

#[test]
fn test_comments_render_or_reject() {
    let stmt = ddl(DdlStatement::SetTableComment {
        table: TableRef::new("t"),
        comment: Some("it's data".to_string()),
    });
    let compiled = compile(&stmt, &Dialect::postgres()).unwrap();
    assert_eq!(compiled.sql, "COMMENT ON TABLE t IS 'it''s data'");

    let err = compile(&stmt, &Dialect::sqlite()).unwrap_err();
    assert!(matches!(err, CompileError::CapabilityGap { .. }));

    let cleared = ddl(DdlStatement::SetColumnComment {
        table: TableRef::new("t"),
        column: "a".to_string(),
        comment: None,
    });
    let compiled = compile(&cleared, &Dialect::postgres()).unwrap();
    assert_eq!(compiled.sql, "COMMENT ON COLUMN t.a IS NULL");
}

#[test]
fn test_identity_column_gated_by_dialect() {
    let mut column = ColumnDef::new("id", "INTEGER");
    column.identity = Some(Identity {
        always: true,
        start: Some(1),
        increment: None,
    });
    let create = CreateTable::new(TableRef::new("t"), vec![column]);
    let stmt = ddl(DdlStatement::CreateTable(create));

    let compiled = compile(&stmt, &Dialect::postgres()).unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE TABLE t (id INTEGER GENERATED ALWAYS AS IDENTITY (START WITH 1))"
    );

    let err = compile(&stmt, &Dialect::sqlite()).unwrap_err();
    assert!(matches!(err, CompileError::CapabilityGap { .. }));
}

#[test]
fn test_computed_column() {
    let mut column = ColumnDef::new("total", "INTEGER");
    column.computed = Some(Computed {
        expression: "price * qty".to_string(),
        persisted: true,
    });
    let create = CreateTable::new(TableRef::new("t"), vec![column]);
    let compiled = compile(&ddl(DdlStatement::CreateTable(create)), &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "CREATE TABLE t (total INTEGER GENERATED ALWAYS AS (price * qty) STORED)"
    );
}

#[test]
fn test_drop_constraint() {
    let stmt = ddl(DdlStatement::DropConstraint {
        table: TableRef::new("t"),
        name: Some("uq_t_a".to_string()),
        cascade: false,
    });
    let compiled = compile(&stmt, &Dialect::postgres()).unwrap();
    assert_eq!(compiled.sql, "ALTER TABLE t DROP CONSTRAINT uq_t_a");

    let unnamed = ddl(DdlStatement::DropConstraint {
        table: TableRef::new("t"),
        name: None,
        cascade: false,
    });
    let err = compile(&unnamed, &Dialect::postgres()).unwrap_err();
    assert!(matches!(err, CompileError::MissingRequirement(_)));
}
