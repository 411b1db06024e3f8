//! INSERT/UPDATE/DELETE compilation, RETURNING gating and
//! insertmanyvalues batching.

use pretty_assertions::assert_eq;

use crate::ast::expr::Expr;
use crate::ast::stmt::{
    DeleteStatement, FromItem, InsertSource, InsertStatement, SelectQuery, SelectStatement,
    Statement, TableRef, UpdateStatement,
};
use crate::ast::values::Value;
use crate::compiler::compile;
use crate::dialect::Dialect;
use crate::error::CompileError;

fn two_column_insert() -> InsertStatement {
    InsertStatement::new(
        TableRef::new("t"),
        vec!["a".to_string(), "b".to_string()],
        vec![vec![Expr::bind_value("a", 1), Expr::bind_value("b", 2)]],
    )
}

#[test]
fn test_basic_insert_sqlite() {
    let stmt = Statement::Insert(two_column_insert());
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql, "INSERT INTO t (a, b) VALUES (?, ?)");
    assert_eq!(
        compiled.positiontup,
        Some(vec!["a".to_string(), "b".to_string()])
    );
}

#[test]
fn test_insert_records_batching_template() {
    let stmt = Statement::Insert(two_column_insert());
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    let imv = compiled.insertmanyvalues.as_ref().unwrap();
    assert_eq!(imv.single_values_expr, "?, ?");
    assert_eq!(imv.insert_crud_params.len(), 2);
    assert_eq!(imv.num_positional_params, 2);
}

#[test]
fn test_batches_respect_max_parameter_ceiling() {
    let mut dialect = Dialect::sqlite();
    dialect.insertmanyvalues_max_parameters = Some(10);
    let stmt = Statement::Insert(two_column_insert());
    let compiled = compile(&stmt, &dialect).unwrap();

    let rows: Vec<Vec<Value>> = (0..13)
        .map(|n| vec![Value::Int(n), Value::Int(n * 10)])
        .collect();
    let batches = compiled.insertmanyvalues_batches(&rows, 100).unwrap();
    assert_eq!(
        batches.iter().map(|b| b.rows).collect::<Vec<_>>(),
        vec![5, 5, 3]
    );
    assert_eq!(
        batches.iter().map(|b| b.params.len()).collect::<Vec<_>>(),
        vec![10, 10, 6]
    );
    assert_eq!(
        batches[0].sql,
        "INSERT INTO t (a, b) VALUES (?, ?), (?, ?), (?, ?), (?, ?), (?, ?)"
    );
    assert_eq!(
        batches[2].sql,
        "INSERT INTO t (a, b) VALUES (?, ?), (?, ?), (?, ?)"
    );
    assert_eq!(batches[1].params[0], ("a".to_string(), Value::Int(5)));
}

#[test]
fn test_named_batches_suffix_row_numbers() {
    let mut dialect = Dialect::ansi();
    dialect.use_insertmanyvalues = true;
    dialect.use_insertmanyvalues_wo_returning = true;
    let stmt = Statement::Insert(two_column_insert());
    let compiled = compile(&stmt, &dialect).unwrap();
    assert_eq!(compiled.sql, "INSERT INTO t (a, b) VALUES (:a, :b)");

    let rows = vec![
        vec![Value::Int(1), Value::Int(2)],
        vec![Value::Int(3), Value::Int(4)],
    ];
    let batches = compiled.insertmanyvalues_batches(&rows, 50).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].sql,
        "INSERT INTO t (a, b) VALUES (:a__1, :b__1), (:a__2, :b__2)"
    );
    assert_eq!(
        batches[0].params,
        vec![
            ("a__1".to_string(), Value::Int(1)),
            ("b__1".to_string(), Value::Int(2)),
            ("a__2".to_string(), Value::Int(3)),
            ("b__2".to_string(), Value::Int(4)),
        ]
    );
}

#[test]
fn test_batch_row_width_mismatch_is_an_error() {
    let stmt = Statement::Insert(two_column_insert());
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    let rows = vec![vec![Value::Int(1)]];
    let err = compiled.insertmanyvalues_batches(&rows, 10).unwrap_err();
    assert!(matches!(err, CompileError::StructuralConflict(_)));
}

#[test]
fn test_empty_insert_default_values() {
    let stmt = Statement::Insert(InsertStatement::new(TableRef::new("t"), vec![], vec![]));
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql, "INSERT INTO t DEFAULT VALUES");
}

#[test]
fn test_empty_insert_without_default_values_support() {
    let stmt = Statement::Insert(InsertStatement::new(TableRef::new("t"), vec![], vec![]));
    let err = compile(&stmt, &Dialect::mysql()).unwrap_err();
    match err {
        CompileError::CapabilityGap { dialect, .. } => assert_eq!(dialect, "mysql"),
        other => panic!("expected CapabilityGap, got {:?}", other),
    }
}

#[test]
fn test_multirow_insert_unsupported_on_oracle() {
    let stmt = Statement::Insert(InsertStatement::new(
        TableRef::new("t"),
        vec!["a".to_string()],
        vec![
            vec![Expr::bind_value("a", 1)],
            vec![Expr::bind_value("a", 2)],
        ],
    ));
    let err = compile(&stmt, &Dialect::oracle()).unwrap_err();
    assert!(matches!(err, CompileError::CapabilityGap { .. }));
}

#[test]
fn test_insert_from_select() {
    let source = SelectStatement {
        columns: vec![Expr::table_column("s", "a"), Expr::table_column("s", "b")],
        from: vec![FromItem::table("s")],
        ..SelectStatement::default()
    };
    let stmt = Statement::Insert(InsertStatement {
        table: TableRef::new("t"),
        columns: vec!["a".to_string(), "b".to_string()],
        source: InsertSource::Select(Box::new(SelectQuery::from(source))),
        returning: Vec::new(),
        ctes: Vec::new(),
    });
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO t (a, b) SELECT s.a, s.b FROM s"
    );
}

#[test]
fn test_insert_returning_builds_result_map() {
    let mut insert = two_column_insert();
    insert.returning = vec![Expr::column("id")];
    let stmt = Statement::Insert(insert);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO t (a, b) VALUES (?, ?) RETURNING id"
    );
    assert_eq!(compiled.result_columns.len(), 1);
    assert_eq!(compiled.result_columns[0].name, "id");
}

#[test]
fn test_returning_binds_positioned_after_values() {
    let mut insert = two_column_insert();
    insert.returning = vec![Expr::binary(
        Expr::column("id"),
        crate::ast::operators::Operator::Add,
        Expr::bind_value("off", 100),
    )];
    let stmt = Statement::Insert(insert);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO t (a, b) VALUES (?, ?) RETURNING id + ? AS anon_1"
    );
    // positional order follows the text: VALUES binds before RETURNING
    assert_eq!(
        compiled.positiontup,
        Some(vec!["a".to_string(), "b".to_string(), "off".to_string()])
    );
}

#[test]
fn test_batches_carry_constant_params() {
    let mut insert = two_column_insert();
    insert.returning = vec![Expr::binary(
        Expr::column("id"),
        crate::ast::operators::Operator::Add,
        Expr::bind_value("off", 100),
    )];
    let stmt = Statement::Insert(insert);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();

    let rows = vec![
        vec![Value::Int(1), Value::Int(2)],
        vec![Value::Int(3), Value::Int(4)],
    ];
    let batches = compiled.insertmanyvalues_batches(&rows, 50).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].sql,
        "INSERT INTO t (a, b) VALUES (?, ?), (?, ?) RETURNING id + ? AS anon_1"
    );
    assert_eq!(
        batches[0].params,
        vec![
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
            ("a".to_string(), Value::Int(3)),
            ("b".to_string(), Value::Int(4)),
            ("off".to_string(), Value::Int(100)),
        ]
    );
}

#[test]
fn test_returning_precedes_values_on_mssql() {
    let mut insert = two_column_insert();
    insert.returning = vec![Expr::column("id")];
    let stmt = Statement::Insert(insert);
    let compiled = compile(&stmt, &Dialect::mssql()).unwrap();
    assert_eq!(
        compiled.sql,
        "INSERT INTO t (a, b) RETURNING id VALUES (?, ?)"
    );
}

#[test]
fn test_update_basic() {
    let mut update = UpdateStatement::new(
        TableRef::new("t"),
        vec![
            ("a".to_string(), Expr::bind_value("a", 1)),
            ("b".to_string(), Expr::bind_value("b", 2)),
        ],
    );
    update.where_clauses = vec![Expr::table_column("t", "id").eq(Expr::bind_value("id", 9))];
    let stmt = Statement::Update(update);
    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql, "UPDATE t SET a = ?, b = ? WHERE t.id = ?");
    assert_eq!(
        compiled.positiontup,
        Some(vec!["a".to_string(), "b".to_string(), "id".to_string()])
    );
}

#[test]
fn test_update_without_assignments_is_an_error() {
    let stmt = Statement::Update(UpdateStatement::new(TableRef::new("t"), vec![]));
    let err = compile(&stmt, &Dialect::sqlite()).unwrap_err();
    match err {
        CompileError::MissingRequirement(message) => {
            assert!(message.contains("no SET assignments"));
        }
        other => panic!("expected MissingRequirement, got {:?}", other),
    }
}

#[test]
fn test_update_returning_gated_by_dialect() {
    let mut update = UpdateStatement::new(
        TableRef::new("t"),
        vec![("a".to_string(), Expr::bind_value("a", 1))],
    );
    update.returning = vec![Expr::column("a")];
    let stmt = Statement::Update(update);

    let compiled = compile(&stmt, &Dialect::sqlite()).unwrap();
    assert_eq!(compiled.sql, "UPDATE t SET a = ? RETURNING a");

    let err = compile(&stmt, &Dialect::ansi()).unwrap_err();
    assert!(matches!(err, CompileError::CapabilityGap { .. }));
}

#[test]
fn test_delete_with_returning() {
    let mut delete = DeleteStatement::new(TableRef::new("t"));
    delete.where_clauses = vec![Expr::table_column("t", "id").eq(Expr::bind_value("id", 3))];
    delete.returning = vec![Expr::column("id")];
    let stmt = Statement::Delete(delete);
    let compiled = compile(&stmt, &Dialect::postgres()).unwrap();
    assert_eq!(
        compiled.sql,
        "DELETE FROM t WHERE t.id = %(id)s RETURNING id"
    );
}

#[test]
fn test_dml_table_hint_appended() {
    let mut insert = two_column_insert();
    insert.table.hint = Some("WITH (TABLOCK)".to_string());
    let stmt = Statement::Insert(insert);
    let compiled = compile(&stmt, &Dialect::mssql()).unwrap();
    assert!(compiled.sql.starts_with("INSERT INTO t WITH (TABLOCK) ("));
}
