//! End-to-end test: one realistic statement compiled through every
//! bundled dialect via the public API.

use std::collections::HashMap;

use sqlforge::prelude::*;

fn orders_report() -> Statement {
    let orders = FromItem::table("orders").join(
        FromItem::table("users"),
        Expr::table_column("orders", "user_id").eq(Expr::table_column("users", "id")),
    );
    Statement::Select(SelectStatement {
        columns: vec![
            Expr::table_column("users", "name"),
            Expr::func("sum", vec![Expr::table_column("orders", "total")]).label("revenue"),
        ],
        from: vec![orders],
        where_clauses: vec![
            Expr::table_column("orders", "status").eq(Expr::bind_value("status", "shipped")),
        ],
        group_by: vec![Expr::table_column("users", "name")],
        order_by: vec![Expr::Text("revenue".to_string()).desc()],
        limit: Some(Expr::bind_value("limit", 10)),
        ..SelectStatement::default()
    })
}

#[test]
fn test_postgres_rendering() {
    let compiled = compile(&orders_report(), &Dialect::postgres()).expect("compile failed");
    assert_eq!(
        compiled.sql,
        "SELECT users.name, sum(orders.total) AS revenue \
         FROM orders JOIN users ON orders.user_id = users.id \
         WHERE orders.status = %(status)s \
         GROUP BY users.name ORDER BY revenue DESC LIMIT %(limit)s"
    );
    assert!(compiled.positiontup.is_none());
    assert_eq!(
        compiled.bound_value("status"),
        Some(Value::String("shipped".to_string()))
    );
}

#[test]
fn test_sqlite_rendering_is_positional() {
    let compiled = compile(&orders_report(), &Dialect::sqlite()).expect("compile failed");
    assert!(compiled.sql.contains("orders.status = ?"));
    assert!(compiled.sql.ends_with("LIMIT ?"));
    assert_eq!(
        compiled.positiontup,
        Some(vec!["status".to_string(), "limit".to_string()])
    );
}

#[test]
fn test_oracle_uses_fetch_first() {
    let compiled = compile(&orders_report(), &Dialect::oracle()).expect("compile failed");
    assert!(compiled.sql.contains("FETCH FIRST :limit ROWS ONLY"));
    // no ORDER BY label support; the underlying expression is re-emitted
    assert!(compiled.sql.contains("ORDER BY sum(orders.total) DESC"));
}

#[test]
fn test_result_columns_expose_targets() {
    let compiled = compile(&orders_report(), &Dialect::postgres()).expect("compile failed");
    let names: Vec<&str> = compiled
        .result_columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["name", "revenue"]);
    assert!(
        compiled.result_columns[0]
            .targets
            .contains(&"users.name".to_string())
    );
}

#[test]
fn test_expanding_bind_through_public_api() {
    let stmt = Statement::Select(SelectStatement {
        columns: vec![Expr::table_column("t", "a")],
        from: vec![FromItem::table("t")],
        where_clauses: vec![Expr::table_column("t", "a").in_(Expr::Bind(
            BindParam::new("ids").expanding(),
        ))],
        ..SelectStatement::default()
    });
    let compiled = compile(&stmt, &Dialect::mysql()).expect("compile failed");
    assert!(compiled.needs_postcompile());

    let given: HashMap<String, Value> = [(
        "ids".to_string(),
        Value::Array(vec![Value::Int(1), Value::Int(2)]),
    )]
    .into();
    let expanded = compiled.expand(&given).expect("expand failed");
    assert_eq!(expanded.sql, "SELECT t.a FROM t WHERE t.a IN (%s, %s)");
}

#[test]
fn test_schema_translation_round_trip() {
    let stmt = Statement::Select(SelectStatement {
        columns: vec![Expr::table_column("users", "id")],
        from: vec![FromItem::table_in_schema("main", "users")],
        ..SelectStatement::default()
    });
    let mut dialect = Dialect::postgres();
    dialect.schema_translate_map = Some([("main".to_string(), "tenant_1".to_string())].into());
    let compiled = compile(&stmt, &dialect).expect("compile failed");
    assert!(compiled.sql.contains("__[SCHEMA_main]"));
    assert!(compiled.substitute_schemas().contains("tenant_1.users"));
}
