//! Statement-level AST: SELECT, compound selects, DML, FROM items and CTEs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::expr::Expr;
use crate::ast::operators::{CompoundKeyword, JoinKind};

/// A named, possibly recursive common table expression.
///
/// CTEs are shared by `Arc`: the compiler identifies a CTE by reference
/// identity (after following restatement chains), so the same `Arc` used in
/// several places registers exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    pub name: String,
    pub body: SelectQuery,
    /// Explicit column-name list; required output for recursive CTEs.
    pub columns: Vec<String>,
    pub recursive: bool,
    /// Hoist this CTE to the nesting level where it occurs instead of the
    /// outermost WITH clause.
    pub nest_here: bool,
    /// The CTE this one replaces; the newer definition wins.
    pub restates: Option<Arc<Cte>>,
    /// Set on structurally identical copies produced by tree rewriting;
    /// same-named clones are treated as one CTE.
    pub clone_of: Option<Arc<Cte>>,
}

impl Cte {
    pub fn new(name: impl Into<String>, body: impl Into<SelectQuery>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            body: body.into(),
            columns: Vec::new(),
            recursive: false,
            nest_here: false,
            restates: None,
            clone_of: None,
        })
    }

    /// Follow the restatement chain to the original CTE.
    pub fn reference_cte(self: &Arc<Self>) -> Arc<Cte> {
        let mut current = Arc::clone(self);
        while let Some(prior) = current.restates.clone() {
            current = prior;
        }
        current
    }

    /// Structural comparison ignoring identity-tracking fields.
    pub fn compare(&self, other: &Cte) -> bool {
        self.name == other.name
            && self.body == other.body
            && self.columns == other.columns
            && self.recursive == other.recursive
    }
}

/// A SELECT source: plain or compound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectQuery {
    Select(SelectStatement),
    Compound(CompoundSelect),
}

impl SelectQuery {
    /// Projection width, used for compound column-count validation.
    pub fn column_count(&self) -> usize {
        match self {
            SelectQuery::Select(s) => s.columns.len(),
            SelectQuery::Compound(c) => {
                c.selects.first().map(|s| s.column_count()).unwrap_or(0)
            }
        }
    }
}

impl From<SelectStatement> for SelectQuery {
    fn from(s: SelectStatement) -> Self {
        SelectQuery::Select(s)
    }
}

impl From<CompoundSelect> for SelectQuery {
    fn from(c: CompoundSelect) -> Self {
        SelectQuery::Compound(c)
    }
}

/// One FROM-clause element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FromItem {
    Table {
        name: String,
        schema: Option<String>,
    },
    Alias {
        of: Box<FromItem>,
        name: String,
    },
    /// Derived table (subquery in FROM); always carries an alias name.
    Subquery {
        query: Box<SelectQuery>,
        alias: String,
        lateral: bool,
    },
    Join {
        left: Box<FromItem>,
        right: Box<FromItem>,
        on: Option<Expr>,
        kind: JoinKind,
    },
    Cte(Arc<Cte>),
}

impl FromItem {
    pub fn table(name: impl Into<String>) -> Self {
        FromItem::Table {
            name: name.into(),
            schema: None,
        }
    }

    pub fn table_in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        FromItem::Table {
            name: name.into(),
            schema: Some(schema.into()),
        }
    }

    pub fn alias(self, name: impl Into<String>) -> Self {
        FromItem::Alias {
            of: Box::new(self),
            name: name.into(),
        }
    }

    pub fn join(self, right: FromItem, on: Expr) -> Self {
        FromItem::Join {
            left: Box::new(self),
            right: Box::new(right),
            on: Some(on),
            kind: JoinKind::Inner,
        }
    }

    pub fn outerjoin(self, right: FromItem, on: Expr) -> Self {
        FromItem::Join {
            left: Box::new(self),
            right: Box::new(right),
            on: Some(on),
            kind: JoinKind::LeftOuter,
        }
    }

    /// The name this item is addressable by in column qualification.
    pub fn key(&self) -> &str {
        match self {
            FromItem::Table { name, .. } => name,
            FromItem::Alias { name, .. } => name,
            FromItem::Subquery { alias, .. } => alias,
            FromItem::Join { left, .. } => left.key(),
            FromItem::Cte(cte) => &cte.name,
        }
    }

    /// Collect addressable leaf keys, descending into both sides of joins.
    pub fn leaf_keys(&self, out: &mut Vec<String>) {
        match self {
            FromItem::Join { left, right, .. } => {
                left.leaf_keys(out);
                right.leaf_keys(out);
            }
            other => {
                let key = other.key().to_string();
                if !out.contains(&key) {
                    out.push(key);
                }
            }
        }
    }
}

/// FOR UPDATE row-locking options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForUpdate {
    pub nowait: bool,
    pub skip_locked: bool,
    /// FOR UPDATE OF targets.
    pub of: Vec<Expr>,
}

/// A SELECT statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectStatement {
    pub columns: Vec<Expr>,
    pub from: Vec<FromItem>,
    /// AND-joined WHERE criteria.
    pub where_clauses: Vec<Expr>,
    pub group_by: Vec<Expr>,
    /// AND-joined HAVING criteria.
    pub having: Vec<Expr>,
    pub order_by: Vec<Expr>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub distinct: bool,
    /// DISTINCT ON (...) expressions; requires dialect support.
    pub distinct_on: Vec<Expr>,
    pub for_update: Option<ForUpdate>,
    /// Explicit correlation override: FROM keys to take from the enclosing
    /// statement. `None` auto-correlates.
    pub correlate: Option<Vec<String>>,
    /// Inverse override: correlate everything except these keys.
    pub correlate_except: Option<Vec<String>>,
    /// CTEs attached to the statement without appearing in FROM.
    pub ctes: Vec<Arc<Cte>>,
    /// Keyword phrases rendered between SELECT and the projection.
    pub prefixes: Vec<String>,
}

impl SelectStatement {
    pub fn new(columns: Vec<Expr>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn from_item(mut self, item: FromItem) -> Self {
        self.from.push(item);
        self
    }

    pub fn where_clause(mut self, expr: Expr) -> Self {
        self.where_clauses.push(expr);
        self
    }

    pub fn order_by_expr(mut self, expr: Expr) -> Self {
        self.order_by.push(expr);
        self
    }
}

/// A compound (UNION / INTERSECT / EXCEPT) select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundSelect {
    pub keyword: CompoundKeyword,
    pub selects: Vec<SelectQuery>,
    pub order_by: Vec<Expr>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

impl CompoundSelect {
    pub fn union_all(selects: Vec<SelectQuery>) -> Self {
        Self {
            keyword: CompoundKeyword::UnionAll,
            selects,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// DML target table, optionally schema-qualified and hinted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    pub schema: Option<String>,
    /// Dialect hint text appended after the table name.
    pub hint: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            hint: None,
        }
    }

    pub fn in_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: Some(schema.into()),
            hint: None,
        }
    }
}

/// Value source of an INSERT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    /// Multi-row VALUES; one inner vector per row.
    Values(Vec<Vec<Expr>>),
    /// INSERT ... SELECT.
    Select(Box<SelectQuery>),
}

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub source: InsertSource,
    pub returning: Vec<Expr>,
    pub ctes: Vec<Arc<Cte>>,
}

impl InsertStatement {
    pub fn new(table: TableRef, columns: Vec<String>, values: Vec<Vec<Expr>>) -> Self {
        Self {
            table,
            columns,
            source: InsertSource::Values(values),
            returning: Vec::new(),
            ctes: Vec::new(),
        }
    }
}

/// An UPDATE statement; `values` preserves assignment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: TableRef,
    pub values: Vec<(String, Expr)>,
    pub where_clauses: Vec<Expr>,
    pub returning: Vec<Expr>,
    pub ctes: Vec<Arc<Cte>>,
}

impl UpdateStatement {
    pub fn new(table: TableRef, values: Vec<(String, Expr)>) -> Self {
        Self {
            table,
            values,
            where_clauses: Vec::new(),
            returning: Vec::new(),
            ctes: Vec::new(),
        }
    }
}

/// A DELETE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: TableRef,
    pub where_clauses: Vec<Expr>,
    pub returning: Vec<Expr>,
    pub ctes: Vec<Arc<Cte>>,
}

impl DeleteStatement {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            where_clauses: Vec::new(),
            returning: Vec::new(),
            ctes: Vec::new(),
        }
    }
}

/// Root of a compilable statement tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(SelectStatement),
    Compound(CompoundSelect),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Ddl(crate::ast::ddl::DdlStatement),
}

impl From<SelectStatement> for Statement {
    fn from(s: SelectStatement) -> Self {
        Statement::Select(s)
    }
}

impl From<InsertStatement> for Statement {
    fn from(s: InsertStatement) -> Self {
        Statement::Insert(s)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(s: UpdateStatement) -> Self {
        Statement::Update(s)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(s: DeleteStatement) -> Self {
        Statement::Delete(s)
    }
}
