//! DDL statement AST: tables, columns, constraints, indexes, sequences.

use serde::{Deserialize, Serialize};

use crate::ast::expr::Expr;
use crate::ast::stmt::TableRef;
use crate::ast::values::Value;

/// Column DEFAULT clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultClause {
    /// A literal value, rendered through the literal codec.
    Literal(Value),
    /// Raw SQL text (e.g. `now()`).
    Text(String),
}

/// GENERATED ... AS IDENTITY options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Identity {
    /// GENERATED ALWAYS when true, GENERATED BY DEFAULT otherwise.
    pub always: bool,
    pub start: Option<i64>,
    pub increment: Option<i64>,
}

/// GENERATED ALWAYS AS (expr) computed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computed {
    pub expression: String,
    /// STORED when true, VIRTUAL otherwise.
    pub persisted: bool,
}

/// One column of a CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Dialect-side type name, rendered verbatim.
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<DefaultClause>,
    pub primary_key: bool,
    pub unique: bool,
    pub identity: Option<Identity>,
    pub computed: Option<Computed>,
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            default: None,
            primary_key: false,
            unique: false,
            identity: None,
            computed: None,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultClause::Literal(value.into()));
        self
    }

    pub fn default_text(mut self, text: impl Into<String>) -> Self {
        self.default = Some(DefaultClause::Text(text.into()));
        self
    }
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl RefAction {
    pub fn sql(&self) -> &'static str {
        match self {
            RefAction::Cascade => "CASCADE",
            RefAction::SetNull => "SET NULL",
            RefAction::SetDefault => "SET DEFAULT",
            RefAction::Restrict => "RESTRICT",
            RefAction::NoAction => "NO ACTION",
        }
    }
}

/// Table-level constraint.
///
/// A `None` name defers to the naming-convention resolver; if that also
/// declines, the constraint renders anonymously (and can then not be
/// dropped by name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
    Unique {
        name: Option<String>,
        columns: Vec<String>,
    },
    ForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        ref_table: TableRef,
        ref_columns: Vec<String>,
        on_delete: Option<RefAction>,
        on_update: Option<RefAction>,
        deferrable: bool,
        initially_deferred: bool,
    },
    Check {
        name: Option<String>,
        expr: Expr,
    },
}

impl TableConstraint {
    pub fn name(&self) -> Option<&str> {
        match self {
            TableConstraint::PrimaryKey { name, .. }
            | TableConstraint::Unique { name, .. }
            | TableConstraint::ForeignKey { name, .. }
            | TableConstraint::Check { name, .. } => name.as_deref(),
        }
    }

    /// Short kind tag handed to the naming-convention resolver.
    pub fn kind(&self) -> &'static str {
        match self {
            TableConstraint::PrimaryKey { .. } => "pk",
            TableConstraint::Unique { .. } => "uq",
            TableConstraint::ForeignKey { .. } => "fk",
            TableConstraint::Check { .. } => "ck",
        }
    }
}

/// A CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    pub table: TableRef,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub if_not_exists: bool,
    pub comment: Option<String>,
}

impl CreateTable {
    pub fn new(table: TableRef, columns: Vec<ColumnDef>) -> Self {
        Self {
            table,
            columns,
            constraints: Vec::new(),
            if_not_exists: false,
            comment: None,
        }
    }
}

/// An index definition, for CREATE INDEX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    /// `None` defers to the naming convention; DROP INDEX then requires a
    /// resolvable name.
    pub name: Option<String>,
    pub table: Option<TableRef>,
    pub columns: Vec<Expr>,
    pub unique: bool,
}

/// A sequence definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDef {
    pub name: String,
    pub schema: Option<String>,
    pub start: Option<i64>,
    pub increment: Option<i64>,
    pub cycle: bool,
}

impl SequenceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            start: None,
            increment: None,
            cycle: false,
        }
    }
}

/// Root of a compilable DDL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DdlStatement {
    CreateTable(CreateTable),
    DropTable {
        table: TableRef,
        if_exists: bool,
        cascade: bool,
    },
    CreateIndex(IndexDef),
    DropIndex(IndexDef),
    CreateSequence(SequenceDef),
    DropSequence(SequenceDef),
    AddConstraint {
        table: TableRef,
        constraint: TableConstraint,
    },
    DropConstraint {
        table: TableRef,
        name: Option<String>,
        cascade: bool,
    },
    SetTableComment {
        table: TableRef,
        comment: Option<String>,
    },
    SetColumnComment {
        table: TableRef,
        column: String,
        comment: Option<String>,
    },
}
