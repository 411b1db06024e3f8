//! The expression AST.
//!
//! A closed, immutable sum type: every node the compiler can render is a
//! variant here, dispatched by exhaustive match. Custom constructs a caller
//! needs beyond this set go through [`Expr::Text`] raw passthrough.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::ast::operators::{Operator, UnaryModifier, UnaryOp};
use crate::ast::stmt::SelectStatement;
use crate::ast::values::{TypeInfo, Value};

/// Deferred value provider for a bind parameter, resolved at execution time.
pub type ValueCallable = Arc<dyn Fn() -> Value + Send + Sync>;

static NEXT_LINEAGE: AtomicU64 = AtomicU64::new(1);

/// A named, typed placeholder.
///
/// The key is unique within one compiled statement; a second parameter with
/// the same key is either the same lineage (a clone, deduplicated) or gets
/// a disambiguation suffix. Same key + disjoint lineage + `unique` is a
/// compile error.
#[derive(Clone, Serialize, Deserialize)]
pub struct BindParam {
    /// Parameter key as given by the caller.
    pub key: String,
    /// The bound value, if known at construction time.
    pub value: Option<Value>,
    /// Deferred value provider, consulted when `value` is absent.
    #[serde(skip)]
    pub callable: Option<ValueCallable>,
    /// Declared type, consumed by the literal codec.
    pub ty: TypeInfo,
    /// Reject any same-named parameter of a different lineage.
    pub unique: bool,
    /// IN-list parameter whose rendering depends on the runtime collection
    /// length; deferred to the postcompile pass.
    pub expanding: bool,
    /// Render as an inline literal instead of a placeholder.
    pub literal_execute: bool,
    /// OUT parameter for stored-procedure style dialects.
    pub isoutparam: bool,
    /// Operator this parameter expands under (IN / NOT IN); recorded by
    /// the compiler so the postcompile pass can pick the correct empty-set
    /// fallback.
    pub expand_op: Option<Operator>,
    /// Shared by clones of one source parameter; disjoint lineages with the
    /// same key are unrelated parameters.
    pub lineage: u64,
}

impl BindParam {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            callable: None,
            ty: TypeInfo::Unspecified,
            unique: false,
            expanding: false,
            literal_execute: false,
            isoutparam: false,
            expand_op: None,
            lineage: NEXT_LINEAGE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn with_value(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(key)
        }
    }

    pub fn typed(mut self, ty: TypeInfo) -> Self {
        self.ty = ty;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn expanding(mut self) -> Self {
        self.expanding = true;
        self
    }

    pub fn literal_execute(mut self) -> Self {
        self.literal_execute = true;
        self
    }

    /// A copy sharing this parameter's lineage; clones never conflict with
    /// each other even when marked unique.
    pub fn clone_param(&self) -> Self {
        self.clone()
    }

    /// The value to render or bind: explicit value first, else the callable.
    pub fn effective_value(&self) -> Option<Value> {
        match (&self.value, &self.callable) {
            (Some(v), _) => Some(v.clone()),
            (None, Some(f)) => Some(f()),
            (None, None) => None,
        }
    }
}

impl std::fmt::Debug for BindParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindParam")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("has_callable", &self.callable.is_some())
            .field("ty", &self.ty)
            .field("unique", &self.unique)
            .field("expanding", &self.expanding)
            .field("literal_execute", &self.literal_execute)
            .field("lineage", &self.lineage)
            .finish()
    }
}

impl PartialEq for BindParam {
    fn eq(&self, other: &Self) -> bool {
        // callables compare by presence only
        self.key == other.key
            && self.value == other.value
            && self.ty == other.ty
            && self.unique == other.unique
            && self.expanding == other.expanding
            && self.literal_execute == other.literal_execute
            && self.callable.is_some() == other.callable.is_some()
    }
}

/// Window frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u64),
    CurrentRow,
    Following(u64),
    UnboundedFollowing,
}

/// Window frame definition for OVER clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WindowFrame {
    Rows { start: FrameBound, end: FrameBound },
    Range { start: FrameBound, end: FrameBound },
}

/// A general expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A column reference, optionally table-qualified.
    Column {
        table: Option<String>,
        name: String,
        ty: TypeInfo,
    },
    /// A bound placeholder.
    Bind(BindParam),
    /// Raw SQL text passthrough; never labeled, never quoted.
    Text(String),
    /// An explicitly labeled expression (`expr AS name`).
    Label { name: String, expr: Box<Expr> },
    /// Prefix operator and/or suffix modifier around one operand.
    Unary {
        op: Option<UnaryOp>,
        modifier: Option<UnaryModifier>,
        operand: Box<Expr>,
    },
    /// Infix binary expression.
    Binary {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
    },
    /// Function call; `name` is resolved against the known-function table.
    Function {
        name: String,
        args: Vec<Expr>,
        ty: TypeInfo,
    },
    /// CASE expression, simple (`value` set) or searched.
    Case {
        value: Option<Box<Expr>>,
        whens: Vec<(Expr, Expr)>,
        else_: Option<Box<Expr>>,
    },
    /// CAST(expr AS type-name).
    Cast {
        expr: Box<Expr>,
        type_name: String,
        ty: TypeInfo,
    },
    /// EXTRACT(field FROM expr).
    Extract { field: String, expr: Box<Expr> },
    /// Parenthesized comma list (tuple / row value).
    Tuple(Vec<Expr>),
    /// Bare comma-or-keyword separated clause list.
    ClauseList { exprs: Vec<Expr>, sep: String },
    /// Scalar subquery.
    Subquery(Box<SelectStatement>),
    /// Window application of a function.
    Over {
        func: Box<Expr>,
        partition_by: Vec<Expr>,
        order_by: Vec<Expr>,
        frame: Option<WindowFrame>,
        filter: Option<Box<Expr>>,
        within_group: Vec<Expr>,
    },
}

impl Expr {
    /// Unqualified column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
            ty: TypeInfo::Unspecified,
        }
    }

    /// Table-qualified column reference.
    pub fn table_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column {
            table: Some(table.into()),
            name: name.into(),
            ty: TypeInfo::Unspecified,
        }
    }

    pub fn bind(key: impl Into<String>) -> Self {
        Expr::Bind(BindParam::new(key))
    }

    pub fn bind_value(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Bind(BindParam::with_value(key, value))
    }

    pub fn label(self, name: impl Into<String>) -> Self {
        Expr::Label {
            name: name.into(),
            expr: Box::new(self),
        }
    }

    pub fn binary(left: Expr, op: Operator, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::binary(self, Operator::Eq, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::binary(self, Operator::And, other)
    }

    pub fn in_(self, other: Expr) -> Self {
        Expr::binary(self, Operator::In, other)
    }

    pub fn not(self) -> Self {
        Expr::Unary {
            op: Some(UnaryOp::Not),
            modifier: None,
            operand: Box::new(self),
        }
    }

    pub fn desc(self) -> Self {
        Expr::Unary {
            op: None,
            modifier: Some(UnaryModifier::Desc),
            operand: Box::new(self),
        }
    }

    pub fn asc(self) -> Self {
        Expr::Unary {
            op: None,
            modifier: Some(UnaryModifier::Asc),
            operand: Box::new(self),
        }
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
            ty: TypeInfo::Unspecified,
        }
    }

    pub fn cast(self, type_name: impl Into<String>) -> Self {
        Expr::Cast {
            expr: Box::new(self),
            type_name: type_name.into(),
            ty: TypeInfo::Unspecified,
        }
    }

    /// The declared type of this expression, where one exists.
    pub fn type_info(&self) -> TypeInfo {
        match self {
            Expr::Column { ty, .. } | Expr::Function { ty, .. } | Expr::Cast { ty, .. } => {
                ty.clone()
            }
            Expr::Bind(bind) => bind.ty.clone(),
            Expr::Label { expr, .. } => expr.type_info(),
            Expr::Unary { operand, .. } => operand.type_info(),
            _ => TypeInfo::Unspecified,
        }
    }

    /// Collect the FROM-object keys (table or alias names) this expression
    /// references. Feeds correlation resolution and the cartesian linter.
    pub fn from_objects(&self, out: &mut Vec<String>) {
        match self {
            Expr::Column {
                table: Some(table), ..
            } => {
                if !out.contains(table) {
                    out.push(table.clone());
                }
            }
            Expr::Column { table: None, .. } | Expr::Bind(_) | Expr::Text(_) => {}
            Expr::Label { expr, .. } | Expr::Cast { expr, .. } | Expr::Extract { expr, .. } => {
                expr.from_objects(out)
            }
            Expr::Unary { operand, .. } => operand.from_objects(out),
            Expr::Binary { left, right, .. } => {
                left.from_objects(out);
                right.from_objects(out);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.from_objects(out);
                }
            }
            Expr::Case {
                value,
                whens,
                else_,
            } => {
                if let Some(v) = value {
                    v.from_objects(out);
                }
                for (cond, result) in whens {
                    cond.from_objects(out);
                    result.from_objects(out);
                }
                if let Some(e) = else_ {
                    e.from_objects(out);
                }
            }
            Expr::Tuple(exprs) | Expr::ClauseList { exprs, .. } => {
                for e in exprs {
                    e.from_objects(out);
                }
            }
            // a subquery correlates internally; its froms are its own
            Expr::Subquery(_) => {}
            Expr::Over {
                func,
                partition_by,
                order_by,
                filter,
                within_group,
                ..
            } => {
                func.from_objects(out);
                for e in partition_by.iter().chain(order_by).chain(within_group) {
                    e.from_objects(out);
                }
                if let Some(f) = filter {
                    f.from_objects(out);
                }
            }
        }
    }
}
