//! Operator and function token tables.
//!
//! These are process-wide immutable constants: the compiler looks tokens up
//! here and never mutates them, so they are freely shareable across
//! concurrent compilations.

use serde::{Deserialize, Serialize};

/// Binary operator tokens.
///
/// The LIKE-family derived operators (contains / startswith / endswith and
/// their negated and case-insensitive variants) have no entry in
/// [`Operator::sql`]; the expression compiler rewrites them into LIKE with
/// wildcard concatenation instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    /// Floor division; emulated as FLOOR(l / r) for non-integer types.
    FloorDiv,
    Mod,
    Lt,
    Le,
    Ne,
    Gt,
    Ge,
    Eq,
    Is,
    IsNot,
    IsDistinctFrom,
    IsNotDistinctFrom,
    Concat,
    In,
    NotIn,
    Like,
    NotLike,
    ILike,
    NotILike,
    Between,
    NotBetween,
    Collate,
    Match,
    NotMatch,
    RegexpMatch,
    NotRegexpMatch,
    // Derived LIKE-family operators, rewritten by the compiler.
    Contains,
    NotContains,
    IContains,
    NotIContains,
    Startswith,
    NotStartswith,
    IStartswith,
    NotIStartswith,
    Endswith,
    NotEndswith,
    IEndswith,
    NotIEndswith,
}

impl Operator {
    /// Static token-to-fragment table for directly renderable operators.
    ///
    /// Returns `None` for operators the expression compiler special-cases
    /// (LIKE-family rewrites, ILIKE fallback, floor division, regexp).
    pub fn sql(&self) -> Option<&'static str> {
        match self {
            Operator::And => Some(" AND "),
            Operator::Or => Some(" OR "),
            Operator::Add => Some(" + "),
            Operator::Sub => Some(" - "),
            Operator::Mul => Some(" * "),
            Operator::Div => Some(" / "),
            Operator::Mod => Some(" % "),
            Operator::Lt => Some(" < "),
            Operator::Le => Some(" <= "),
            Operator::Ne => Some(" != "),
            Operator::Gt => Some(" > "),
            Operator::Ge => Some(" >= "),
            Operator::Eq => Some(" = "),
            Operator::Is => Some(" IS "),
            Operator::IsNot => Some(" IS NOT "),
            Operator::IsDistinctFrom => Some(" IS DISTINCT FROM "),
            Operator::IsNotDistinctFrom => Some(" IS NOT DISTINCT FROM "),
            Operator::Concat => Some(" || "),
            Operator::In => Some(" IN "),
            Operator::NotIn => Some(" NOT IN "),
            Operator::Like => Some(" LIKE "),
            Operator::NotLike => Some(" NOT LIKE "),
            Operator::Match => Some(" MATCH "),
            Operator::NotMatch => Some(" NOT MATCH "),
            Operator::Between => Some(" BETWEEN "),
            Operator::NotBetween => Some(" NOT BETWEEN "),
            Operator::Collate => Some(" COLLATE "),
            _ => None,
        }
    }

    /// Whether this operator compares its operands (feeds the cartesian
    /// product linter's edge collection).
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Lt
                | Operator::Le
                | Operator::Ne
                | Operator::Gt
                | Operator::Ge
                | Operator::Eq
                | Operator::Is
                | Operator::IsNot
                | Operator::IsDistinctFrom
                | Operator::IsNotDistinctFrom
                | Operator::In
                | Operator::NotIn
                | Operator::Like
                | Operator::NotLike
                | Operator::ILike
                | Operator::NotILike
        )
    }

    /// Lower binding precedence than AND/OR, used to decide parenthesization
    /// of nested boolean groups.
    pub fn is_boolean_conjunction(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

/// Unary operator tokens (rendered as prefixes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Exists,
    NotExists,
    Distinct,
    Any,
    All,
}

impl UnaryOp {
    pub fn sql(&self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT ",
            UnaryOp::Neg => "-",
            UnaryOp::Exists => "EXISTS ",
            UnaryOp::NotExists => "NOT EXISTS ",
            UnaryOp::Distinct => "DISTINCT ",
            UnaryOp::Any => "ANY ",
            UnaryOp::All => "ALL ",
        }
    }
}

/// Unary modifier tokens (rendered as suffixes, e.g. in ORDER BY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryModifier {
    Desc,
    Asc,
    NullsFirst,
    NullsLast,
}

impl UnaryModifier {
    pub fn sql(&self) -> &'static str {
        match self {
            UnaryModifier::Desc => " DESC",
            UnaryModifier::Asc => " ASC",
            UnaryModifier::NullsFirst => " NULLS FIRST",
            UnaryModifier::NullsLast => " NULLS LAST",
        }
    }
}

/// Join rendering keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    FullOuter,
    Cross,
}

/// Compound SELECT set-operation keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundKeyword {
    Union,
    UnionAll,
    Except,
    ExceptAll,
    Intersect,
    IntersectAll,
}

impl CompoundKeyword {
    pub fn sql(&self) -> &'static str {
        match self {
            CompoundKeyword::Union => "UNION",
            CompoundKeyword::UnionAll => "UNION ALL",
            CompoundKeyword::Except => "EXCEPT",
            CompoundKeyword::ExceptAll => "EXCEPT ALL",
            CompoundKeyword::Intersect => "INTERSECT",
            CompoundKeyword::IntersectAll => "INTERSECT ALL",
        }
    }
}

/// Function names rendered without parentheses or with fixed casing.
///
/// Everything not listed here renders as a quoted-if-needed identifier with
/// a parenthesized argument list.
pub fn known_function(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "coalesce" => Some("coalesce"),
        "random" => Some("random"),
        "sysdate" => Some("sysdate"),
        "current_date" => Some("CURRENT_DATE"),
        "current_time" => Some("CURRENT_TIME"),
        "current_timestamp" => Some("CURRENT_TIMESTAMP"),
        "current_user" => Some("CURRENT_USER"),
        "localtime" => Some("LOCALTIME"),
        "localtimestamp" => Some("LOCALTIMESTAMP"),
        "session_user" => Some("SESSION_USER"),
        "user" => Some("USER"),
        "cube" => Some("CUBE"),
        "rollup" => Some("ROLLUP"),
        "grouping_sets" => Some("GROUPING SETS"),
        _ => None,
    }
}

/// Functions rendered bare, without an argument list.
pub fn is_niladic_function(rendered: &str) -> bool {
    matches!(
        rendered,
        "CURRENT_DATE"
            | "CURRENT_TIME"
            | "CURRENT_TIMESTAMP"
            | "CURRENT_USER"
            | "LOCALTIME"
            | "LOCALTIMESTAMP"
            | "SESSION_USER"
            | "USER"
    )
}

/// Valid EXTRACT field names and their rendered spellings.
pub fn extract_field(field: &str) -> Option<&'static str> {
    match field.to_ascii_lowercase().as_str() {
        "month" => Some("month"),
        "day" => Some("day"),
        "year" => Some("year"),
        "second" => Some("second"),
        "hour" => Some("hour"),
        "doy" => Some("doy"),
        "minute" => Some("minute"),
        "quarter" => Some("quarter"),
        "dow" => Some("dow"),
        "week" => Some("week"),
        "epoch" => Some("epoch"),
        "milliseconds" => Some("milliseconds"),
        "microseconds" => Some("microseconds"),
        "timezone_hour" => Some("timezone_hour"),
        "timezone_minute" => Some("timezone_minute"),
        _ => None,
    }
}
