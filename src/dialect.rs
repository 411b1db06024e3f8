//! Dialect descriptors: paramstyle, quoting characters, capability flags.
//!
//! A `Dialect` is read-only input shared by reference across a single
//! compilation; presets exist for the common targets and every knob is a
//! public field so callers can describe their own driver.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Placeholder syntax convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Paramstyle {
    /// `?`
    Qmark,
    /// `:1`, `:2`, ...
    Numeric,
    /// `:name`
    Named,
    /// `%s`
    Format,
    /// `%(name)s`
    Pyformat,
}

impl Paramstyle {
    /// Whether placeholders are matched by position rather than name.
    pub fn is_positional(&self) -> bool {
        matches!(self, Paramstyle::Qmark | Paramstyle::Numeric | Paramstyle::Format)
    }
}

/// LIMIT/OFFSET rendering family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH FIRST n ROWS ONLY`
    FetchFirst,
}

/// Reserved words of standard SQL plus the common extensions; names that
/// appear here always render quoted.
static RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "all", "analyse", "analyze", "and", "any", "array", "as", "asc",
        "asymmetric", "authorization", "between", "binary", "both", "case",
        "cast", "check", "collate", "column", "constraint", "create",
        "cross", "current_date", "current_role", "current_time",
        "current_timestamp", "current_user", "default", "deferrable",
        "desc", "distinct", "do", "else", "end", "except", "false", "for",
        "foreign", "freeze", "from", "full", "grant", "group", "having",
        "ilike", "in", "initially", "inner", "intersect", "into", "is",
        "isnull", "join", "leading", "left", "like", "limit", "localtime",
        "localtimestamp", "natural", "new", "not", "notnull", "null", "off",
        "offset", "old", "on", "only", "or", "order", "outer", "overlaps",
        "placing", "primary", "references", "right", "select",
        "session_user", "set", "similar", "some", "symmetric", "table",
        "then", "to", "trailing", "true", "union", "unique", "user",
        "using", "verbose", "when", "where",
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(word)
}

/// Capability flags and rendering knobs for one SQL target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialect {
    pub name: String,
    pub paramstyle: Paramstyle,

    // identifier rendering
    pub initial_quote: char,
    pub final_quote: char,
    pub max_identifier_length: usize,
    pub max_index_name_length: Option<usize>,
    pub max_constraint_name_length: Option<usize>,
    /// Unquoted identifiers fold to lower case on this target; a name with
    /// upper-case characters must therefore be quoted to survive.
    pub requires_quotes_on_case_mismatch: bool,
    /// Maps logical schema names to physical ones at post-compile time.
    pub schema_translate_map: Option<HashMap<String, String>>,

    // expression capabilities
    pub supports_native_boolean: bool,
    pub supports_ilike: bool,
    /// Infix operator text for regexp matching, e.g. `~` or `REGEXP`.
    pub regexp_match_op: Option<String>,
    pub supports_is_distinct_from: bool,
    pub supports_distinct_on: bool,
    pub supports_order_by_label: bool,

    // statement capabilities
    pub limit_style: LimitStyle,
    pub insert_returning: bool,
    pub update_returning: bool,
    pub delete_returning: bool,
    /// RETURNING renders before the VALUES clause (e.g. OUTPUT on SQL
    /// Server) instead of at the end.
    pub returning_precedes_values: bool,
    /// `INSERT INTO t DEFAULT VALUES` for zero-column inserts.
    pub supports_default_values: bool,
    pub supports_multivalues_insert: bool,
    pub use_insertmanyvalues: bool,
    pub use_insertmanyvalues_wo_returning: bool,
    /// Driver bound-parameter ceiling per statement, for batch sizing.
    pub insertmanyvalues_max_parameters: Option<usize>,
    pub supports_sequences: bool,
    pub supports_comments: bool,
    pub supports_identity_columns: bool,
    /// Spell empty IN lists with native empty-row syntax; no preset target
    /// here has it, so the truth-table fallback is the normal path.
    pub supports_empty_in: bool,
    /// Render expanding tuple IN lists as `VALUES (...), (...)`.
    pub tuple_in_values: bool,
}

impl Dialect {
    /// A permissive ANSI-flavored default; what [`Default`] returns.
    pub fn ansi() -> Self {
        Self {
            name: "ansi".into(),
            paramstyle: Paramstyle::Named,
            initial_quote: '"',
            final_quote: '"',
            max_identifier_length: 255,
            max_index_name_length: None,
            max_constraint_name_length: None,
            requires_quotes_on_case_mismatch: true,
            schema_translate_map: None,
            supports_native_boolean: true,
            supports_ilike: false,
            regexp_match_op: None,
            supports_is_distinct_from: true,
            supports_distinct_on: false,
            supports_order_by_label: true,
            limit_style: LimitStyle::LimitOffset,
            insert_returning: false,
            update_returning: false,
            delete_returning: false,
            returning_precedes_values: false,
            supports_default_values: true,
            supports_multivalues_insert: true,
            use_insertmanyvalues: false,
            use_insertmanyvalues_wo_returning: false,
            insertmanyvalues_max_parameters: None,
            supports_sequences: true,
            supports_comments: true,
            supports_identity_columns: true,
            supports_empty_in: false,
            tuple_in_values: false,
        }
    }

    pub fn postgres() -> Self {
        Self {
            name: "postgresql".into(),
            paramstyle: Paramstyle::Pyformat,
            max_identifier_length: 63,
            supports_ilike: true,
            regexp_match_op: Some("~".into()),
            supports_distinct_on: true,
            insert_returning: true,
            update_returning: true,
            delete_returning: true,
            use_insertmanyvalues: true,
            use_insertmanyvalues_wo_returning: true,
            tuple_in_values: true,
            ..Self::ansi()
        }
    }

    pub fn mysql() -> Self {
        Self {
            name: "mysql".into(),
            paramstyle: Paramstyle::Format,
            initial_quote: '`',
            final_quote: '`',
            max_identifier_length: 64,
            regexp_match_op: Some("REGEXP".into()),
            supports_is_distinct_from: false,
            supports_sequences: false,
            supports_default_values: false,
            use_insertmanyvalues: true,
            use_insertmanyvalues_wo_returning: true,
            ..Self::ansi()
        }
    }

    pub fn sqlite() -> Self {
        Self {
            name: "sqlite".into(),
            paramstyle: Paramstyle::Qmark,
            supports_native_boolean: false,
            regexp_match_op: Some("REGEXP".into()),
            insert_returning: true,
            update_returning: true,
            delete_returning: true,
            supports_sequences: false,
            supports_comments: false,
            supports_identity_columns: false,
            use_insertmanyvalues: true,
            use_insertmanyvalues_wo_returning: true,
            insertmanyvalues_max_parameters: Some(32_766),
            ..Self::ansi()
        }
    }

    pub fn oracle() -> Self {
        Self {
            name: "oracle".into(),
            paramstyle: Paramstyle::Named,
            max_identifier_length: 30,
            supports_native_boolean: false,
            limit_style: LimitStyle::FetchFirst,
            supports_multivalues_insert: false,
            supports_default_values: false,
            supports_order_by_label: false,
            ..Self::ansi()
        }
    }

    pub fn mssql() -> Self {
        Self {
            name: "mssql".into(),
            paramstyle: Paramstyle::Qmark,
            initial_quote: '[',
            final_quote: ']',
            max_identifier_length: 128,
            supports_native_boolean: false,
            limit_style: LimitStyle::FetchFirst,
            returning_precedes_values: true,
            insert_returning: true,
            supports_default_values: true,
            use_insertmanyvalues: true,
            insertmanyvalues_max_parameters: Some(2_099),
            ..Self::ansi()
        }
    }

    /// Effective max length for index names.
    pub fn index_name_length(&self) -> usize {
        self.max_index_name_length
            .unwrap_or(self.max_identifier_length)
    }

    /// Effective max length for constraint names.
    pub fn constraint_name_length(&self) -> usize {
        self.max_constraint_name_length
            .unwrap_or(self.max_identifier_length)
    }

    /// Placeholder text for one bind position.
    ///
    /// `index` is the 1-based position, consumed only by the positional
    /// numeric style.
    pub fn bind_template(&self, name: &str, index: usize) -> String {
        match self.paramstyle {
            Paramstyle::Qmark => "?".to_string(),
            Paramstyle::Numeric => format!(":{}", index),
            Paramstyle::Named => format!(":{}", name),
            Paramstyle::Format => "%s".to_string(),
            Paramstyle::Pyformat => format!("%({})s", name),
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::ansi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved_word("select"));
        assert!(is_reserved_word("user"));
        assert!(!is_reserved_word("users"));
    }

    #[test]
    fn test_bind_templates() {
        assert_eq!(Dialect::sqlite().bind_template("x", 1), "?");
        assert_eq!(Dialect::oracle().bind_template("x", 1), ":x");
        assert_eq!(Dialect::postgres().bind_template("x", 1), "%(x)s");
        assert_eq!(Dialect::mysql().bind_template("x", 3), "%s");
        let mut numeric = Dialect::ansi();
        numeric.paramstyle = Paramstyle::Numeric;
        assert_eq!(numeric.bind_template("x", 3), ":3");
    }

    #[test]
    fn test_positional() {
        assert!(Paramstyle::Qmark.is_positional());
        assert!(Paramstyle::Format.is_positional());
        assert!(!Paramstyle::Named.is_positional());
        assert!(!Paramstyle::Pyformat.is_positional());
    }
}
