//! Identifier quoting, case folding, truncation and schema translation.

use crate::ast::stmt::TableRef;
use crate::compiler::names::truncate_identifier;
use crate::dialect::{Dialect, is_reserved_word};

/// Prefix of the placeholder token embedded for schema-translate mode.
pub const SCHEMA_TOKEN_PREFIX: &str = "__[SCHEMA_";
pub const SCHEMA_TOKEN_SUFFIX: &str = "]";

/// Handles rendering of identifiers for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierPreparer<'d> {
    dialect: &'d Dialect,
}

impl<'d> IdentifierPreparer<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self { dialect }
    }

    /// Whether `name` cannot be rendered bare.
    fn requires_quotes(&self, name: &str) -> bool {
        if name.is_empty() {
            return true;
        }
        if is_reserved_word(&name.to_ascii_lowercase()) {
            return true;
        }
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return true;
        };
        if first.is_ascii_digit() || first == '$' {
            return true;
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return true;
        }
        // unquoted names case-fold on most targets; uppercase must survive
        if self.dialect.requires_quotes_on_case_mismatch
            && name.chars().any(|c| c.is_ascii_uppercase())
        {
            return true;
        }
        false
    }

    /// Wrap in dialect quote characters, doubling embedded closing quotes.
    pub fn quote_identifier(&self, name: &str) -> String {
        let fq = self.dialect.final_quote;
        let escaped = name.replace(fq, &format!("{}{}", fq, fq));
        format!("{}{}{}", self.dialect.initial_quote, escaped, fq)
    }

    /// Quote `name` only if it needs it.
    pub fn quote(&self, name: &str) -> String {
        if self.requires_quotes(name) {
            self.quote_identifier(name)
        } else {
            name.to_string()
        }
    }

    pub fn quote_schema(&self, schema: &str) -> String {
        self.quote(schema)
    }

    /// Resolve the schema to render for an object, honoring the dialect's
    /// schema-translate map.
    ///
    /// In translate mode the returned text is an opaque placeholder token;
    /// [`substitute_schemas`] replaces tokens with real names afterwards,
    /// so one compiled statement re-renders against different target
    /// schemas without recompiling.
    pub fn schema_for_object(&self, schema: Option<&str>) -> Option<String> {
        match (&self.dialect.schema_translate_map, schema) {
            (Some(_), Some(schema)) => Some(format!(
                "{}{}{}",
                SCHEMA_TOKEN_PREFIX, schema, SCHEMA_TOKEN_SUFFIX
            )),
            (Some(_), None) => None,
            (None, schema) => schema.map(str::to_string),
        }
    }

    /// Schema-qualified, quoted table path.
    pub fn format_table(&self, schema: Option<&str>, name: &str) -> String {
        match self.schema_for_object(schema) {
            // the token must pass through unquoted for later substitution
            Some(s) if s.starts_with(SCHEMA_TOKEN_PREFIX) => {
                format!("{}.{}", s, self.quote(name))
            }
            Some(s) => format!("{}.{}", self.quote_schema(&s), self.quote(name)),
            None => self.quote(name),
        }
    }

    pub fn format_table_ref(&self, table: &TableRef) -> String {
        self.format_table(table.schema.as_deref(), &table.name)
    }

    /// Table-qualified, quoted column path.
    pub fn format_column(&self, table: Option<&str>, name: &str) -> String {
        match table {
            Some(t) => format!("{}.{}", self.quote(t), self.quote(name)),
            None => self.quote(name),
        }
    }

    /// Alias name, truncated to the dialect identifier limit and quoted.
    pub fn format_alias(&self, name: &str) -> String {
        self.quote(&truncate_identifier(
            name,
            self.dialect.max_identifier_length,
        ))
    }

    /// Label name for `AS` clauses; same truncation rules as aliases.
    pub fn format_label(&self, name: &str) -> String {
        self.format_alias(name)
    }

    /// Constraint name, truncated to the constraint-name limit and quoted.
    pub fn format_constraint(&self, name: &str) -> String {
        self.quote(&truncate_identifier(
            name,
            self.dialect.constraint_name_length(),
        ))
    }

    /// Index name, truncated to the index-name limit and quoted.
    pub fn format_index(&self, name: &str) -> String {
        self.quote(&truncate_identifier(
            name,
            self.dialect.index_name_length(),
        ))
    }

    /// Split a rendered dotted identifier path back into its components,
    /// honoring quoting. Round-trips [`format_table`] / [`format_column`].
    pub fn unformat_identifiers(&self, text: &str) -> Vec<String> {
        let initial = self.dialect.initial_quote;
        let fq = self.dialect.final_quote;
        let mut out = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if in_quotes {
                if c == fq {
                    if chars.peek() == Some(&fq) {
                        chars.next();
                        current.push(fq);
                    } else {
                        in_quotes = false;
                    }
                } else {
                    current.push(c);
                }
            } else if c == initial {
                in_quotes = true;
            } else if c == '.' {
                out.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        out.push(current);
        out
    }
}

/// Replace schema placeholder tokens with quoted physical schema names.
pub fn substitute_schemas(sql: &str, dialect: &Dialect) -> String {
    let Some(map) = &dialect.schema_translate_map else {
        return sql.to_string();
    };
    let preparer = IdentifierPreparer::new(dialect);
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(start) = rest.find(SCHEMA_TOKEN_PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + SCHEMA_TOKEN_PREFIX.len()..];
        match after.find(SCHEMA_TOKEN_SUFFIX) {
            Some(end) => {
                let logical = &after[..end];
                let physical = map
                    .get(logical)
                    .map(String::as_str)
                    .unwrap_or(logical);
                out.push_str(&preparer.quote_schema(physical));
                rest = &after[end + SCHEMA_TOKEN_SUFFIX.len()..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_unquoted() {
        let dialect = Dialect::postgres();
        let preparer = IdentifierPreparer::new(&dialect);
        assert_eq!(preparer.quote("users"), "users");
        assert_eq!(preparer.quote("order_items"), "order_items");
    }

    #[test]
    fn test_reserved_and_illegal_names_quoted() {
        let dialect = Dialect::postgres();
        let preparer = IdentifierPreparer::new(&dialect);
        assert_eq!(preparer.quote("order"), "\"order\"");
        assert_eq!(preparer.quote("user"), "\"user\"");
        assert_eq!(preparer.quote("has space"), "\"has space\"");
        assert_eq!(preparer.quote("MixedCase"), "\"MixedCase\"");
        assert_eq!(preparer.quote("2fast"), "\"2fast\"");
    }

    #[test]
    fn test_embedded_quote_doubled() {
        let dialect = Dialect::postgres();
        let preparer = IdentifierPreparer::new(&dialect);
        assert_eq!(preparer.quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_mysql_backticks() {
        let dialect = Dialect::mysql();
        let preparer = IdentifierPreparer::new(&dialect);
        assert_eq!(preparer.quote("order"), "`order`");
    }

    #[test]
    fn test_unformat_round_trip() {
        let dialect = Dialect::postgres();
        let preparer = IdentifierPreparer::new(&dialect);
        let rendered = preparer.format_table(Some("public"), "order");
        assert_eq!(rendered, "public.\"order\"");
        assert_eq!(
            preparer.unformat_identifiers(&rendered),
            vec!["public".to_string(), "order".to_string()]
        );

        let col = preparer.format_column(Some("order"), "select");
        assert_eq!(
            preparer.unformat_identifiers(&col),
            vec!["order".to_string(), "select".to_string()]
        );
    }

    #[test]
    fn test_schema_translate_tokens() {
        let mut dialect = Dialect::postgres();
        dialect.schema_translate_map =
            Some([("main".to_string(), "tenant_42".to_string())].into());
        let preparer = IdentifierPreparer::new(&dialect);
        let rendered = preparer.format_table(Some("main"), "users");
        assert_eq!(rendered, "__[SCHEMA_main].users");
        assert_eq!(
            substitute_schemas(&rendered, &dialect),
            "tenant_42.users"
        );
    }
}
