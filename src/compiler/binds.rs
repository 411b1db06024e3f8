//! Bind-parameter naming, literal rendering, and the postcompile protocol:
//! expanding IN-list parameters, literal-execute parameters, and multi-row
//! INSERT batching.

use std::collections::HashMap;

use crate::ast::expr::BindParam;
use crate::ast::operators::Operator;
use crate::ast::values::{TypeInfo, Value};
use crate::compiler::names::truncate_identifier;
use crate::compiler::{Compiled, Ctx, SqlCompiler};
use crate::dialect::{Dialect, Paramstyle};
use crate::error::{CompileError, CompileResult};

/// Encodes a [`Value`] as inline SQL literal text.
///
/// This is the seam for the external type/value codec; the built-in
/// implementation covers the [`Value`] variants and standard escaping.
pub trait LiteralCodec {
    fn render_literal(&self, value: &Value, ty: &TypeInfo, dialect: &Dialect)
    -> CompileResult<String>;
}

/// The built-in literal encoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCodec;

impl LiteralCodec for DefaultCodec {
    fn render_literal(
        &self,
        value: &Value,
        ty: &TypeInfo,
        dialect: &Dialect,
    ) -> CompileResult<String> {
        Ok(match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => {
                if dialect.supports_native_boolean {
                    if *b { "true" } else { "false" }.to_string()
                } else {
                    if *b { "1" } else { "0" }.to_string()
                }
            }
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => quote_literal(s),
            Value::Uuid(u) => format!("'{}'", u),
            Value::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Date(d) => format!("'{}'", d),
            Value::Json(j) => quote_literal(&j.to_string()),
            Value::Tuple(vals) | Value::Array(vals) => {
                let element_types: Vec<TypeInfo> = match ty {
                    TypeInfo::Tuple(types) => types.clone(),
                    other => vec![other.clone(); vals.len()],
                };
                let parts: Vec<String> = vals
                    .iter()
                    .zip(element_types.iter().chain(std::iter::repeat(&TypeInfo::Unspecified)))
                    .map(|(v, t)| self.render_literal(v, t, dialect))
                    .collect::<CompileResult<_>>()?;
                format!("({})", parts.join(", "))
            }
        })
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Postcompile token wrapping for a bind name.
fn postcompile_token(name: &str) -> String {
    format!("__[POSTCOMPILE_{}]", name)
}

impl<'d> SqlCompiler<'d> {
    pub(crate) fn codec(&self) -> std::sync::Arc<dyn LiteralCodec + Send + Sync> {
        self.options
            .codec
            .clone()
            .unwrap_or_else(|| std::sync::Arc::new(DefaultCodec))
    }

    /// Assign the stable in-statement name of a bind parameter,
    /// deduplicating clones and disambiguating unrelated same-key
    /// parameters.
    pub(crate) fn bind_param_name(&mut self, bind: &BindParam) -> CompileResult<String> {
        if let Some(existing) = self.bind_names_by_lineage.get(&bind.lineage) {
            return Ok(existing.clone());
        }

        let mut name = truncate_identifier(&bind.key, self.dialect.max_identifier_length);
        while let Some(existing) = self.binds.get(&name) {
            if existing.lineage == bind.lineage {
                break;
            }
            if existing.unique || bind.unique {
                return Err(CompileError::conflict(format!(
                    "Bind parameter '{}' conflicts with unique bind parameter of the same name",
                    name
                )));
            }
            if existing.expanding != bind.expanding {
                return Err(CompileError::conflict(format!(
                    "Can't reuse bound parameter name '{}' in both expanding and \
                     non-expanding contexts",
                    name
                )));
            }
            name = self.names.next_bind_suffix(&bind.key);
        }

        self.bind_names_by_lineage.insert(bind.lineage, name.clone());
        self.binds.entry(name.clone()).or_insert_with(|| bind.clone());
        Ok(name)
    }

    /// Render a bind parameter node into placeholder (or literal) text.
    pub(crate) fn render_bind(&mut self, bind: &BindParam, ctx: Ctx) -> CompileResult<String> {
        if ctx.literal_binds {
            let text = self.render_literal_param(bind, ctx)?;
            return Ok(if bind.expanding {
                format!("({})", text)
            } else {
                text
            });
        }

        let name = self.bind_param_name(bind)?;

        if bind.isoutparam {
            self.has_out_parameters = true;
        }

        // record the expansion operator for the postcompile pass
        if let Some(op) = ctx.binary_op
            && bind.expanding
            && matches!(op, Operator::In | Operator::NotIn)
            && let Some(stored) = self.binds.get_mut(&name)
        {
            stored.expand_op = Some(op);
        }

        let post_compile = bind.literal_execute || bind.expanding;
        if post_compile {
            if bind.literal_execute {
                self.literal_execute_params.insert(name.clone());
            } else {
                self.post_compile_params.insert(name.clone());
                // holds one slot in the positional ordering until expanded
                if self.dialect.paramstyle.is_positional() {
                    self.positiontup.push(name.clone());
                }
            }
            let token = postcompile_token(&name);
            return Ok(if bind.expanding {
                format!("({})", token)
            } else {
                token
            });
        }

        Ok(self.bindparam_string(&name))
    }

    /// Emit the paramstyle placeholder for one resolved bind name and
    /// record its position.
    pub(crate) fn bindparam_string(&mut self, name: &str) -> String {
        if self.dialect.paramstyle.is_positional() {
            self.positiontup.push(name.to_string());
        }
        self.dialect.bind_template(name, self.positiontup.len())
    }

    /// Inline a parameter's value as a literal (literal-binds mode).
    fn render_literal_param(&mut self, bind: &BindParam, ctx: Ctx) -> CompileResult<String> {
        let Some(value) = bind.effective_value() else {
            // comparisons against literal NULL outside IS / IS NOT are
            // almost always a bug in the input tree
            if let Some(op) = ctx.binary_op
                && !matches!(op, Operator::Is | Operator::IsNot)
            {
                self.warn(format!(
                    "Bound parameter '{}' rendering literal NULL in a SQL expression; \
                     comparisons to NULL should use IS or IS NOT",
                    bind.key
                ));
            }
            return Ok("NULL".to_string());
        };
        if bind.expanding {
            let values = collection_values(&value);
            if values.is_empty() {
                let mut effective = bind.clone();
                if effective.expand_op.is_none()
                    && let Some(op) = ctx.binary_op
                    && matches!(op, Operator::In | Operator::NotIn)
                {
                    effective.expand_op = Some(op);
                }
                return empty_set_expr(&effective, self.dialect);
            }
            let codec = self.codec();
            let parts: Vec<String> = values
                .iter()
                .map(|v| codec.render_literal(v, &bind.ty, self.dialect))
                .collect::<CompileResult<_>>()?;
            return Ok(parts.join(", "));
        }
        self.codec().render_literal(&value, &bind.ty, self.dialect)
    }
}

/// The collection behind an expanding parameter value.
fn collection_values(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(vals) | Value::Tuple(vals) => vals.clone(),
        other => vec![other.clone()],
    }
}

/// Dialect-correct replacement for an empty IN / NOT IN collection.
///
/// The fragment is rendered *inside* the parens the expanding parameter
/// already emitted, so `(NULL) AND (1 != 1)` comes out of the text
/// `NULL) AND (1 != 1` placed between them. Always false for empty IN,
/// always true for empty NOT IN, regardless of NULLs in the left operand.
fn empty_set_expr(bind: &BindParam, dialect: &Dialect) -> CompileResult<String> {
    let width = bind.ty.width();
    let nulls = vec!["NULL"; width].join(", ");
    match bind.expand_op {
        Some(Operator::NotIn) => Ok(if width > 1 {
            format!("({})) OR (1 = 1", nulls)
        } else {
            "NULL) OR (1 = 1".to_string()
        }),
        Some(Operator::In) | None => Ok(if width > 1 {
            format!("({})) AND (1 != 1", nulls)
        } else {
            "NULL) AND (1 != 1".to_string()
        }),
        Some(other) => Err(CompileError::unsupported(format!(
            "Dialect '{}' does not support an empty set expression under operator {:?}",
            dialect.name, other
        ))),
    }
}

/// Output of [`Compiled::expand`]: final SQL plus parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedStatement {
    pub sql: String,
    /// Parameters in placeholder order; names are meaningful for named
    /// paramstyles and positional order is authoritative otherwise.
    pub params: Vec<(String, Value)>,
}

/// One batch of a multi-row INSERT execution.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBatch {
    pub sql: String,
    /// Rows covered by this batch.
    pub rows: usize,
    /// Parameters in placeholder order, VALUES-clause names suffixed per
    /// row for named paramstyles.
    pub params: Vec<(String, Value)>,
}

impl Compiled {
    /// Resolve expanding and literal-execute parameters against runtime
    /// values, producing final SQL and the ordered parameter list.
    ///
    /// `given` overrides any value embedded in the parameter itself.
    pub fn expand(&self, given: &HashMap<String, Value>) -> CompileResult<ExpandedStatement> {
        let codec = DefaultCodec;
        let mut sql = String::with_capacity(self.sql.len());
        let mut rest = self.sql.as_str();
        // per expanding-parameter generated (name, value) pairs
        let mut generated: HashMap<String, Vec<(String, Value)>> = HashMap::new();

        while let Some(start) = rest.find("__[POSTCOMPILE_") {
            sql.push_str(&rest[..start]);
            let after = &rest[start + "__[POSTCOMPILE_".len()..];
            let end = after.find(']').ok_or_else(|| {
                CompileError::conflict("malformed postcompile token in compiled SQL".to_string())
            })?;
            let name = &after[..end];
            rest = &after[end + 1..];

            let bind = self.binds.get(name).ok_or_else(|| {
                CompileError::missing(format!(
                    "no bind parameter recorded for postcompile token '{}'",
                    name
                ))
            })?;
            let value = given
                .get(name)
                .cloned()
                .or_else(|| bind.effective_value());

            if self.literal_execute_params.contains(name) {
                sql.push_str(&self.expand_literal(bind, name, value, &codec)?);
            } else {
                sql.push_str(&self.expand_placeholders(
                    bind,
                    name,
                    value,
                    &mut generated,
                )?);
            }
        }
        sql.push_str(rest);

        let params = self.ordered_params(given, &generated);
        let sql = match self.dialect.paramstyle {
            Paramstyle::Numeric => renumber_numeric(&sql),
            _ => sql,
        };
        Ok(ExpandedStatement { sql, params })
    }

    fn expand_literal(
        &self,
        bind: &BindParam,
        name: &str,
        value: Option<Value>,
        codec: &DefaultCodec,
    ) -> CompileResult<String> {
        let Some(value) = value else {
            return Err(CompileError::missing(format!(
                "no value supplied for literal-execute parameter '{}'",
                name
            )));
        };
        if bind.expanding {
            let values = collection_values(&value);
            if values.is_empty() {
                return empty_set_expr(bind, &self.dialect);
            }
            let parts: Vec<String> = values
                .iter()
                .map(|v| codec.render_literal(v, &bind.ty, &self.dialect))
                .collect::<CompileResult<_>>()?;
            Ok(parts.join(", "))
        } else {
            codec.render_literal(&value, &bind.ty, &self.dialect)
        }
    }

    fn expand_placeholders(
        &self,
        bind: &BindParam,
        name: &str,
        value: Option<Value>,
        generated: &mut HashMap<String, Vec<(String, Value)>>,
    ) -> CompileResult<String> {
        let Some(value) = value else {
            return Err(CompileError::missing(format!(
                "no value supplied for expanding parameter '{}'",
                name
            )));
        };
        let values = collection_values(&value);
        if values.is_empty() {
            generated.insert(name.to_string(), Vec::new());
            return empty_set_expr(bind, &self.dialect);
        }

        let mut pairs = Vec::new();
        let mut fragments = Vec::new();
        for (i, element) in values.iter().enumerate() {
            match element {
                // tuple element: one placeholder per member
                Value::Tuple(members) => {
                    let mut member_texts = Vec::new();
                    for (j, member) in members.iter().enumerate() {
                        let gen_name = format!("{}_{}_{}", name, i + 1, j + 1);
                        member_texts
                            .push(self.dialect.bind_template(&gen_name, pairs.len() + 1));
                        pairs.push((gen_name, member.clone()));
                    }
                    fragments.push(format!("({})", member_texts.join(", ")));
                }
                _ => {
                    let gen_name = format!("{}_{}", name, i + 1);
                    fragments.push(self.dialect.bind_template(&gen_name, pairs.len() + 1));
                    pairs.push((gen_name, element.clone()));
                }
            }
        }
        let tuple_mode = values.iter().any(|v| matches!(v, Value::Tuple(_)));
        let text = if tuple_mode && self.dialect.tuple_in_values {
            format!("VALUES {}", fragments.join(", "))
        } else {
            fragments.join(", ")
        };
        generated.insert(name.to_string(), pairs);
        Ok(text)
    }

    /// Final parameter ordering: positional dialects splice the generated
    /// names into the recorded placeholder order; named dialects simply
    /// collect every remaining placeholder.
    fn ordered_params(
        &self,
        given: &HashMap<String, Value>,
        generated: &HashMap<String, Vec<(String, Value)>>,
    ) -> Vec<(String, Value)> {
        let lookup = |name: &str| -> Value {
            given
                .get(name)
                .cloned()
                .or_else(|| self.binds.get(name).and_then(|b| b.effective_value()))
                .unwrap_or(Value::Null)
        };
        match &self.positiontup {
            Some(order) => {
                let mut out = Vec::new();
                for name in order {
                    match generated.get(name) {
                        Some(pairs) => out.extend(pairs.iter().cloned()),
                        None => out.push((name.clone(), lookup(name))),
                    }
                }
                out
            }
            None => {
                let mut out: Vec<(String, Value)> = self
                    .binds
                    .keys()
                    .filter(|name| {
                        !self.post_compile_params.contains(*name)
                            && !self.literal_execute_params.contains(*name)
                    })
                    .map(|name| (name.clone(), lookup(name)))
                    .collect();
                out.sort_by(|a, b| a.0.cmp(&b.0));
                for pairs in generated.values() {
                    out.extend(pairs.iter().cloned());
                }
                out
            }
        }
    }

    /// Break a multi-row INSERT into driver-sized batches.
    ///
    /// `rows` carries per-row VALUES-clause parameter values, one entry per
    /// crud parameter, in crud-parameter order. `batch_size` is the
    /// caller's preferred rows-per-batch; the dialect's max-parameter
    /// ceiling shrinks it further so that
    /// `rows_per_batch * K + constant_params <= M`.
    pub fn insertmanyvalues_batches(
        &self,
        rows: &[Vec<Value>],
        batch_size: usize,
    ) -> CompileResult<Vec<InsertBatch>> {
        let imv = self.insertmanyvalues.as_ref().ok_or_else(|| {
            CompileError::missing(
                "statement was not compiled with an insertmanyvalues template".to_string(),
            )
        })?;

        let per_row = if self.dialect.paramstyle.is_positional() {
            imv.num_positional_params.max(1)
        } else {
            imv.insert_crud_params.len().max(1)
        };
        let mut batch_size = batch_size.max(1);
        if let Some(max_params) = self.dialect.insertmanyvalues_max_parameters {
            let constant = self.binds.len().saturating_sub(per_row);
            let ceiling = max_params.saturating_sub(constant) / per_row;
            batch_size = batch_size.min(ceiling.max(1));
        }

        // parameters outside the VALUES clause are held constant across
        // every batch, at their placeholder positions
        let (leading, trailing) = self.constant_batch_params(imv);

        let values_clause = format!("({})", imv.single_values_expr);
        let mut out = Vec::new();
        let mut remaining = rows;
        let mut row_base = 0usize;
        while !remaining.is_empty() {
            let take = remaining.len().min(batch_size);
            let (batch, rest) = remaining.split_at(take);
            remaining = rest;

            let (clause, row_params) = self.render_batch(imv, batch, row_base)?;
            let sql = self.sql.replacen(&values_clause, &clause, 1);
            let mut params = leading.clone();
            params.extend(row_params);
            params.extend(trailing.iter().cloned());
            out.push(InsertBatch {
                sql,
                rows: take,
                params,
            });
            row_base += take;
        }
        Ok(out)
    }

    /// Non-VALUES parameters of an insertmanyvalues statement, split into
    /// those placed before and after the VALUES clause.
    fn constant_batch_params(
        &self,
        imv: &crate::compiler::InsertManyValues,
    ) -> (Vec<(String, Value)>, Vec<(String, Value)>) {
        let values_keys: std::collections::HashSet<&str> = imv
            .insert_crud_params
            .iter()
            .flat_map(|p| p.bind_keys.iter().map(String::as_str))
            .collect();
        let skip = |name: &str| {
            values_keys.contains(name)
                || self.post_compile_params.contains(name)
                || self.literal_execute_params.contains(name)
        };
        let value_of = |name: &str| -> Value {
            self.binds
                .get(name)
                .and_then(|b| b.effective_value())
                .unwrap_or(Value::Null)
        };

        match &self.positiontup {
            Some(order) => {
                let mut leading = Vec::new();
                let mut trailing = Vec::new();
                let mut seen_values = false;
                for name in order {
                    if values_keys.contains(name.as_str()) {
                        seen_values = true;
                    } else if !skip(name) {
                        let pair = (name.clone(), value_of(name));
                        if seen_values {
                            trailing.push(pair);
                        } else {
                            leading.push(pair);
                        }
                    }
                }
                (leading, trailing)
            }
            None => {
                let mut names: Vec<&String> =
                    self.binds.keys().filter(|n| !skip(n)).collect();
                names.sort();
                let trailing = names
                    .into_iter()
                    .map(|n| (n.clone(), value_of(n)))
                    .collect();
                (Vec::new(), trailing)
            }
        }
    }

    fn render_batch(
        &self,
        imv: &crate::compiler::InsertManyValues,
        batch: &[Vec<Value>],
        row_base: usize,
    ) -> CompileResult<(String, Vec<(String, Value)>)> {
        let mut params = Vec::new();
        let mut row_texts = Vec::new();
        for (r, row) in batch.iter().enumerate() {
            if row.len() != imv.insert_crud_params.len() {
                return Err(CompileError::conflict(format!(
                    "row {} supplies {} values for {} insert parameters",
                    row_base + r,
                    row.len(),
                    imv.insert_crud_params.len()
                )));
            }
            if self.dialect.paramstyle.is_positional() {
                row_texts.push(format!("({})", imv.single_values_expr));
                for (param, value) in imv.insert_crud_params.iter().zip(row) {
                    let key = param
                        .bind_keys
                        .first()
                        .cloned()
                        .unwrap_or_else(|| param.key.clone());
                    params.push((key, value.clone()));
                }
            } else {
                // suffix each VALUES-clause placeholder with the row number
                let rownum = row_base + r + 1;
                let mut text = imv.single_values_expr.clone();
                for (param, value) in imv.insert_crud_params.iter().zip(row) {
                    for key in param
                        .bind_keys
                        .iter()
                        .cloned()
                        .chain(param.bind_keys.is_empty().then(|| param.key.clone()))
                    {
                        let suffixed = format!("{}__{}", key, rownum);
                        text = text.replace(
                            &self.dialect.bind_template(&key, 0),
                            &self.dialect.bind_template(&suffixed, 0),
                        );
                        params.push((suffixed, value.clone()));
                    }
                }
                row_texts.push(format!("({})", text));
            }
        }
        Ok((row_texts.join(", "), params))
    }
}

/// Re-number `:N` placeholders sequentially after token expansion changed
/// the placeholder count. Skips `::` casts and quoted strings.
fn renumber_numeric(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;
    let mut counter = 0usize;
    let mut in_string = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            out.push(c);
            if c == '\'' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ':' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                    out.push_str("::");
                    i += 2;
                } else {
                    let mut j = i + 1;
                    while j < bytes.len() && bytes[j].is_ascii_digit() {
                        j += 1;
                    }
                    if j > i + 1 {
                        counter += 1;
                        out.push_str(&format!(":{}", counter));
                        i = j;
                    } else {
                        out.push(':');
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}
