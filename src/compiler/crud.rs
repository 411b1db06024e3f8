//! DML compilation: INSERT (including the multi-row batching template),
//! UPDATE and DELETE.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ast::expr::Expr;
use crate::ast::stmt::{
    DeleteStatement, InsertSource, InsertStatement, TableRef, UpdateStatement,
};
use crate::compiler::{Ctx, Frame, InsertManyValues, SqlCompiler};
use crate::error::{CompileError, CompileResult};

/// One VALUES-clause column of an INSERT template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrudParam {
    /// Column the parameter feeds.
    pub key: String,
    /// Bind names rendered in the single-row template for this column.
    pub bind_keys: Vec<String>,
}

/// Supplies names for anonymous DDL constraints (the naming-convention
/// seam).
pub trait ConstraintNamer {
    /// A name for an unnamed constraint of `kind` ("pk", "uq", "fk", "ck")
    /// on `table`, or `None` to render it nameless.
    fn name_constraint(&self, kind: &str, table: &str, columns: &[String]) -> Option<String>;
}

impl<'d> SqlCompiler<'d> {
    pub(crate) fn visit_insert(
        &mut self,
        insert: &InsertStatement,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let ctx = ctx.descend()?;
        self.stack.push(Frame {
            froms: vec![insert.table.name.clone()],
        });
        let result = self.render_insert(insert, ctx);
        self.stack.pop();
        result
    }

    fn render_insert(&mut self, insert: &InsertStatement, ctx: Ctx) -> CompileResult<String> {
        for cte in &insert.ctes {
            self.register_cte(cte, ctx)?;
        }

        let mut out = format!("INSERT INTO {}", self.format_dml_table(&insert.table));

        let default_values = insert.columns.is_empty()
            && matches!(&insert.source, InsertSource::Values(rows)
                if rows.is_empty() || rows.iter().all(|r| r.is_empty()));
        if default_values {
            if !self.dialect.supports_default_values {
                return Err(CompileError::capability(
                    &self.dialect.name,
                    "INSERT with no column values requires DEFAULT VALUES support",
                ));
            }
            out.push_str(" DEFAULT VALUES");
            if self.dialect.use_insertmanyvalues && self.dialect.use_insertmanyvalues_wo_returning
            {
                self.imv = Some(InsertManyValues {
                    is_default_expr: true,
                    single_values_expr: String::new(),
                    insert_crud_params: Vec::new(),
                    num_positional_params: 0,
                });
            }
            out.push_str(&self.render_returning(
                &insert.returning,
                self.dialect.insert_returning,
                ctx,
            )?);
            return Ok(out);
        }

        if !insert.columns.is_empty() {
            let preparer = self.preparer();
            let cols: Vec<String> = insert.columns.iter().map(|c| preparer.quote(c)).collect();
            out.push_str(&format!(" ({})", cols.join(", ")));
        }

        // RETURNING renders at its textual position so its binds claim
        // positional slots in placeholder order
        if self.dialect.returning_precedes_values {
            let clause =
                self.render_returning(&insert.returning, self.dialect.insert_returning, ctx)?;
            out.push_str(&clause);
        }

        match &insert.source {
            InsertSource::Values(rows) => {
                if rows.len() > 1 && !self.dialect.supports_multivalues_insert {
                    return Err(CompileError::capability(
                        &self.dialect.name,
                        "multi-row VALUES clauses are not supported",
                    ));
                }
                let mut row_texts = Vec::new();
                let mut crud_params = Vec::new();
                let positional_before = self.positiontup.len();
                for (r, row) in rows.iter().enumerate() {
                    if row.len() != insert.columns.len() {
                        return Err(CompileError::conflict(format!(
                            "VALUES row {} has {} expressions for {} columns",
                            r,
                            row.len(),
                            insert.columns.len()
                        )));
                    }
                    let mut cells = Vec::new();
                    for (column, expr) in insert.columns.iter().zip(row) {
                        let before: HashSet<String> = self.binds.keys().cloned().collect();
                        cells.push(self.visit_expr(expr, ctx.operand())?);
                        if r == 0 {
                            let mut bind_keys: Vec<String> = self
                                .binds
                                .keys()
                                .filter(|k| !before.contains(*k))
                                .cloned()
                                .collect();
                            bind_keys.sort();
                            crud_params.push(CrudParam {
                                key: column.clone(),
                                bind_keys,
                            });
                        }
                    }
                    row_texts.push(format!("({})", cells.join(", ")));
                }
                let num_positional = self.positiontup.len() - positional_before;

                out.push_str(" VALUES ");
                out.push_str(&row_texts.join(", "));

                let record_template = self.dialect.use_insertmanyvalues
                    && rows.len() == 1
                    && (!insert.returning.is_empty()
                        || self.dialect.use_insertmanyvalues_wo_returning);
                if record_template {
                    let single = row_texts[0]
                        .strip_prefix('(')
                        .and_then(|s| s.strip_suffix(')'))
                        .unwrap_or(&row_texts[0])
                        .to_string();
                    self.imv = Some(InsertManyValues {
                        is_default_expr: false,
                        single_values_expr: single,
                        insert_crud_params: crud_params,
                        num_positional_params: num_positional,
                    });
                }
            }
            InsertSource::Select(query) => {
                out.push(' ');
                out.push_str(&self.visit_select_query(query, false, ctx)?);
            }
        }

        if !self.dialect.returning_precedes_values {
            let clause =
                self.render_returning(&insert.returning, self.dialect.insert_returning, ctx)?;
            out.push_str(&clause);
        }
        Ok(out)
    }

    pub(crate) fn visit_update(
        &mut self,
        update: &UpdateStatement,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let ctx = ctx.descend()?;
        self.stack.push(Frame {
            froms: vec![update.table.name.clone()],
        });
        let result = self.render_update(update, ctx);
        self.stack.pop();
        result
    }

    fn render_update(&mut self, update: &UpdateStatement, ctx: Ctx) -> CompileResult<String> {
        for cte in &update.ctes {
            self.register_cte(cte, ctx)?;
        }
        if update.values.is_empty() {
            return Err(CompileError::missing(
                "UPDATE statement has no SET assignments",
            ));
        }

        let mut out = format!("UPDATE {} SET ", self.format_dml_table(&update.table));
        let mut assignments = Vec::new();
        for (column, expr) in &update.values {
            let target = self.preparer().quote(column);
            let value = self.visit_expr(expr, ctx.operand())?;
            assignments.push(format!("{} = {}", target, value));
        }
        out.push_str(&assignments.join(", "));

        if let Some(where_clause) = self.render_and_list(&update.where_clauses, ctx)? {
            out.push_str(" WHERE ");
            out.push_str(&where_clause);
        }
        out.push_str(&self.render_returning(
            &update.returning,
            self.dialect.update_returning,
            ctx,
        )?);
        Ok(out)
    }

    pub(crate) fn visit_delete(
        &mut self,
        delete: &DeleteStatement,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let ctx = ctx.descend()?;
        self.stack.push(Frame {
            froms: vec![delete.table.name.clone()],
        });
        let result = self.render_delete(delete, ctx);
        self.stack.pop();
        result
    }

    fn render_delete(&mut self, delete: &DeleteStatement, ctx: Ctx) -> CompileResult<String> {
        for cte in &delete.ctes {
            self.register_cte(cte, ctx)?;
        }
        let mut out = format!("DELETE FROM {}", self.format_dml_table(&delete.table));
        if let Some(where_clause) = self.render_and_list(&delete.where_clauses, ctx)? {
            out.push_str(" WHERE ");
            out.push_str(&where_clause);
        }
        out.push_str(&self.render_returning(
            &delete.returning,
            self.dialect.delete_returning,
            ctx,
        )?);
        Ok(out)
    }

    fn format_dml_table(&self, table: &TableRef) -> String {
        let mut text = self.preparer().format_table_ref(table);
        if let Some(hint) = &table.hint {
            text.push(' ');
            text.push_str(hint);
        }
        text
    }

    fn render_returning(
        &mut self,
        returning: &[Expr],
        supported: bool,
        ctx: Ctx,
    ) -> CompileResult<String> {
        if returning.is_empty() {
            return Ok(String::new());
        }
        if !supported {
            return Err(CompileError::capability(
                &self.dialect.name,
                "RETURNING is not supported for this statement",
            ));
        }
        let ret_ctx = Ctx {
            within_columns_clause: true,
            add_to_result_map: true,
            include_table: false,
            ..ctx
        };
        let mut parts = Vec::new();
        let mut labels = std::collections::HashMap::new();
        for col in returning {
            parts.push(self.label_select_column(col, ret_ctx, &mut labels)?);
        }
        Ok(format!(" RETURNING {}", parts.join(", ")))
    }
}
