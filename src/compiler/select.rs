//! SELECT compilation: frame stack, correlation, projection labeling,
//! compound selects, and the cartesian-product linter.

use std::collections::{HashMap, HashSet};

use crate::ast::expr::Expr;
use crate::ast::operators::JoinKind;
use crate::ast::stmt::{
    CompoundSelect, ForUpdate, FromItem, SelectQuery, SelectStatement,
};
use crate::compiler::{Ctx, Frame, SqlCompiler};
use crate::dialect::LimitStyle;
use crate::error::{CompileError, CompileResult};

/// Detects FROM elements unreachable through comparison edges: an
/// unconstrained cartesian product.
#[derive(Debug)]
pub(crate) struct FromLinter {
    froms: Vec<String>,
    edges: Vec<(String, String)>,
}

impl FromLinter {
    pub(crate) fn new(froms: Vec<String>) -> Self {
        Self {
            froms,
            edges: Vec::new(),
        }
    }

    pub(crate) fn add_edge(&mut self, left: String, right: String) {
        if left != right {
            self.edges.push((left, right));
        }
    }

    /// Flood-fill from the first FROM element; returns the unreached
    /// elements and the start element when the graph is disconnected.
    pub(crate) fn lint(&self) -> Option<(String, Vec<String>)> {
        if self.froms.len() < 2 {
            return None;
        }
        let start = self.froms[0].clone();
        let mut reached: HashSet<&str> = HashSet::new();
        reached.insert(start.as_str());
        loop {
            let before = reached.len();
            for (l, r) in &self.edges {
                if reached.contains(l.as_str()) {
                    reached.insert(r.as_str());
                }
                if reached.contains(r.as_str()) {
                    reached.insert(l.as_str());
                }
            }
            if reached.len() == before {
                break;
            }
        }
        let missing: Vec<String> = self
            .froms
            .iter()
            .filter(|f| !reached.contains(f.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some((start, missing))
        }
    }
}

/// Rendered label text of each projection label, used to resolve
/// ORDER BY label references.
type LabelMap = HashMap<String, String>;

impl<'d> SqlCompiler<'d> {
    pub(crate) fn visit_select(
        &mut self,
        select: &SelectStatement,
        needs_result_map: bool,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let ctx = ctx.descend()?;

        // keys visible from the enclosing statements, captured before this
        // frame is pushed
        let enclosing: HashSet<String> = self
            .stack
            .iter()
            .flat_map(|f| f.froms.iter().cloned())
            .collect();

        let mut explicit_keys = Vec::new();
        for item in &select.from {
            item.leaf_keys(&mut explicit_keys);
        }

        let rendered_items = correlated_from_list(select, &enclosing, self.stack.is_empty());

        self.stack.push(Frame {
            froms: explicit_keys.clone(),
        });
        let pos_mark = self.positiontup.len();
        if ctx.lint {
            let mut keys = Vec::new();
            for item in &rendered_items {
                item.leaf_keys(&mut keys);
            }
            self.linters.push(FromLinter::new(keys));
        }
        let level = self.level();

        // FROM-clause CTEs compile before the projection so their bodies
        // exist by the time the WITH clause is spliced in
        let result = self
            .register_select_ctes(select, ctx)
            .and_then(|_| self.render_select_body(select, &rendered_items, needs_result_map, ctx));

        let mut text = match result {
            Ok(text) => text,
            Err(err) => {
                self.stack.pop();
                if ctx.lint {
                    self.linters.pop();
                }
                return Err(err);
            }
        };

        if ctx.lint
            && let Some(linter) = self.linters.pop()
            && let Some((start, missing)) = linter.lint()
        {
            let froms = missing
                .iter()
                .map(|f| format!("\"{}\"", f))
                .collect::<Vec<_>>()
                .join(", ");
            self.warn(format!(
                "SELECT statement has a cartesian product between FROM element(s) {} \
                 and FROM element \"{}\"",
                froms, start
            ));
        }

        // WITH clause for CTEs hoisted to this nesting level; their binds
        // precede everything this statement rendered
        if level > 1
            && let Some((prefix, positions)) = self.ctes.render_level(level, self.preparer())
        {
            text = format!("{}{}", prefix, text);
            self.positiontup.splice(pos_mark..pos_mark, positions);
        }

        self.stack.pop();
        Ok(text)
    }

    fn register_select_ctes(&mut self, select: &SelectStatement, ctx: Ctx) -> CompileResult<()> {
        for cte in &select.ctes {
            self.register_cte(cte, ctx)?;
        }
        for item in &select.from {
            self.preregister_ctes(item, ctx)?;
        }
        Ok(())
    }

    fn preregister_ctes(&mut self, item: &FromItem, ctx: Ctx) -> CompileResult<()> {
        match item {
            FromItem::Cte(cte) => self.register_cte(cte, ctx),
            FromItem::Alias { of, .. } => self.preregister_ctes(of, ctx),
            FromItem::Join { left, right, .. } => {
                self.preregister_ctes(left, ctx)?;
                self.preregister_ctes(right, ctx)
            }
            _ => Ok(()),
        }
    }

    fn render_select_body(
        &mut self,
        select: &SelectStatement,
        rendered_items: &[&FromItem],
        needs_result_map: bool,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let mut out = String::from("SELECT ");
        for prefix in &select.prefixes {
            out.push_str(prefix);
            out.push(' ');
        }
        if select.distinct && select.distinct_on.is_empty() {
            out.push_str("DISTINCT ");
        }
        if !select.distinct_on.is_empty() {
            if !self.dialect.supports_distinct_on {
                return Err(CompileError::capability(
                    &self.dialect.name,
                    "DISTINCT ON is not supported",
                ));
            }
            let parts = self.visit_exprs(&select.distinct_on, ctx.operand())?;
            out.push_str(&format!("DISTINCT ON ({}) ", parts.join(", ")));
        }

        let (projection, labels) = self.render_projection(select, needs_result_map, ctx)?;
        out.push_str(&projection);

        if !rendered_items.is_empty() {
            let mut froms = Vec::new();
            for item in rendered_items {
                froms.push(self.visit_from_item(item, ctx)?);
            }
            out.push_str(" FROM ");
            out.push_str(&froms.join(", "));
        }

        if let Some(where_clause) = self.render_and_list(&select.where_clauses, ctx)? {
            out.push_str(" WHERE ");
            out.push_str(&where_clause);
        }

        if !select.group_by.is_empty() {
            let parts = self.visit_exprs(&select.group_by, ctx.operand())?;
            out.push_str(" GROUP BY ");
            out.push_str(&parts.join(", "));
        }

        if let Some(having) = self.render_and_list(&select.having, ctx)? {
            out.push_str(" HAVING ");
            out.push_str(&having);
        }

        if !select.order_by.is_empty() {
            let parts: Vec<String> = select
                .order_by
                .iter()
                .map(|e| self.render_order_by(e, &labels, ctx))
                .collect::<CompileResult<_>>()?;
            out.push_str(" ORDER BY ");
            out.push_str(&parts.join(", "));
        }

        out.push_str(&self.render_limit_offset(
            select.limit.as_ref(),
            select.offset.as_ref(),
            ctx,
        )?);

        if let Some(for_update) = &select.for_update {
            out.push_str(&self.render_for_update(for_update, ctx)?);
        }

        Ok(out)
    }

    /// Render the projection list, applying the label policy and recording
    /// result columns at the authoritative frame.
    fn render_projection(
        &mut self,
        select: &SelectStatement,
        needs_result_map: bool,
        ctx: Ctx,
    ) -> CompileResult<(String, LabelMap)> {
        let proj_ctx = Ctx {
            within_columns_clause: true,
            add_to_result_map: needs_result_map,
            ..ctx
        };
        let mut labels = LabelMap::new();
        let mut parts = Vec::new();
        for col in &select.columns {
            parts.push(self.label_select_column(col, proj_ctx, &mut labels)?);
        }
        Ok((parts.join(", "), labels))
    }

    pub(crate) fn label_select_column(
        &mut self,
        col: &Expr,
        ctx: Ctx,
        labels: &mut LabelMap,
    ) -> CompileResult<String> {
        if let Expr::Label { name, expr } = col {
            // render the labeled inner once for label-reference resolution
            let inner_ctx = Ctx {
                add_to_result_map: false,
                within_label_clause: true,
                ..ctx
            };
            let inner_text = self.visit_expr(expr, inner_ctx)?;
            labels.insert(name.clone(), inner_text);
            return self.visit_expr(col, ctx);
        }

        let auto = self.auto_label(col, ctx.in_subquery);
        let text = self.visit_expr(
            col,
            Ctx {
                add_to_result_map: false,
                ..ctx
            },
        )?;

        match auto {
            Some(label) => {
                let quoted = self.preparer().format_label(&label);
                labels.insert(label.clone(), text.clone());
                if ctx.add_to_result_map {
                    let targets = result_targets(col, &label);
                    self.add_to_result_map(
                        quoted.clone(),
                        orig_name(col).unwrap_or_else(|| label.clone()),
                        targets,
                        col.type_info(),
                    );
                }
                Ok(format!("{} AS {}", text, quoted))
            }
            None => {
                if ctx.add_to_result_map
                    && let Some(name) = orig_name(col)
                {
                    let targets = result_targets(col, &name);
                    self.add_to_result_map(name.clone(), name, targets, col.type_info());
                }
                Ok(text)
            }
        }
    }

    /// AND-join a criteria list; clauses rendering empty are dropped, and
    /// an all-empty list collapses to nothing.
    pub(crate) fn render_and_list(
        &mut self,
        clauses: &[Expr],
        ctx: Ctx,
    ) -> CompileResult<Option<String>> {
        let mut parts = Vec::new();
        for clause in clauses {
            let text = self.visit_expr(clause, ctx.operand())?;
            if !text.is_empty() {
                // OR groups keep their parens inside the implicit AND list
                let grouped = clauses.len() > 1
                    && matches!(
                        clause,
                        Expr::Binary { op, .. } if op.is_boolean_conjunction()
                    );
                parts.push(if grouped { format!("({})", text) } else { text });
            }
        }
        Ok(if parts.is_empty() {
            None
        } else {
            Some(parts.join(" AND "))
        })
    }

    fn render_order_by(
        &mut self,
        expr: &Expr,
        labels: &LabelMap,
        ctx: Ctx,
    ) -> CompileResult<String> {
        // modifiers wrap the label reference
        if let Expr::Unary {
            op: None,
            modifier: Some(modifier),
            operand,
        } = expr
        {
            let inner = self.render_order_by(operand, labels, ctx)?;
            return Ok(format!("{}{}", inner, modifier.sql()));
        }
        if let Expr::Text(name) = expr
            && labels.contains_key(name)
        {
            if self.dialect.supports_order_by_label {
                return Ok(self.preparer().format_label(name));
            }
            let underlying = &labels[name];
            if underlying.is_empty() {
                return Err(CompileError::unsupported(format!(
                    "dialect does not support ORDER BY by label and label '{}' \
                     has no resolvable expression",
                    name
                )));
            }
            return Ok(underlying.clone());
        }
        if let Expr::Label { name, .. } = expr {
            if self.dialect.supports_order_by_label {
                return Ok(self.preparer().format_label(name));
            }
            if let Some(underlying) = labels.get(name) {
                return Ok(underlying.clone());
            }
        }
        self.visit_expr(expr, ctx.operand())
    }

    fn render_limit_offset(
        &mut self,
        limit: Option<&Expr>,
        offset: Option<&Expr>,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let mut out = String::new();
        match self.dialect.limit_style {
            LimitStyle::LimitOffset => {
                if let Some(limit) = limit {
                    out.push_str(" LIMIT ");
                    out.push_str(&self.visit_expr(limit, ctx.operand())?);
                }
                if let Some(offset) = offset {
                    out.push_str(" OFFSET ");
                    out.push_str(&self.visit_expr(offset, ctx.operand())?);
                }
            }
            LimitStyle::FetchFirst => {
                if let Some(offset) = offset {
                    out.push_str(" OFFSET ");
                    out.push_str(&self.visit_expr(offset, ctx.operand())?);
                    out.push_str(" ROWS");
                }
                if let Some(limit) = limit {
                    out.push_str(" FETCH FIRST ");
                    out.push_str(&self.visit_expr(limit, ctx.operand())?);
                    out.push_str(" ROWS ONLY");
                }
            }
        }
        Ok(out)
    }

    fn render_for_update(&mut self, for_update: &ForUpdate, ctx: Ctx) -> CompileResult<String> {
        let mut out = String::from(" FOR UPDATE");
        if !for_update.of.is_empty() {
            let parts = self.visit_exprs(&for_update.of, ctx.operand())?;
            out.push_str(" OF ");
            out.push_str(&parts.join(", "));
        }
        if for_update.nowait {
            out.push_str(" NOWAIT");
        }
        if for_update.skip_locked {
            out.push_str(" SKIP LOCKED");
        }
        Ok(out)
    }

    pub(crate) fn visit_from_item(&mut self, item: &FromItem, ctx: Ctx) -> CompileResult<String> {
        match item {
            FromItem::Table { name, schema } => {
                Ok(self.preparer().format_table(schema.as_deref(), name))
            }
            FromItem::Alias { of, name } => Ok(format!(
                "{} AS {}",
                self.visit_from_item(of, ctx)?,
                self.preparer().format_alias(name)
            )),
            FromItem::Subquery {
                query,
                alias,
                lateral,
            } => {
                let sub_ctx = Ctx {
                    in_subquery: true,
                    ..ctx
                };
                let body = self.visit_select_query(query, false, sub_ctx)?;
                let keyword = if *lateral { "LATERAL " } else { "" };
                Ok(format!(
                    "{}({}) AS {}",
                    keyword,
                    body,
                    self.preparer().format_alias(alias)
                ))
            }
            FromItem::Join {
                left,
                right,
                on,
                kind,
            } => {
                let keyword = match kind {
                    JoinKind::Inner => "JOIN",
                    JoinKind::LeftOuter => "LEFT OUTER JOIN",
                    JoinKind::FullOuter => "FULL OUTER JOIN",
                    JoinKind::Cross => "CROSS JOIN",
                };
                let mut out = format!(
                    "{} {} {}",
                    self.visit_from_item(left, ctx)?,
                    keyword,
                    self.visit_from_item(right, ctx)?
                );
                if let Some(on) = on {
                    if ctx.lint {
                        // join criteria count as connecting edges
                        let mut l = Vec::new();
                        left.leaf_keys(&mut l);
                        let mut r = Vec::new();
                        right.leaf_keys(&mut r);
                        if let Some(linter) = self.linters.last_mut() {
                            for lk in &l {
                                for rk in &r {
                                    linter.add_edge(lk.clone(), rk.clone());
                                }
                            }
                        }
                    }
                    out.push_str(" ON ");
                    out.push_str(&self.visit_expr(on, ctx.operand())?);
                } else if !matches!(kind, JoinKind::Cross) {
                    return Err(CompileError::missing(format!(
                        "join onto '{}' has no ON criterion",
                        right.key()
                    )));
                }
                Ok(out)
            }
            FromItem::Cte(cte) => {
                self.register_cte(cte, ctx)?;
                Ok(self.preparer().quote(&cte.name))
            }
        }
    }

    pub(crate) fn visit_select_query(
        &mut self,
        query: &SelectQuery,
        needs_result_map: bool,
        ctx: Ctx,
    ) -> CompileResult<String> {
        match query {
            SelectQuery::Select(select) => self.visit_select(select, needs_result_map, ctx),
            SelectQuery::Compound(compound) => {
                self.visit_compound(compound, needs_result_map, ctx)
            }
        }
    }

    pub(crate) fn visit_compound(
        &mut self,
        compound: &CompoundSelect,
        needs_result_map: bool,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let ctx = ctx.descend()?;
        if compound.selects.is_empty() {
            return Err(CompileError::missing(
                "compound SELECT has no member statements",
            ));
        }
        let expected = compound.selects[0].column_count();
        for (i, member) in compound.selects.iter().enumerate().skip(1) {
            if member.column_count() != expected {
                return Err(CompileError::conflict(format!(
                    "compound SELECT member {} has {} columns, expected {}",
                    i,
                    member.column_count(),
                    expected
                )));
            }
        }

        let mut parts = Vec::new();
        for (i, member) in compound.selects.iter().enumerate() {
            // only the first member feeds the result map
            parts.push(self.visit_select_query(member, needs_result_map && i == 0, ctx)?);
        }
        let mut out = parts.join(&format!(" {} ", compound.keyword.sql()));

        if !compound.order_by.is_empty() {
            let labels = LabelMap::new();
            let rendered: Vec<String> = compound
                .order_by
                .iter()
                .map(|e| self.render_order_by(e, &labels, ctx))
                .collect::<CompileResult<_>>()?;
            out.push_str(" ORDER BY ");
            out.push_str(&rendered.join(", "));
        }
        out.push_str(&self.render_limit_offset(
            compound.limit.as_ref(),
            compound.offset.as_ref(),
            ctx,
        )?);
        Ok(out)
    }

    pub(crate) fn visit_exprs(&mut self, exprs: &[Expr], ctx: Ctx) -> CompileResult<Vec<String>> {
        exprs.iter().map(|e| self.visit_expr(e, ctx)).collect()
    }
}

/// The FROM items actually rendered after correlation against the
/// enclosing frames. Top-level statements render everything; nested
/// statements drop froms visible in an enclosing frame, unless doing so
/// would empty a non-empty list.
fn correlated_from_list<'a>(
    select: &'a SelectStatement,
    enclosing: &HashSet<String>,
    top_level: bool,
) -> Vec<&'a FromItem> {
    let all: Vec<&FromItem> = select.from.iter().collect();
    if top_level || select.from.is_empty() {
        return all;
    }

    let drop_key = |key: &str| -> bool {
        if let Some(correlate) = &select.correlate {
            return correlate.iter().any(|k| k == key);
        }
        if let Some(except) = &select.correlate_except {
            return enclosing.contains(key) && !except.iter().any(|k| k == key);
        }
        enclosing.contains(key)
    };

    let kept: Vec<&FromItem> = all
        .iter()
        .copied()
        .filter(|item| !drop_key(item.key()))
        .collect();
    if kept.is_empty() { all } else { kept }
}

/// The natural addressable name of an unlabeled projection expression.
fn orig_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Column { name, .. } => Some(name.clone()),
        Expr::Label { name, .. } => Some(name.clone()),
        Expr::Cast { expr, .. } | Expr::Unary { operand: expr, .. } => orig_name(expr),
        Expr::Function { name, .. } => Some(name.clone()),
        _ => None,
    }
}

/// The keys under which a projected expression can be located in a result
/// row.
fn result_targets(expr: &Expr, rendered: &str) -> Vec<String> {
    let mut targets = vec![rendered.to_string()];
    if let Expr::Column {
        table, name: col, ..
    } = expr
    {
        if !targets.contains(col) {
            targets.push(col.clone());
        }
        if let Some(table) = table {
            targets.push(format!("{}.{}", table, col));
        }
    }
    targets
}
