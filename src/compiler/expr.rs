//! Expression rendering: one exhaustive match over [`Expr`], the operator
//! special cases, and the projection label policy.

use crate::ast::expr::{Expr, FrameBound, WindowFrame};
use crate::ast::operators::{
    Operator, UnaryOp, extract_field, is_niladic_function, known_function,
};
use crate::compiler::{Ctx, SqlCompiler};
use crate::error::{CompileError, CompileResult};

impl<'d> SqlCompiler<'d> {
    /// Render one expression node.
    pub(crate) fn visit_expr(&mut self, expr: &Expr, ctx: Ctx) -> CompileResult<String> {
        let ctx = ctx.descend()?;
        match expr {
            Expr::Column { table, name, .. } => {
                let table = if ctx.include_table {
                    table.as_deref()
                } else {
                    None
                };
                Ok(self.preparer().format_column(table, name))
            }
            Expr::Bind(bind) => self.render_bind(bind, ctx),
            Expr::Text(text) => Ok(text.clone()),
            Expr::Label { name, expr } => self.visit_label(name, expr, ctx),
            Expr::Unary {
                op,
                modifier,
                operand,
            } => self.visit_unary(*op, *modifier, operand, ctx),
            Expr::Binary { left, op, right } => self.visit_binary(left, *op, right, ctx),
            Expr::Function { name, args, .. } => self.visit_function(name, args, ctx),
            Expr::Case {
                value,
                whens,
                else_,
            } => self.visit_case(value.as_deref(), whens, else_.as_deref(), ctx),
            Expr::Cast {
                expr, type_name, ..
            } => Ok(format!(
                "CAST({} AS {})",
                self.visit_expr(expr, ctx.operand())?,
                type_name
            )),
            Expr::Extract { field, expr } => {
                let field = extract_field(field).ok_or_else(|| {
                    CompileError::unsupported(format!("unknown EXTRACT field '{}'", field))
                })?;
                Ok(format!(
                    "EXTRACT({} FROM {})",
                    field,
                    self.visit_expr(expr, ctx.operand())?
                ))
            }
            Expr::Tuple(exprs) => {
                let parts = self.visit_list(exprs, ctx.operand())?;
                Ok(format!("({})", parts.join(", ")))
            }
            Expr::ClauseList { exprs, sep } => {
                let parts = self.visit_list(exprs, ctx.operand())?;
                Ok(parts.join(sep))
            }
            Expr::Subquery(select) => {
                let sub_ctx = Ctx {
                    in_subquery: true,
                    add_to_result_map: false,
                    within_columns_clause: false,
                    ..ctx
                };
                let text = self.visit_select(select, false, sub_ctx)?;
                Ok(format!("({})", text))
            }
            Expr::Over {
                func,
                partition_by,
                order_by,
                frame,
                filter,
                within_group,
            } => self.visit_over(func, partition_by, order_by, frame, filter, within_group, ctx),
        }
    }

    fn visit_list(&mut self, exprs: &[Expr], ctx: Ctx) -> CompileResult<Vec<String>> {
        exprs.iter().map(|e| self.visit_expr(e, ctx)).collect()
    }

    fn visit_label(&mut self, name: &str, inner: &Expr, ctx: Ctx) -> CompileResult<String> {
        let quoted = self.preparer().format_label(name);
        if ctx.within_columns_clause && !ctx.within_label_clause {
            let inner_ctx = Ctx {
                within_label_clause: true,
                add_to_result_map: false,
                ..ctx
            };
            let text = self.visit_expr(inner, inner_ctx)?;
            if ctx.add_to_result_map {
                let mut targets = vec![name.to_string()];
                if let Expr::Column { table, name: col, .. } = inner {
                    targets.push(col.clone());
                    if let Some(t) = table {
                        targets.push(format!("{}.{}", t, col));
                    }
                }
                self.add_to_result_map(
                    quoted.clone(),
                    name.to_string(),
                    targets,
                    inner.type_info(),
                );
            }
            Ok(format!("{} AS {}", text, quoted))
        } else {
            // referencing context: the bare label name addresses the column
            Ok(quoted)
        }
    }

    fn visit_unary(
        &mut self,
        op: Option<UnaryOp>,
        modifier: Option<crate::ast::operators::UnaryModifier>,
        operand: &Expr,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let mut text = self.visit_expr(operand, ctx.operand())?;
        let needs_parens = match op {
            // NOT binds looser than AND/OR
            Some(UnaryOp::Not) => {
                matches!(operand, Expr::Binary { op, .. } if op.is_boolean_conjunction())
            }
            // negation binds tighter than any infix operator
            Some(UnaryOp::Neg) => matches!(operand, Expr::Binary { .. }),
            _ => false,
        };
        if needs_parens {
            text = format!("({})", text);
        }
        if let Some(op) = op {
            text = format!("{}{}", op.sql(), text);
        }
        if let Some(modifier) = modifier {
            text = format!("{}{}", text, modifier.sql());
        }
        Ok(text)
    }

    fn visit_binary(
        &mut self,
        left: &Expr,
        op: Operator,
        right: &Expr,
        ctx: Ctx,
    ) -> CompileResult<String> {
        if ctx.lint && op.is_comparison() {
            self.collect_lint_edges(left, right);
        }

        let child = Ctx {
            binary_op: Some(op),
            ..ctx.operand()
        };

        match op {
            Operator::FloorDiv => {
                let l = self.group(left, op, child)?;
                let r = self.group(right, op, child)?;
                if left.type_info().is_integer() && right.type_info().is_integer() {
                    Ok(format!("{} / {}", l, r))
                } else {
                    Ok(format!("FLOOR({} / {})", l, r))
                }
            }
            Operator::ILike | Operator::NotILike => {
                let token = if op == Operator::ILike {
                    " ILIKE "
                } else {
                    " NOT ILIKE "
                };
                if self.dialect.supports_ilike {
                    let l = self.group(left, op, child)?;
                    let r = self.group(right, op, child)?;
                    Ok(format!("{}{}{}", l, token, r))
                } else {
                    let l = self.visit_expr(left, child)?;
                    let r = self.visit_expr(right, child)?;
                    let like = if op == Operator::ILike {
                        "LIKE"
                    } else {
                        "NOT LIKE"
                    };
                    Ok(format!("lower({}) {} lower({})", l, like, r))
                }
            }
            Operator::RegexpMatch | Operator::NotRegexpMatch => {
                let Some(match_op) = self.dialect.regexp_match_op.clone() else {
                    return Err(CompileError::capability(
                        &self.dialect.name,
                        "regular expression matching is not supported",
                    ));
                };
                let l = self.group(left, op, child)?;
                let r = self.group(right, op, child)?;
                let token = if op == Operator::RegexpMatch {
                    match_op
                } else if match_op.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
                    format!("NOT {}", match_op)
                } else {
                    format!("!{}", match_op)
                };
                Ok(format!("{} {} {}", l, token, r))
            }
            Operator::IsDistinctFrom | Operator::IsNotDistinctFrom
                if !self.dialect.supports_is_distinct_from =>
            {
                // null-safe IS comparison, the SQLite spelling
                let l = self.group(left, op, child)?;
                let r = self.group(right, op, child)?;
                let token = if op == Operator::IsDistinctFrom {
                    "IS NOT"
                } else {
                    "IS"
                };
                Ok(format!("{} {} {}", l, token, r))
            }
            Operator::Between | Operator::NotBetween => {
                let l = self.group(left, op, child)?;
                let bounds = match right {
                    Expr::Tuple(items) | Expr::ClauseList { exprs: items, .. }
                        if items.len() == 2 =>
                    {
                        let lo = self.group(&items[0], op, child)?;
                        let hi = self.group(&items[1], op, child)?;
                        format!("{} AND {}", lo, hi)
                    }
                    other => self.visit_expr(other, child)?,
                };
                let token = op.sql().ok_or_else(|| {
                    CompileError::unsupported(format!("operator {:?} has no SQL token", op))
                })?;
                Ok(format!("{}{}{}", l, token, bounds))
            }
            Operator::Collate => {
                let l = self.group(left, op, child)?;
                let collation = match right {
                    Expr::Text(name) | Expr::Column { name, .. } => self.preparer().quote(name),
                    other => self.visit_expr(other, child)?,
                };
                Ok(format!("{} COLLATE {}", l, collation))
            }
            _ if like_family(op).is_some() => {
                // contains / startswith / endswith and variants rewrite to
                // LIKE with wildcard concatenation
                let Some((negate, insensitive, prefix, suffix)) = like_family(op) else {
                    unreachable!()
                };
                let mut l = self.visit_expr(left, child)?;
                let mut r = self.visit_expr(right, child)?;
                if insensitive && !self.dialect.supports_ilike {
                    l = format!("lower({})", l);
                    r = format!("lower({})", r);
                }
                if prefix {
                    r = format!("'%' || {}", r);
                }
                if suffix {
                    r = format!("{} || '%'", r);
                }
                let token = match (negate, insensitive && self.dialect.supports_ilike) {
                    (false, false) => "LIKE",
                    (true, false) => "NOT LIKE",
                    (false, true) => "ILIKE",
                    (true, true) => "NOT ILIKE",
                };
                Ok(format!("{} {} {}", l, token, r))
            }
            _ => {
                let token = op.sql().ok_or_else(|| {
                    CompileError::unsupported(format!("operator {:?} has no SQL rendering", op))
                })?;
                let l = self.group(left, op, child)?;
                let r = self.group(right, op, child)?;
                Ok(format!("{}{}{}", l, token, r))
            }
        }
    }

    /// Render an operand, parenthesizing boolean groups nested under a
    /// different operator.
    fn group(&mut self, operand: &Expr, parent: Operator, ctx: Ctx) -> CompileResult<String> {
        let text = self.visit_expr(operand, ctx)?;
        let needs_parens = matches!(
            operand,
            Expr::Binary { op, .. } if op.is_boolean_conjunction() && *op != parent
        );
        Ok(if needs_parens {
            format!("({})", text)
        } else {
            text
        })
    }

    fn visit_function(&mut self, name: &str, args: &[Expr], ctx: Ctx) -> CompileResult<String> {
        let rendered = match known_function(name) {
            Some(keyword) => keyword.to_string(),
            None => self.preparer().quote(name),
        };
        if args.is_empty() && is_niladic_function(&rendered) {
            return Ok(rendered);
        }
        let parts = self.visit_list(args, ctx.operand())?;
        Ok(format!("{}({})", rendered, parts.join(", ")))
    }

    fn visit_case(
        &mut self,
        value: Option<&Expr>,
        whens: &[(Expr, Expr)],
        else_: Option<&Expr>,
        ctx: Ctx,
    ) -> CompileResult<String> {
        let ctx = ctx.operand();
        let mut out = String::from("CASE");
        if let Some(value) = value {
            out.push(' ');
            out.push_str(&self.visit_expr(value, ctx)?);
        }
        for (cond, result) in whens {
            out.push_str(" WHEN ");
            out.push_str(&self.visit_expr(cond, ctx)?);
            out.push_str(" THEN ");
            out.push_str(&self.visit_expr(result, ctx)?);
        }
        if let Some(else_) = else_ {
            out.push_str(" ELSE ");
            out.push_str(&self.visit_expr(else_, ctx)?);
        }
        out.push_str(" END");
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_over(
        &mut self,
        func: &Expr,
        partition_by: &[Expr],
        order_by: &[Expr],
        frame: &Option<WindowFrame>,
        filter: &Option<Box<Expr>>,
        within_group: &[Expr],
        ctx: Ctx,
    ) -> CompileResult<String> {
        let ctx = ctx.operand();
        let mut out = self.visit_expr(func, ctx)?;

        if !within_group.is_empty() {
            let parts = self.visit_list(within_group, ctx)?;
            out.push_str(&format!(" WITHIN GROUP (ORDER BY {})", parts.join(", ")));
        }
        if let Some(filter) = filter {
            out.push_str(&format!(" FILTER (WHERE {})", self.visit_expr(filter, ctx)?));
        }

        let mut window = Vec::new();
        if !partition_by.is_empty() {
            let parts = self.visit_list(partition_by, ctx)?;
            window.push(format!("PARTITION BY {}", parts.join(", ")));
        }
        if !order_by.is_empty() {
            let parts = self.visit_list(order_by, ctx)?;
            window.push(format!("ORDER BY {}", parts.join(", ")));
        }
        if let Some(frame) = frame {
            window.push(render_frame(frame));
        }
        out.push_str(&format!(" OVER ({})", window.join(" ")));
        Ok(out)
    }

    /// The automatic label for a projected expression, per the priority
    /// table: explicit labels are handled before this is consulted; text
    /// clauses never label; bare columns label only inside a subquery;
    /// unary wraps label when they enclose a sub-expression or appear in a
    /// subquery; every expression without a natural addressable name
    /// always labels.
    pub(crate) fn auto_label(&mut self, expr: &Expr, in_subquery: bool) -> Option<String> {
        match expr {
            Expr::Label { .. } | Expr::Text(_) => None,
            Expr::Cast { .. } => Some(self.names.next_anon("anon")),
            Expr::Column { table, name, .. } => {
                if in_subquery {
                    Some(match table {
                        Some(table) => format!("{}_{}", table, name),
                        None => name.clone(),
                    })
                } else {
                    None
                }
            }
            Expr::Unary { operand, .. } => {
                let wraps_sub_expression =
                    !matches!(operand.as_ref(), Expr::Column { .. } | Expr::Text(_));
                if wraps_sub_expression || in_subquery {
                    Some(self.names.next_anon("anon"))
                } else {
                    None
                }
            }
            Expr::Bind(_)
            | Expr::Binary { .. }
            | Expr::Function { .. }
            | Expr::Case { .. }
            | Expr::Extract { .. }
            | Expr::Tuple(_)
            | Expr::ClauseList { .. }
            | Expr::Subquery(_)
            | Expr::Over { .. } => Some(self.names.next_anon("anon")),
        }
    }

    fn collect_lint_edges(&mut self, left: &Expr, right: &Expr) {
        let mut left_froms = Vec::new();
        left.from_objects(&mut left_froms);
        let mut right_froms = Vec::new();
        right.from_objects(&mut right_froms);
        if let Some(linter) = self.linters.last_mut() {
            for l in &left_froms {
                for r in &right_froms {
                    linter.add_edge(l.clone(), r.clone());
                }
            }
            // a comparison touching two froms on one side still links them
            for side in [&left_froms, &right_froms] {
                for pair in side.windows(2) {
                    linter.add_edge(pair[0].clone(), pair[1].clone());
                }
            }
        }
    }
}

impl Ctx {
    /// Context for a nested operand: no longer in projection position.
    pub(crate) fn operand(self) -> Self {
        Ctx {
            within_columns_clause: false,
            add_to_result_map: false,
            binary_op: None,
            ..self
        }
    }
}

/// (negate, case-insensitive, leading-wildcard, trailing-wildcard) for the
/// derived LIKE-family operators.
fn like_family(op: Operator) -> Option<(bool, bool, bool, bool)> {
    use Operator::*;
    match op {
        Contains => Some((false, false, true, true)),
        NotContains => Some((true, false, true, true)),
        IContains => Some((false, true, true, true)),
        NotIContains => Some((true, true, true, true)),
        Startswith => Some((false, false, false, true)),
        NotStartswith => Some((true, false, false, true)),
        IStartswith => Some((false, true, false, true)),
        NotIStartswith => Some((true, true, false, true)),
        Endswith => Some((false, false, true, false)),
        NotEndswith => Some((true, false, true, false)),
        IEndswith => Some((false, true, true, false)),
        NotIEndswith => Some((true, true, true, false)),
        _ => None,
    }
}

fn render_frame(frame: &WindowFrame) -> String {
    let (keyword, start, end) = match frame {
        WindowFrame::Rows { start, end } => ("ROWS", start, end),
        WindowFrame::Range { start, end } => ("RANGE", start, end),
    };
    format!(
        "{} BETWEEN {} AND {}",
        keyword,
        render_bound(start),
        render_bound(end)
    )
}

fn render_bound(bound: &FrameBound) -> String {
    match bound {
        FrameBound::UnboundedPreceding => "UNBOUNDED PRECEDING".to_string(),
        FrameBound::Preceding(n) => format!("{} PRECEDING", n),
        FrameBound::CurrentRow => "CURRENT ROW".to_string(),
        FrameBound::Following(n) => format!("{} FOLLOWING", n),
        FrameBound::UnboundedFollowing => "UNBOUNDED FOLLOWING".to_string(),
    }
}
