//! SQL statement compiler.
//!
//! Converts a statement tree plus a dialect descriptor into a [`Compiled`]
//! result: SQL text, result-column map, bind-parameter map and the
//! postcompile protocol for expanding parameters and multi-row INSERT
//! batching.
//!
//! All mutable compilation state lives in one [`SqlCompiler`] value; a
//! compiler is used for exactly one compilation and discarded. Concurrent
//! compilations each allocate their own compiler and share only the
//! read-only [`Dialect`] and the static operator tables.

pub mod binds;
pub mod crud;
pub mod cte;
pub mod ddl;
pub mod expr;
pub mod names;
pub mod preparer;
pub mod select;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::expr::BindParam;
use crate::ast::stmt::Statement;
use crate::ast::values::{TypeInfo, Value};
use crate::dialect::Dialect;
use crate::error::{CompileError, CompileResult};

pub use self::binds::{DefaultCodec, ExpandedStatement, InsertBatch, LiteralCodec};
pub use self::crud::{ConstraintNamer, CrudParam};
pub use self::preparer::{IdentifierPreparer, substitute_schemas};

/// Nesting guard; deeper trees fail with [`CompileError::NestingTooDeep`]
/// rather than overflowing the stack.
pub(crate) const MAX_DEPTH: usize = 200;

/// Compilation options.
#[derive(Clone, Default)]
pub struct CompileOptions {
    /// Inline every parameter value as a literal instead of a placeholder.
    pub literal_binds: bool,
    /// Run the cartesian-product linter over SELECT FROM lists.
    pub from_linting: bool,
    /// Literal encoder; `None` uses the built-in codec.
    pub codec: Option<Arc<dyn LiteralCodec + Send + Sync>>,
    /// Naming convention for anonymous DDL constraints; `None` renders
    /// them nameless.
    pub constraint_namer: Option<Arc<dyn ConstraintNamer + Send + Sync>>,
}

/// Flags threaded down the recursive visit calls.
///
/// Passed by value; each level adjusts its copy rather than mutating
/// shared state.
#[derive(Clone, Copy)]
pub(crate) struct Ctx {
    /// Compiling the projection list of a SELECT.
    pub within_columns_clause: bool,
    /// Directly inside an explicit label; suppresses nested `AS`.
    pub within_label_clause: bool,
    /// Record result-column entries for expressions visited at this level.
    pub add_to_result_map: bool,
    /// Qualify column references with their table.
    pub include_table: bool,
    /// Render binds as inline literals.
    pub literal_binds: bool,
    /// Collect comparison edges for the cartesian linter.
    pub lint: bool,
    /// Inside a subquery (affects the label policy).
    pub in_subquery: bool,
    /// Operator directly enclosing the expression being compiled.
    pub binary_op: Option<crate::ast::operators::Operator>,
    pub depth: usize,
}

impl Default for Ctx {
    fn default() -> Self {
        Self {
            within_columns_clause: false,
            within_label_clause: false,
            add_to_result_map: false,
            include_table: true,
            literal_binds: false,
            lint: false,
            in_subquery: false,
            binary_op: None,
            depth: 0,
        }
    }
}

impl Ctx {
    pub fn descend(mut self) -> CompileResult<Self> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CompileError::NestingTooDeep(MAX_DEPTH));
        }
        Ok(self)
    }
}

/// One result-set column the caller asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumnsEntry {
    /// Name as rendered (possibly truncated or anonymized).
    pub name: String,
    /// Name before truncation / labeling.
    pub orig_name: String,
    /// Keys under which the column can be located in a result row
    /// (column key, qualified path, label).
    pub targets: Vec<String>,
    pub ty: TypeInfo,
}

/// One frame per nested statement on the compiler stack.
///
/// Frames below the top are read-only from the current frame's
/// perspective; they supply the FROM keys visible for correlation.
#[derive(Debug)]
pub(crate) struct Frame {
    /// FROM keys this statement makes available to nested correlation.
    pub froms: Vec<String>,
}

/// Reusable template recorded for batched multi-row INSERT execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertManyValues {
    /// The statement inserts only defaults (no column list).
    pub is_default_expr: bool,
    /// The single-row VALUES body, without enclosing parens.
    pub single_values_expr: String,
    /// Per-column crud parameters of the VALUES clause.
    pub insert_crud_params: Vec<CrudParam>,
    /// Positional placeholders consumed by one row.
    pub num_positional_params: usize,
}

/// The one-shot statement compiler.
pub struct SqlCompiler<'d> {
    pub(crate) dialect: &'d Dialect,
    pub(crate) options: CompileOptions,

    // bind protocol
    pub(crate) binds: HashMap<String, BindParam>,
    pub(crate) bind_names_by_lineage: HashMap<u64, String>,
    pub(crate) positiontup: Vec<String>,
    pub(crate) post_compile_params: HashSet<String>,
    pub(crate) literal_execute_params: HashSet<String>,
    pub(crate) has_out_parameters: bool,

    pub(crate) names: names::NameAllocator,
    pub(crate) ctes: cte::CteState,
    pub(crate) stack: Vec<Frame>,
    pub(crate) result_columns: Vec<ResultColumnsEntry>,
    pub(crate) linters: Vec<select::FromLinter>,
    pub(crate) imv: Option<InsertManyValues>,
    pub(crate) warnings: Vec<String>,
}

impl<'d> SqlCompiler<'d> {
    pub fn new(dialect: &'d Dialect, options: CompileOptions) -> Self {
        Self {
            dialect,
            options,
            binds: HashMap::new(),
            bind_names_by_lineage: HashMap::new(),
            positiontup: Vec::new(),
            post_compile_params: HashSet::new(),
            literal_execute_params: HashSet::new(),
            has_out_parameters: false,
            names: names::NameAllocator::new(),
            ctes: cte::CteState::new(),
            stack: Vec::new(),
            result_columns: Vec::new(),
            linters: Vec::new(),
            imv: None,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn preparer(&self) -> IdentifierPreparer<'d> {
        IdentifierPreparer::new(self.dialect)
    }

    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!(target: "sqlforge", "{}", message);
        self.warnings.push(message);
    }

    /// Current nesting level; the outermost statement is level 1.
    pub(crate) fn level(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn add_to_result_map(
        &mut self,
        name: String,
        orig_name: String,
        targets: Vec<String>,
        ty: TypeInfo,
    ) {
        self.result_columns.push(ResultColumnsEntry {
            name,
            orig_name,
            targets,
            ty,
        });
    }

    /// Compile a statement tree, consuming the compiler.
    pub fn run(mut self, stmt: &Statement) -> CompileResult<Compiled> {
        let ctx = Ctx {
            lint: self.options.from_linting,
            literal_binds: self.options.literal_binds,
            ..Ctx::default()
        };
        let mut sql = match stmt {
            Statement::Select(select) => self.visit_select(select, true, ctx)?,
            Statement::Compound(compound) => self.visit_compound(compound, true, ctx)?,
            Statement::Insert(insert) => self.visit_insert(insert, ctx)?,
            Statement::Update(update) => self.visit_update(update, ctx)?,
            Statement::Delete(delete) => self.visit_delete(delete, ctx)?,
            Statement::Ddl(ddl) => self.visit_ddl(ddl)?,
        };

        // top-level WITH clause collected during the walk; its bodies
        // render ahead of the statement, so their binds come first
        if let Some((prefix, positions)) = self.ctes.render_level(1, self.preparer()) {
            sql = format!("{}{}", prefix, sql);
            self.positiontup.splice(0..0, positions);
        }

        Ok(Compiled {
            sql,
            dialect: self.dialect.clone(),
            result_columns: self.result_columns,
            binds: self.binds,
            positiontup: if self.dialect.paramstyle.is_positional() {
                Some(self.positiontup)
            } else {
                None
            },
            post_compile_params: self.post_compile_params,
            literal_execute_params: self.literal_execute_params,
            has_out_parameters: self.has_out_parameters,
            insertmanyvalues: self.imv,
            warnings: self.warnings,
        })
    }
}

/// The immutable output of one compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The rendered SQL text. May still contain postcompile tokens; check
    /// [`Compiled::needs_postcompile`].
    pub sql: String,
    /// Owned copy of the dialect the statement was compiled against, used
    /// by the postcompile operations.
    pub dialect: Dialect,
    /// Result columns in projection order.
    pub result_columns: Vec<ResultColumnsEntry>,
    /// Bind name to parameter map.
    pub binds: HashMap<String, BindParam>,
    /// Placeholder order for positional paramstyles.
    pub positiontup: Option<Vec<String>>,
    /// Names of expanding parameters awaiting [`Compiled::expand`].
    pub post_compile_params: HashSet<String>,
    /// Names of literal-execute parameters awaiting [`Compiled::expand`].
    pub literal_execute_params: HashSet<String>,
    pub has_out_parameters: bool,
    /// Template for multi-row INSERT batching, when recorded.
    pub insertmanyvalues: Option<InsertManyValues>,
    /// Non-fatal findings (cartesian products, literal NULL comparisons).
    pub warnings: Vec<String>,
}

impl Compiled {
    /// Whether expanding or literal-execute parameters still defer part of
    /// the rendering to execution time.
    pub fn needs_postcompile(&self) -> bool {
        !self.post_compile_params.is_empty() || !self.literal_execute_params.is_empty()
    }

    /// Replace schema-translate placeholder tokens using the dialect's map.
    pub fn substitute_schemas(&self) -> String {
        substitute_schemas(&self.sql, &self.dialect)
    }

    /// Convenience: the bound value of a parameter, if present.
    pub fn bound_value(&self, name: &str) -> Option<Value> {
        self.binds.get(name).and_then(|b| b.effective_value())
    }
}

/// Compile a statement against a dialect with default options.
pub fn compile(stmt: &Statement, dialect: &Dialect) -> CompileResult<Compiled> {
    SqlCompiler::new(dialect, CompileOptions::default()).run(stmt)
}

/// Compile a statement with explicit options.
pub fn compile_with_options(
    stmt: &Statement,
    dialect: &Dialect,
    options: CompileOptions,
) -> CompileResult<Compiled> {
    SqlCompiler::new(dialect, options).run(stmt)
}
