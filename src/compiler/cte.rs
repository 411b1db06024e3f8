//! CTE registration and WITH-clause rendering.
//!
//! A CTE is identified by (nesting level, name) plus reference identity
//! after following restatement chains. Registration compiles the body at
//! most once; the WITH clause is rendered per level once the statement at
//! that level has finished.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ast::stmt::Cte;
use crate::compiler::preparer::IdentifierPreparer;
use crate::compiler::{Ctx, SqlCompiler};
use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone)]
struct CteEntry {
    cte: Arc<Cte>,
    reference: Arc<Cte>,
    body: String,
    /// Positional bind names claimed by the body, spliced into the
    /// statement ordering where the WITH clause lands.
    positions: Vec<String>,
}

/// Registered CTEs grouped by nesting level, insertion-ordered within a
/// level.
#[derive(Debug, Default)]
pub(crate) struct CteState {
    levels: BTreeMap<usize, Vec<CteEntry>>,
}

enum Registration {
    Replace(usize, usize),
    New(usize),
}

impl CteState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn find(&self, level: usize, name: &str) -> Option<(usize, &CteEntry)> {
        self.levels
            .get(&level)
            .and_then(|entries| entries.iter().enumerate().find(|(_, e)| e.cte.name == name))
    }

    /// Locate an already-registered CTE by reference identity, at any
    /// nesting level.
    fn find_reference(&self, reference: &Arc<Cte>) -> Option<(usize, usize)> {
        for (level, entries) in &self.levels {
            if let Some(idx) = entries
                .iter()
                .position(|e| Arc::ptr_eq(&e.reference, reference))
            {
                return Some((*level, idx));
            }
        }
        None
    }

    fn remove(&mut self, level: usize, idx: usize) -> Option<CteEntry> {
        let entries = self.levels.get_mut(&level)?;
        let entry = entries.remove(idx);
        if entries.is_empty() {
            self.levels.remove(&level);
        }
        Some(entry)
    }

    /// Move a registered CTE to a different nesting level, keeping its
    /// compiled body.
    fn relocate(&mut self, from: usize, idx: usize, to: usize) {
        if let Some(entry) = self.remove(from, idx) {
            self.levels.entry(to).or_default().push(entry);
        }
    }

    /// Render and drain the WITH clause for one nesting level, returning
    /// the clause text and the bind positions its bodies claim.
    pub(crate) fn render_level(
        &mut self,
        level: usize,
        preparer: IdentifierPreparer<'_>,
    ) -> Option<(String, Vec<String>)> {
        let entries = self.levels.remove(&level)?;
        if entries.is_empty() {
            return None;
        }
        let recursive = entries.iter().any(|e| e.cte.recursive);
        let keyword = if recursive { "WITH RECURSIVE " } else { "WITH " };
        let items: Vec<String> = entries
            .iter()
            .map(|entry| {
                let mut text = preparer.quote(&entry.cte.name);
                if !entry.cte.columns.is_empty() {
                    let cols: Vec<String> = entry
                        .cte
                        .columns
                        .iter()
                        .map(|c| preparer.quote(c))
                        .collect();
                    text.push_str(&format!("({})", cols.join(", ")));
                }
                text.push_str(&format!(" AS ({})", entry.body));
                text
            })
            .collect();
        let positions = entries
            .into_iter()
            .flat_map(|entry| entry.positions)
            .collect();
        Some((format!("{}{} ", keyword, items.join(", ")), positions))
    }
}

/// Whether `newer` restates `older`, following the full chain.
fn restates(newer: &Arc<Cte>, older: &Arc<Cte>) -> bool {
    let mut current = Arc::clone(newer);
    while let Some(prior) = current.restates.clone() {
        if Arc::ptr_eq(&prior, older) {
            return true;
        }
        current = prior;
    }
    false
}

/// Whether the two CTEs are independently produced structural clones.
fn clones(a: &Arc<Cte>, b: &Arc<Cte>) -> bool {
    if let Some(of) = &a.clone_of
        && (Arc::ptr_eq(of, b) || b.clone_of.as_ref().is_some_and(|o| Arc::ptr_eq(of, o)))
    {
        return true;
    }
    if let Some(of) = &b.clone_of
        && Arc::ptr_eq(of, a)
    {
        return true;
    }
    (a.clone_of.is_some() || b.clone_of.is_some()) && a.compare(b)
}

impl<'d> SqlCompiler<'d> {
    /// Register a CTE occurrence, compiling its body on first encounter.
    pub(crate) fn register_cte(&mut self, cte: &Arc<Cte>, ctx: Ctx) -> CompileResult<()> {
        let reference = cte.reference_cte();
        let level = if cte.nest_here { self.level() } else { 1 };

        // reference identity is tracked across levels: a second occurrence
        // at another level reuses (or relocates) the registered entry
        // instead of rendering the body twice
        let registration = if let Some((found_level, idx)) = self.ctes.find_reference(&reference)
        {
            let existing = &self.ctes.levels[&found_level][idx];
            if cte.nest_here && existing.cte.nest_here && !Arc::ptr_eq(cte, &existing.cte) {
                return Err(CompileError::conflict(format!(
                    "CTE '{}' is marked nest_here in more than one location",
                    cte.name
                )));
            }
            if restates(cte, &existing.cte) {
                if level < found_level {
                    // restated at an outer level; the newer definition
                    // renders there
                    self.ctes.remove(found_level, idx);
                    Registration::New(level)
                } else {
                    Registration::Replace(found_level, idx)
                }
            } else if level < found_level {
                self.ctes.relocate(found_level, idx, level);
                return Ok(());
            } else {
                return Ok(());
            }
        } else if let Some((_, existing)) = self.ctes.find(level, &cte.name) {
            if clones(cte, &existing.cte) {
                return Ok(());
            }
            return Err(CompileError::conflict(format!(
                "Multiple, unrelated CTEs found with the same name: '{}'",
                cte.name
            )));
        } else {
            Registration::New(level)
        };

        if cte.recursive && cte.columns.is_empty() {
            return Err(CompileError::missing(format!(
                "recursive CTE '{}' requires an explicit column list",
                cte.name
            )));
        }

        // the body's columns keep their own names so outer references
        // like "name.col" stay valid
        let body_ctx = Ctx {
            in_subquery: false,
            add_to_result_map: false,
            within_columns_clause: false,
            ..ctx
        };
        // the body claims its bind positions here; they re-enter the
        // statement ordering when the WITH clause is spliced in
        let mark = self.positiontup.len();
        let body = self.visit_select_query(&cte.body, false, body_ctx)?;
        let positions = self.positiontup.split_off(mark);

        let entry = CteEntry {
            cte: Arc::clone(cte),
            reference,
            body,
            positions,
        };
        match registration {
            Registration::Replace(at, idx) => {
                self.ctes.levels.entry(at).or_default()[idx] = entry;
            }
            Registration::New(at) => {
                self.ctes.levels.entry(at).or_default().push(entry);
            }
        }
        Ok(())
    }
}
