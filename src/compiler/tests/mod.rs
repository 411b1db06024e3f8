//! Compiler test modules.
//!
//! Tests are organized by category:
//! - `core`: SELECT rendering, ordering, limits, linting, compound selects
//! - `labels`: projection label policy
//! - `binds`: bind naming, postcompile expansion, literal binds
//! - `ctes`: CTE registration and WITH rendering
//! - `dml`: INSERT/UPDATE/DELETE and multi-row batching
//! - `ddl`: CREATE/DROP TABLE, INDEX, SEQUENCE, constraints

mod ctes;
mod ddl;
mod dml;
