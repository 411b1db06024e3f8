pub mod ddl;
pub mod expr;
pub mod operators;
pub mod stmt;
pub mod values;

pub use self::ddl::{
    ColumnDef, Computed, CreateTable, DdlStatement, DefaultClause, Identity, IndexDef, RefAction,
    SequenceDef, TableConstraint,
};
pub use self::expr::{BindParam, Expr, FrameBound, ValueCallable, WindowFrame};
pub use self::operators::{
    CompoundKeyword, JoinKind, Operator, UnaryModifier, UnaryOp,
};
pub use self::stmt::{
    CompoundSelect, Cte, DeleteStatement, ForUpdate, FromItem, InsertSource, InsertStatement,
    SelectQuery, SelectStatement, Statement, TableRef, UpdateStatement,
};
pub use self::values::{TypeInfo, Value};
