pub mod ast;
pub mod compiler;
pub mod dialect;
pub mod error;

pub use compiler::{Compiled, compile, compile_with_options};

pub mod prelude {
    pub use crate::ast::ddl::*;
    pub use crate::ast::expr::{BindParam, Expr};
    pub use crate::ast::operators::*;
    pub use crate::ast::stmt::*;
    pub use crate::ast::values::{TypeInfo, Value};
    pub use crate::compiler::{
        CompileOptions, Compiled, compile, compile_with_options,
    };
    pub use crate::dialect::{Dialect, LimitStyle, Paramstyle};
    pub use crate::error::{CompileError, CompileResult};
}
