//! DDL rendering: CREATE/DROP TABLE, INDEX, SEQUENCE, constraint and
//! comment statements, built from small composable string builders.

use crate::ast::ddl::{
    ColumnDef, CreateTable, DdlStatement, DefaultClause, IndexDef, SequenceDef, TableConstraint,
};
use crate::ast::stmt::TableRef;
use crate::ast::values::TypeInfo;
use crate::compiler::{Ctx, SqlCompiler};
use crate::error::{CompileError, CompileResult};

impl<'d> SqlCompiler<'d> {
    pub(crate) fn visit_ddl(&mut self, ddl: &DdlStatement) -> CompileResult<String> {
        match ddl {
            DdlStatement::CreateTable(create) => self.visit_create_table(create),
            DdlStatement::DropTable {
                table,
                if_exists,
                cascade,
            } => {
                let mut out = String::from("DROP TABLE ");
                if *if_exists {
                    out.push_str("IF EXISTS ");
                }
                out.push_str(&self.preparer().format_table_ref(table));
                if *cascade {
                    out.push_str(" CASCADE");
                }
                Ok(out)
            }
            DdlStatement::CreateIndex(index) => self.visit_create_index(index),
            DdlStatement::DropIndex(index) => {
                let name = index.name.as_deref().ok_or_else(|| {
                    CompileError::missing("DROP INDEX requires a named index")
                })?;
                Ok(format!("DROP INDEX {}", self.preparer().format_index(name)))
            }
            DdlStatement::CreateSequence(seq) => self.visit_create_sequence(seq),
            DdlStatement::DropSequence(seq) => {
                self.check_sequence_support()?;
                Ok(format!(
                    "DROP SEQUENCE {}",
                    self.preparer().format_table(seq.schema.as_deref(), &seq.name)
                ))
            }
            DdlStatement::AddConstraint { table, constraint } => {
                let body = self.constraint_sql(table, constraint)?;
                Ok(format!(
                    "ALTER TABLE {} ADD {}",
                    self.preparer().format_table_ref(table),
                    body
                ))
            }
            DdlStatement::DropConstraint {
                table,
                name,
                cascade,
            } => {
                let name = name.as_deref().ok_or_else(|| {
                    CompileError::missing("DROP CONSTRAINT requires a constraint name")
                })?;
                let mut out = format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    self.preparer().format_table_ref(table),
                    self.preparer().format_constraint(name)
                );
                if *cascade {
                    out.push_str(" CASCADE");
                }
                Ok(out)
            }
            DdlStatement::SetTableComment { table, comment } => {
                self.check_comment_support()?;
                Ok(format!(
                    "COMMENT ON TABLE {} IS {}",
                    self.preparer().format_table_ref(table),
                    comment_literal(comment.as_deref())
                ))
            }
            DdlStatement::SetColumnComment {
                table,
                column,
                comment,
            } => {
                self.check_comment_support()?;
                Ok(format!(
                    "COMMENT ON COLUMN {}.{} IS {}",
                    self.preparer().format_table_ref(table),
                    self.preparer().quote(column),
                    comment_literal(comment.as_deref())
                ))
            }
        }
    }

    fn visit_create_table(&mut self, create: &CreateTable) -> CompileResult<String> {
        let mut out = String::from("CREATE TABLE ");
        if create.if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        out.push_str(&self.preparer().format_table_ref(&create.table));

        // an explicit table-level PRIMARY KEY wins over column flags
        let has_pk_constraint = create
            .constraints
            .iter()
            .any(|c| matches!(c, TableConstraint::PrimaryKey { .. }));

        let mut elements = Vec::new();
        for column in &create.columns {
            elements.push(self.column_sql(column, has_pk_constraint)?);
        }
        for constraint in &create.constraints {
            elements.push(self.constraint_sql(&create.table, constraint)?);
        }
        if elements.is_empty() {
            return Err(CompileError::missing(format!(
                "CREATE TABLE '{}' has no columns",
                create.table.name
            )));
        }
        out.push_str(&format!(" ({})", elements.join(", ")));
        Ok(out)
    }

    fn column_sql(&mut self, column: &ColumnDef, skip_pk: bool) -> CompileResult<String> {
        let mut out = format!("{} {}", self.preparer().quote(&column.name), column.type_name);

        if let Some(computed) = &column.computed {
            out.push_str(&format!(
                " GENERATED ALWAYS AS ({}) {}",
                computed.expression,
                if computed.persisted { "STORED" } else { "VIRTUAL" }
            ));
        }

        if let Some(identity) = &column.identity {
            if !self.dialect.supports_identity_columns {
                return Err(CompileError::capability(
                    &self.dialect.name,
                    "identity columns are not supported",
                ));
            }
            let keyword = if identity.always {
                "GENERATED ALWAYS AS IDENTITY"
            } else {
                "GENERATED BY DEFAULT AS IDENTITY"
            };
            out.push(' ');
            out.push_str(keyword);
            let mut opts = Vec::new();
            if let Some(start) = identity.start {
                opts.push(format!("START WITH {}", start));
            }
            if let Some(increment) = identity.increment {
                opts.push(format!("INCREMENT BY {}", increment));
            }
            if !opts.is_empty() {
                out.push_str(&format!(" ({})", opts.join(" ")));
            }
        }

        if let Some(default) = &column.default {
            let text = match default {
                DefaultClause::Literal(value) => {
                    self.codec()
                        .render_literal(value, &TypeInfo::Unspecified, self.dialect)?
                }
                DefaultClause::Text(text) => text.clone(),
            };
            out.push_str(&format!(" DEFAULT {}", text));
        }

        if !column.nullable {
            out.push_str(" NOT NULL");
        }
        if column.primary_key && !skip_pk {
            out.push_str(" PRIMARY KEY");
        }
        if column.unique {
            out.push_str(" UNIQUE");
        }
        Ok(out)
    }

    /// Render one table constraint, resolving an absent name through the
    /// naming-convention collaborator.
    pub(crate) fn constraint_sql(
        &mut self,
        table: &TableRef,
        constraint: &TableConstraint,
    ) -> CompileResult<String> {
        let columns: Vec<String> = match constraint {
            TableConstraint::PrimaryKey { columns, .. }
            | TableConstraint::Unique { columns, .. }
            | TableConstraint::ForeignKey { columns, .. } => columns.clone(),
            TableConstraint::Check { .. } => Vec::new(),
        };
        let name = constraint.name().map(str::to_string).or_else(|| {
            self.options
                .constraint_namer
                .as_ref()
                .and_then(|namer| namer.name_constraint(constraint.kind(), &table.name, &columns))
        });

        let mut out = String::new();
        if let Some(name) = name {
            out.push_str(&format!(
                "CONSTRAINT {} ",
                self.preparer().format_constraint(&name)
            ));
        }

        let preparer = self.preparer();
        let quoted = |cols: &[String]| -> String {
            cols.iter()
                .map(|c| preparer.quote(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match constraint {
            TableConstraint::PrimaryKey { columns, .. } => {
                out.push_str(&format!("PRIMARY KEY ({})", quoted(columns)));
            }
            TableConstraint::Unique { columns, .. } => {
                out.push_str(&format!("UNIQUE ({})", quoted(columns)));
            }
            TableConstraint::ForeignKey {
                columns,
                ref_table,
                ref_columns,
                on_delete,
                on_update,
                deferrable,
                initially_deferred,
                ..
            } => {
                out.push_str(&format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    quoted(columns),
                    preparer.format_table_ref(ref_table),
                    quoted(ref_columns)
                ));
                if let Some(action) = on_delete {
                    out.push_str(&format!(" ON DELETE {}", action.sql()));
                }
                if let Some(action) = on_update {
                    out.push_str(&format!(" ON UPDATE {}", action.sql()));
                }
                if *deferrable {
                    out.push_str(" DEFERRABLE");
                }
                if *initially_deferred {
                    out.push_str(" INITIALLY DEFERRED");
                }
            }
            TableConstraint::Check { expr, .. } => {
                // DDL cannot parameterize; criteria inline as literals
                let ctx = Ctx {
                    literal_binds: true,
                    include_table: false,
                    ..Ctx::default()
                };
                let text = self.visit_expr(expr, ctx)?;
                out.push_str(&format!("CHECK ({})", text));
            }
        }
        Ok(out)
    }

    fn visit_create_index(&mut self, index: &IndexDef) -> CompileResult<String> {
        let name = index.name.as_deref().ok_or_else(|| {
            CompileError::missing("CREATE INDEX requires an index name")
        })?;
        let table = index.table.as_ref().ok_or_else(|| {
            CompileError::missing(format!("index '{}' has no table association", name))
        })?;
        let ctx = Ctx {
            literal_binds: true,
            include_table: false,
            ..Ctx::default()
        };
        let mut cols = Vec::new();
        for expr in &index.columns {
            cols.push(self.visit_expr(expr, ctx)?);
        }
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.preparer().format_index(name),
            self.preparer().format_table_ref(table),
            cols.join(", ")
        ))
    }

    fn visit_create_sequence(&mut self, seq: &SequenceDef) -> CompileResult<String> {
        self.check_sequence_support()?;
        let mut out = format!(
            "CREATE SEQUENCE {}",
            self.preparer().format_table(seq.schema.as_deref(), &seq.name)
        );
        if let Some(start) = seq.start {
            out.push_str(&format!(" START WITH {}", start));
        }
        if let Some(increment) = seq.increment {
            out.push_str(&format!(" INCREMENT BY {}", increment));
        }
        if seq.cycle {
            out.push_str(" CYCLE");
        }
        Ok(out)
    }

    fn check_sequence_support(&self) -> CompileResult<()> {
        if self.dialect.supports_sequences {
            Ok(())
        } else {
            Err(CompileError::unsupported(format!(
                "dialect '{}' has no sequence support",
                self.dialect.name
            )))
        }
    }

    fn check_comment_support(&self) -> CompileResult<()> {
        if self.dialect.supports_comments {
            Ok(())
        } else {
            Err(CompileError::capability(
                &self.dialect.name,
                "COMMENT ON is not supported",
            ))
        }
    }
}

fn comment_literal(comment: Option<&str>) -> String {
    match comment {
        Some(text) => format!("'{}'", text.replace('\'', "''")),
        None => "NULL".to_string(),
    }
}
