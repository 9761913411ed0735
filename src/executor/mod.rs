pub mod join;
pub mod predicate;

use std::fmt::Display;
use std::path::PathBuf;

use log::{debug, info};

use crate::error::{DbError, Result};
use crate::query::{ColumnDef, Condition, Literal, Projection, Stmt, parse};
use crate::storage::{DataType, DataValue, Field, Table, TableSchema};

pub const HELP_TEXT: &str = "\
Statements:
  CREATE TABLE <name> (<field> <int|bool|text[(n)]>, ...)
  USE <name>
  INSERT INTO <name> VALUES (<value>, ...)
  SELECT * | <field>, ... | COUNT(*) FROM <name> [WHERE <field> <op> <value> [AND|OR ...]]
  SELECT * FROM <a> [INNER|LEFT|RIGHT|FULL] JOIN <b> ON <a.field> = <b.field>
  FIND TEXT '<substring>'
  LOAD <path>
  HELP
  EXIT
Operators: = == != <> > < >= <=  (conditions combine left to right)";

/// A result row as `(label, value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<(String, DataValue)>);

impl Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (label, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{label}: {value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    Returned,
    Found,
    Joined,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Rows {
        notice: Option<String>,
        rows: Vec<Row>,
        footer: Footer,
    },
    Count(usize),
    Success(String),
    /// Script to be fed back through the executor by the caller.
    Load(PathBuf),
    Help,
    Exit,
    Error(String),
}

impl Display for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryResult::Rows {
                notice,
                rows,
                footer,
            } => {
                if let Some(notice) = notice {
                    writeln!(f, "{notice}")?;
                }
                for row in rows {
                    writeln!(f, "{row}")?;
                }
                match footer {
                    Footer::Returned => write!(f, "{} rows returned", rows.len()),
                    Footer::Found => write!(f, "{} records found", rows.len()),
                    Footer::Joined => write!(f, "{} records joined", rows.len()),
                }
            }
            QueryResult::Count(count) => write!(f, "COUNT: {count}"),
            QueryResult::Success(message) => f.write_str(message),
            QueryResult::Load(path) => write!(f, "Loading script: {}", path.display()),
            QueryResult::Help => f.write_str(HELP_TEXT),
            QueryResult::Exit => f.write_str("Bye"),
            QueryResult::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

/// Executes statements against the table files of one data directory.
/// At most one table is active at a time; INSERT, SELECT and FIND work on it.
pub struct Executor {
    data_dir: PathBuf,
    session: Option<Table>,
}

impl Executor {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            session: None,
        }
    }

    pub fn active_table(&self) -> Option<&Table> {
        self.session.as_ref()
    }

    /// Parses and executes one statement. Failures are reported as
    /// [`QueryResult::Error`] and leave the session untouched.
    pub fn run(&mut self, src: &str) -> QueryResult {
        let result = parse(src)
            .map_err(DbError::from)
            .and_then(|stmt| self.execute(stmt));

        match result {
            Ok(result) => result,
            Err(e) => {
                debug!("statement failed: {e}");
                QueryResult::Error(e.to_string())
            }
        }
    }

    pub fn execute(&mut self, stmt: Stmt) -> Result<QueryResult> {
        match stmt {
            Stmt::Create { table, columns } => self.run_create(&table, &columns),
            Stmt::Use { table } => self.run_use(&table),
            Stmt::Insert { table, values } => self.run_insert(&table, &values),
            Stmt::Select {
                table,
                projection,
                filters,
            } => self.run_select(&table, &projection, &filters),
            Stmt::Join(spec) => join::execute(&self.data_dir, &spec),
            Stmt::Find { needle } => self.run_find(&needle),
            Stmt::Load { path } => Ok(QueryResult::Load(PathBuf::from(path.as_ref()))),
            Stmt::Help => Ok(QueryResult::Help),
            Stmt::Exit => Ok(QueryResult::Exit),
        }
    }

    fn run_create(&self, table: &str, columns: &[ColumnDef]) -> Result<QueryResult> {
        let fields = columns
            .iter()
            .map(|column| {
                DataType::from_declaration(&column.type_name, column.size)
                    .map(|data_type| Field::new(column.name.as_ref(), data_type))
            })
            .collect::<Result<Vec<_>>>()?;
        let schema = TableSchema::new(table, fields)?;
        Table::create(&self.data_dir, &schema)?;

        Ok(QueryResult::Success(format!("Table '{table}' created")))
    }

    fn run_use(&mut self, table: &str) -> Result<QueryResult> {
        let opened = Table::open(&self.data_dir, table)?;
        let records = opened.len();
        if let Some(previous) = self.session.replace(opened) {
            debug!("closing table '{}'", previous.name());
        }
        info!("active table is now '{table}' ({records} records)");

        Ok(QueryResult::Success(format!(
            "Table '{table}' loaded with indexes ({records} records)"
        )))
    }

    /// The active table, checked against the table named by the statement.
    fn active(&mut self, requested: Option<&str>) -> Result<&mut Table> {
        let table = self.session.as_mut().ok_or(DbError::NoActiveTable)?;
        match requested {
            Some(name) if name != table.name() => Err(DbError::TableNotActive {
                requested: name.to_string(),
                active: table.name().to_string(),
            }),
            _ => Ok(table),
        }
    }

    fn run_insert(&mut self, table: &str, literals: &[Literal]) -> Result<QueryResult> {
        let table = self.active(Some(table))?;
        let schema = table.schema();
        if literals.len() != schema.len() {
            return Err(DbError::ValueCount {
                expected: schema.len(),
                found: literals.len(),
            });
        }

        let values = schema
            .fields
            .iter()
            .zip(literals)
            .map(|(field, literal)| coerce(field, literal))
            .collect::<Result<Vec<_>>>()?;
        let position = table.insert(&values)?;
        debug!("inserted into '{}' at {position}", table.name());

        Ok(QueryResult::Success("1 row inserted".to_string()))
    }

    fn run_select(
        &mut self,
        table: &str,
        projection: &Projection,
        filters: &[Condition],
    ) -> Result<QueryResult> {
        let table = self.active(Some(table))?;
        let schema = table.schema();

        let columns = match projection {
            Projection::All | Projection::Count => (0..schema.len()).collect::<Vec<_>>(),
            Projection::Columns(names) => names
                .iter()
                .map(|name| {
                    schema
                        .index_of(name)
                        .ok_or_else(|| DbError::FieldNotFound(name.to_string()))
                })
                .collect::<Result<Vec<_>>>()?,
        };
        predicate::validate(schema, filters)?;

        let mut rows = Vec::new();
        let mut count = 0;
        for entry in table.scan()? {
            let (_, values) = entry?;
            if !predicate::evaluate_chain(schema, &values, filters) {
                continue;
            }
            count += 1;
            if *projection != Projection::Count {
                rows.push(Row(columns
                    .iter()
                    .map(|&i| (schema.fields[i].name.clone(), values[i].clone()))
                    .collect()));
            }
        }

        Ok(match projection {
            Projection::Count => QueryResult::Count(count),
            _ => QueryResult::Rows {
                notice: None,
                rows,
                footer: Footer::Returned,
            },
        })
    }

    /// Full scan of every text field for `needle`.
    fn run_find(&mut self, needle: &str) -> Result<QueryResult> {
        let table = self.active(None)?;
        let schema = table.schema();

        let mut rows = Vec::new();
        for entry in table.scan()? {
            let (_, values) = entry?;
            let hit = values
                .iter()
                .any(|value| matches!(value, DataValue::Text(text) if text.contains(needle)));
            if hit {
                rows.push(Row(schema
                    .fields
                    .iter()
                    .map(|field| field.name.clone())
                    .zip(values)
                    .collect()));
            }
        }

        Ok(QueryResult::Rows {
            notice: None,
            rows,
            footer: Footer::Found,
        })
    }
}

/// Converts an INSERT literal to the field's type. Text fields take any
/// literal in its textual form; bool fields also take 0 and 1.
fn coerce(field: &Field, literal: &Literal) -> Result<DataValue> {
    let value = match (field.data_type, literal) {
        (DataType::Int, Literal::Number(num)) => i32::try_from(*num).ok().map(DataValue::Int),
        (DataType::Bool, Literal::Bool(value)) => Some(DataValue::Bool(*value)),
        (DataType::Bool, Literal::Number(num @ (0 | 1))) => Some(DataValue::Bool(*num == 1)),
        (DataType::Text(_), literal) => Some(DataValue::Text(literal.to_text())),
        _ => None,
    };

    value.ok_or_else(|| DbError::TypeMismatch {
        field: field.name.clone(),
        data_type: field.data_type.to_string(),
        value: literal.to_text(),
    })
}
