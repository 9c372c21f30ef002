use std::collections::{hash_map, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use itertools::Itertools;
use num_bigint::BigInt;
use tracing::{info, warn};

use crate::ast::{Constant, RelationName};
use crate::error::{Error, EvalResult};

pub const SCHEMA_FILENAME: &str = "schema.txt";
pub const DATA_DIRNAME: &str = "files";
pub const DATA_EXTENSION: &str = "csv";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    String,
}

impl ColumnKind {
    /// Reads a raw data-file column as a constant of this kind. String
    /// columns may be wrapped in single quotes.
    pub fn parse_value(self, text: &str) -> Option<Constant> {
        let text = text.trim();
        match self {
            ColumnKind::Integer => text.parse::<BigInt>().ok().map(Constant::Integer),
            ColumnKind::String => {
                let unquoted = text
                    .strip_prefix('\'')
                    .and_then(|rest| rest.strip_suffix('\''))
                    .unwrap_or(text);
                Some(Constant::String(unquoted.to_owned()))
            }
        }
    }
}

impl FromStr for ColumnKind {
    type Err = anyhow::Error;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "int" => Ok(ColumnKind::Integer),
            "string" => Ok(ColumnKind::String),
            _ => Err(anyhow!("Unsupported column type {:?}", token)),
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnKind::Integer => "int",
            ColumnKind::String => "string",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    pub name: RelationName,
    pub columns: Vec<ColumnKind>,
}

impl Schema {
    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Clone, Debug)]
pub struct Relation {
    pub name: RelationName,
    pub schema: Schema,
    pub path: PathBuf,
}

/// Maps relation names to their schema and backing file. Built once, then
/// only read.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    relations: HashMap<RelationName, Relation>,
}

impl Catalog {
    /// Loads `<dir>/schema.txt` and registers every `<dir>/files/<name>.csv`.
    pub fn load(database_dir: impl AsRef<Path>) -> Result<Self> {
        let database_dir = database_dir.as_ref();
        let schema_path = database_dir.join(SCHEMA_FILENAME);
        let schema_text = std::fs::read_to_string(&schema_path)
            .with_context(|| format!("Failed to read schema {}", schema_path.display()))?;
        let mut schemas = parse_schemas(&schema_text)?;

        let data_dir = database_dir.join(DATA_DIRNAME);
        let entries = std::fs::read_dir(&data_dir)
            .with_context(|| format!("Failed to list {}", data_dir.display()))?;

        let mut relations = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DATA_EXTENSION) {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| anyhow!("Invalid data file name {}", path.display()))?
                .to_owned();
            let schema = schemas.remove(&name).ok_or_else(|| {
                anyhow!(
                    "Data file {} does not match any relation in the schema",
                    path.display()
                )
            })?;

            relations.insert(name.clone(), Relation { name, schema, path });
        }

        for name in schemas.keys().sorted() {
            warn!(relation = %name, "relation declared in schema has no data file");
        }
        info!(
            relations = relations.len(),
            dir = %database_dir.display(),
            "catalog loaded"
        );

        Ok(Self { relations })
    }

    pub fn relation(&self, name: &str) -> EvalResult<&Relation> {
        self.relations
            .get(name)
            .ok_or_else(|| Error::UnknownRelation {
                name: name.to_owned(),
            })
    }
}

fn parse_schemas(text: &str) -> Result<HashMap<RelationName, Schema>> {
    let mut schemas = HashMap::new();
    for (line_number, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let columns = tokens
            .map(ColumnKind::from_str)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid schema line {}", line_number + 1))?;

        match schemas.entry(name.clone()) {
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(Schema { name, columns });
            }
            hash_map::Entry::Occupied(_) => bail!("Relation {:?} declared twice", name),
        }
    }
    Ok(schemas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schemas() {
        let schemas = parse_schemas("R int int\n\nS string int\n").unwrap();
        assert_eq!(
            schemas["R"].columns,
            vec![ColumnKind::Integer, ColumnKind::Integer]
        );
        assert_eq!(
            schemas["S"].columns,
            vec![ColumnKind::String, ColumnKind::Integer]
        );
    }

    #[test]
    fn test_parse_schemas_rejects_unknown_kind() {
        assert!(parse_schemas("R int float").is_err());
    }

    #[test]
    fn test_parse_schemas_rejects_duplicates() {
        assert!(parse_schemas("R int\nR string").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(
            ColumnKind::Integer.parse_value(" -12 "),
            Some(Constant::Integer((-12).into()))
        );
        assert_eq!(ColumnKind::Integer.parse_value("'12'"), None);
        assert_eq!(
            ColumnKind::String.parse_value(" 'adbs' "),
            Some(Constant::String("adbs".to_owned()))
        );
        assert_eq!(
            ColumnKind::String.parse_value("plain"),
            Some(Constant::String("plain".to_owned()))
        );
    }
}
