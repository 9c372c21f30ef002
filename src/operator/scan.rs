use std::fs::File;
use std::io::{BufRead, BufReader, Lines};

use tracing::trace;

use crate::ast::RelationalAtom;
use crate::catalog::{Relation, Schema};
use crate::error::{Error, EvalResult};
use crate::tuple::Tuple;

/// Reads one relation's data file, emitting each line as a typed tuple.
pub struct Scan {
    relation: Relation,
    atom: RelationalAtom,
    lines: Lines<BufReader<File>>,
    /// 1-based number of the last line read.
    line: usize,
}

impl Scan {
    /// Opens the relation's file. `atom` is the body atom this scan stands
    /// for; its arity must match the relation's schema.
    pub fn new(relation: &Relation, atom: RelationalAtom) -> EvalResult<Self> {
        if atom.arity() != relation.schema.arity() {
            return Err(Error::ArityMismatch {
                context: format!("atom {} against relation {}", atom, relation.name),
                expected: relation.schema.arity(),
                found: atom.arity(),
            });
        }

        Ok(Self {
            lines: open(relation)?,
            relation: relation.clone(),
            atom,
            line: 0,
        })
    }

    pub fn atom(&self) -> &RelationalAtom {
        &self.atom
    }

    pub(super) fn next(&mut self) -> EvalResult<Option<Tuple>> {
        for line in &mut self.lines {
            self.line += 1;
            let line = line.map_err(|source| Error::Io {
                path: self.relation.path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            return parse_row(&self.relation.schema, self.line, &line).map(Some);
        }
        Ok(None)
    }

    pub(super) fn reset(&mut self) -> EvalResult<()> {
        trace!(relation = %self.relation.name, "rewinding scan");
        self.lines = open(&self.relation)?;
        self.line = 0;
        Ok(())
    }
}

fn open(relation: &Relation) -> EvalResult<Lines<BufReader<File>>> {
    let file = File::open(&relation.path).map_err(|source| Error::Io {
        path: relation.path.clone(),
        source,
    })?;
    Ok(BufReader::new(file).lines())
}

fn parse_row(schema: &Schema, line: usize, text: &str) -> EvalResult<Tuple> {
    let cells: Vec<&str> = text.split(',').collect();
    if cells.len() != schema.arity() {
        return Err(Error::SchemaMismatch {
            relation: schema.name.clone(),
            line,
            expected: schema.arity(),
            found: cells.len(),
        });
    }

    cells
        .into_iter()
        .zip(&schema.columns)
        .enumerate()
        .map(|(column, (cell, &kind))| {
            kind.parse_value(cell).ok_or_else(|| Error::MalformedValue {
                relation: schema.name.clone(),
                line,
                column,
                kind,
                text: cell.trim().to_owned(),
            })
        })
        .collect::<EvalResult<Vec<_>>>()
        .map(Tuple::new)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::ast::{Constant, Term, Variable};
    use crate::catalog::ColumnKind;

    fn relation(dir: &tempfile::TempDir, text: &str, columns: Vec<ColumnKind>) -> Relation {
        let path = dir.path().join("R.csv");
        fs::write(&path, text).unwrap();
        Relation {
            name: "R".to_owned(),
            schema: Schema {
                name: "R".to_owned(),
                columns,
            },
            path,
        }
    }

    fn atom(arity: usize) -> RelationalAtom {
        RelationalAtom::new(
            "R",
            (0..arity)
                .map(|i| Term::Variable(Variable::new(format!("v{}", i))))
                .collect(),
        )
    }

    #[test]
    fn test_scan_types_columns() {
        let dir = tempfile::tempdir().unwrap();
        let rel = relation(
            &dir,
            "1, 'adbs'\n-7, plain\n",
            vec![ColumnKind::Integer, ColumnKind::String],
        );
        let mut scan = Scan::new(&rel, atom(2)).unwrap();

        assert_eq!(
            scan.next().unwrap(),
            Some(Tuple::new(vec![
                Constant::Integer(1.into()),
                Constant::String("adbs".to_owned())
            ]))
        );
        assert_eq!(
            scan.next().unwrap(),
            Some(Tuple::new(vec![
                Constant::Integer((-7).into()),
                Constant::String("plain".to_owned())
            ]))
        );
        assert_eq!(scan.next().unwrap(), None);
        assert_eq!(scan.next().unwrap(), None);
    }

    #[test]
    fn test_scan_reset_replays_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rel = relation(&dir, "1,2\n3,4\n\n5,6\n", vec![ColumnKind::Integer; 2]);
        let mut scan = Scan::new(&rel, atom(2)).unwrap();

        let mut first = vec![];
        while let Some(tuple) = scan.next().unwrap() {
            first.push(tuple);
        }
        assert_eq!(first.len(), 3);

        for _ in 0..3 {
            scan.reset().unwrap();
            let mut again = vec![];
            while let Some(tuple) = scan.next().unwrap() {
                again.push(tuple);
            }
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_scan_reports_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let rel = relation(&dir, "1,2\n3\n", vec![ColumnKind::Integer; 2]);
        let mut scan = Scan::new(&rel, atom(2)).unwrap();

        assert!(scan.next().unwrap().is_some());
        match scan.next() {
            Err(Error::SchemaMismatch {
                line,
                expected,
                found,
                ..
            }) => assert_eq!((line, expected, found), (2, 2, 1)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scan_reports_malformed_value() {
        let dir = tempfile::tempdir().unwrap();
        let rel = relation(&dir, "1,two\n", vec![ColumnKind::Integer; 2]);
        let mut scan = Scan::new(&rel, atom(2)).unwrap();

        assert!(matches!(
            scan.next(),
            Err(Error::MalformedValue { column: 1, .. })
        ));
    }

    #[test]
    fn test_scan_rejects_atom_of_wrong_arity() {
        let dir = tempfile::tempdir().unwrap();
        let rel = relation(&dir, "1,2\n", vec![ColumnKind::Integer; 2]);
        assert!(matches!(
            Scan::new(&rel, atom(3)),
            Err(Error::ArityMismatch { .. })
        ));
    }
}
