//! Pull-based operators.
//!
//! Each operator produces tuples one at a time via [`Operator::next()`] and
//! can be rewound with [`Operator::reset()`]. The planner composes them into a
//! tree (Project -> Join -> Select -> Scan) where each parent pulls from its
//! children.

use std::fmt::Write as _;
use std::io::Write;

use itertools::Itertools;

use crate::error::EvalResult;
use crate::tuple::Tuple;

mod join;
mod project;
mod scan;
mod select;

pub use join::Join;
pub use project::Project;
pub use scan::Scan;
pub use select::Select;

/// A query plan node.
///
/// The set of node kinds is fixed by the planner, so this is an enum rather
/// than a trait object.
pub enum Operator {
    Scan(Scan),
    Select(Select),
    Join(Join),
    Project(Project),
}

impl Operator {
    /// Returns the next tuple, or `None` once exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> EvalResult<Option<Tuple>> {
        match self {
            Operator::Scan(n) => n.next(),
            Operator::Select(n) => n.next(),
            Operator::Join(n) => n.next(),
            Operator::Project(n) => n.next(),
        }
    }

    /// Rewinds to the first tuple of this operator's output.
    pub fn reset(&mut self) -> EvalResult<()> {
        match self {
            Operator::Scan(n) => n.reset(),
            Operator::Select(n) => n.reset(),
            Operator::Join(n) => n.reset(),
            Operator::Project(n) => n.reset(),
        }
    }

    /// Pulls every remaining tuple.
    pub fn drain(&mut self) -> EvalResult<Vec<Tuple>> {
        let mut tuples = vec![];
        while let Some(tuple) = self.next()? {
            tuples.push(tuple);
        }
        Ok(tuples)
    }

    /// Writes every remaining tuple to `out`, one per line, and returns how
    /// many were written. Tuples written before an error stay written.
    pub fn dump<W: Write>(&mut self, out: &mut W) -> EvalResult<usize> {
        let mut count = 0;
        while let Some(tuple) = self.next()? {
            writeln!(out, "{}", tuple)?;
            count += 1;
        }
        out.flush()?;
        Ok(count)
    }

    /// Renders the operator tree, one node per line, children indented.
    pub fn explain(&self) -> String {
        let mut s = String::new();
        self.explain_into(&mut s, 0);
        s
    }

    fn explain_into(&self, s: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        // Writing to a String cannot fail.
        let _ = match self {
            Operator::Scan(n) => writeln!(s, "{}Scan {}", indent, n.atom()),
            Operator::Select(n) => writeln!(
                s,
                "{}Select {} [{}]",
                indent,
                n.atom(),
                n.predicates().iter().join(", ")
            ),
            Operator::Join(n) => writeln!(
                s,
                "{}Join {} [{}]",
                indent,
                n.right_atom(),
                n.conditions().iter().join(", ")
            ),
            Operator::Project(n) => writeln!(
                s,
                "{}Project ({})",
                indent,
                n.outputs().iter().join(", ")
            ),
        };

        match self {
            Operator::Scan(_) => {}
            Operator::Select(n) => n.child().explain_into(s, depth + 1),
            Operator::Join(n) => {
                n.left().explain_into(s, depth + 1);
                n.right().explain_into(s, depth + 1);
            }
            Operator::Project(n) => n.child().explain_into(s, depth + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::ast::{ComparisonAtom, ComparisonOp, Constant, RelationalAtom, Term, Variable};
    use crate::catalog::{ColumnKind, Relation, Schema};
    use crate::error::Error;
    use crate::eval;

    fn relation(dir: &TempDir, name: &str, rows: &str, arity: usize) -> Relation {
        let path = dir.path().join(format!("{}.csv", name));
        fs::write(&path, rows).unwrap();
        Relation {
            name: name.to_owned(),
            schema: Schema {
                name: name.to_owned(),
                columns: vec![ColumnKind::Integer; arity],
            },
            path,
        }
    }

    fn atom(name: &str, vars: &[&str]) -> RelationalAtom {
        RelationalAtom::new(
            name,
            vars.iter()
                .map(|v| Term::Variable(Variable::new(*v)))
                .collect(),
        )
    }

    fn scan(relation: &Relation, atom: &RelationalAtom) -> Operator {
        Operator::Scan(Scan::new(relation, atom.clone()).unwrap())
    }

    fn ints(values: &[i64]) -> Tuple {
        Tuple::new(values.iter().map(|&v| Constant::Integer(v.into())).collect())
    }

    fn lt(lhs: &str, rhs: i64) -> ComparisonAtom {
        ComparisonAtom::new(
            Variable::new(lhs),
            ComparisonOp::Lt,
            Constant::Integer(rhs.into()),
        )
    }

    #[test]
    fn test_select_keeps_only_passing_tuples() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1,9\n5,2\n3,3\n7,1\n", 2);
        let r_atom = atom("R", &["x", "y"]);
        let predicates = vec![lt("x", 6), lt("y", 4)];

        let mut select = Select::new(scan(&r, &r_atom), r_atom.clone(), predicates).unwrap();
        let mut passed = vec![];
        while let Some(tuple) = select.next().unwrap() {
            passed.push(tuple);
        }
        assert_eq!(passed, vec![ints(&[5, 2]), ints(&[3, 3])]);

        let mut all = scan(&r, &r_atom);
        while let Some(tuple) = all.next().unwrap() {
            let expected = select
                .predicates()
                .iter()
                .all(|p| eval::holds(p, &tuple, std::slice::from_ref(&r_atom)).unwrap());
            assert_eq!(select.passes(&tuple).unwrap(), expected);
        }

        select.reset().unwrap();
        assert_eq!(select.next().unwrap(), Some(ints(&[5, 2])));
    }

    #[test]
    fn test_select_enforces_repeated_variable() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1,2\n4,4\n", 2);
        let r_atom = atom("R", &["x", "x"]);
        let mut select = Operator::Select(Select::new(scan(&r, &r_atom), r_atom, vec![]).unwrap());
        assert_eq!(select.drain().unwrap(), vec![ints(&[4, 4])]);
    }

    #[test]
    fn test_select_rejects_embedded_constant() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1\n", 1);
        let plain = atom("R", &["x"]);
        let constant = RelationalAtom::new("R", vec![Term::Constant(Constant::Integer(1.into()))]);
        assert!(matches!(
            Select::new(scan(&r, &plain), constant, vec![]),
            Err(Error::EmbeddedConstant { .. })
        ));
    }

    #[test]
    fn test_join_agrees_on_shared_variables() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1,2\n1,3\n2,3\n", 2);
        let s = relation(&dir, "S", "3,10\n2,20\n3,30\n", 2);
        let r_atom = atom("R", &["x", "y"]);
        let s_atom = atom("S", &["y", "z"]);

        let mut join = Operator::Join(
            Join::new(
                scan(&r, &r_atom),
                scan(&s, &s_atom),
                vec![r_atom.clone()],
                s_atom.clone(),
                vec![],
            )
            .unwrap(),
        );
        let joined = join.drain().unwrap();
        assert_eq!(
            joined,
            vec![
                ints(&[1, 2, 2, 20]),
                ints(&[1, 3, 3, 10]),
                ints(&[1, 3, 3, 30]),
                ints(&[2, 3, 3, 10]),
                ints(&[2, 3, 3, 30]),
            ]
        );
        for tuple in &joined {
            assert_eq!(tuple.get(1), tuple.get(2));
        }

        join.reset().unwrap();
        assert_eq!(join.drain().unwrap(), joined);
    }

    #[test]
    fn test_join_applies_conditions() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1\n5\n", 1);
        let s = relation(&dir, "S", "3\n7\n", 1);
        let r_atom = atom("R", &["x"]);
        let s_atom = atom("S", &["y"]);
        let x_lt_y = ComparisonAtom::new(Variable::new("x"), ComparisonOp::Lt, Variable::new("y"));

        let mut join = Operator::Join(
            Join::new(
                scan(&r, &r_atom),
                scan(&s, &s_atom),
                vec![r_atom.clone()],
                s_atom.clone(),
                vec![x_lt_y],
            )
            .unwrap(),
        );
        assert_eq!(
            join.drain().unwrap(),
            vec![ints(&[1, 3]), ints(&[1, 7]), ints(&[5, 7])]
        );
    }

    #[test]
    fn test_project_deduplicates_and_reset_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1,2\n1,3\n2,2\n1,2\n", 2);
        let r_atom = atom("R", &["x", "y"]);
        let outputs = vec![Term::Variable(Variable::new("x"))];

        let mut project = Operator::Project(
            Project::new(scan(&r, &r_atom), outputs, vec![r_atom.clone()]).unwrap(),
        );
        assert_eq!(project.drain().unwrap(), vec![ints(&[1]), ints(&[2])]);
        assert_eq!(project.next().unwrap(), None);

        project.reset().unwrap();
        assert_eq!(project.drain().unwrap(), vec![ints(&[1]), ints(&[2])]);
    }

    #[test]
    fn test_project_rejects_unbound_output() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1\n", 1);
        let r_atom = atom("R", &["x"]);
        let outputs = vec![Term::Variable(Variable::new("w"))];
        assert!(matches!(
            Project::new(scan(&r, &r_atom), outputs, vec![r_atom.clone()]),
            Err(Error::UnboundVariable { .. })
        ));
    }

    #[test]
    fn test_dump_stops_at_first_error() {
        let dir = tempfile::tempdir().unwrap();
        let r = relation(&dir, "R", "1\n2\nthree\n4\n", 1);
        let r_atom = atom("R", &["x"]);

        let mut out = vec![];
        let result = scan(&r, &r_atom).dump(&mut out);
        assert!(matches!(result, Err(Error::MalformedValue { line: 3, .. })));
        assert_eq!(String::from_utf8(out).unwrap(), "1\n2\n");
    }
}
