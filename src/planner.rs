//! Turns a parsed query into a runnable operator tree.
//!
//! The plan is always the same shape: one scan per relational atom in body
//! order, a select over each scan that has leaf predicates, a left-deep join
//! chain over those leaves, and a projection at the root.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::debug;

use crate::ast::{Atom, ComparisonAtom, ComparisonOp, Query, RelationalAtom, Term, Variable};
use crate::catalog::Catalog;
use crate::error::{Error, EvalResult};
use crate::operator::{Join, Operator, Project, Scan, Select};

/// Rewrites every constant inside a relational atom into a fresh variable
/// plus an equality, appended to the body.
///
/// Fresh names are the relation name followed by the column index, with
/// zeros inserted before the index until the name is unused.
pub fn extract_constants(query: &Query) -> Query {
    let mut taken: HashSet<String> = query
        .relational_atoms()
        .chain(Some(&query.head))
        .flat_map(RelationalAtom::variables)
        .map(|variable| variable.0.clone())
        .collect();

    let mut equalities = vec![];
    let mut body: Vec<Atom> = query
        .body
        .iter()
        .map(|atom| match atom {
            Atom::Relational(relational) if relational.has_constants() => {
                let terms = relational
                    .terms
                    .iter()
                    .enumerate()
                    .map(|(index, term)| match term {
                        Term::Variable(_) => term.clone(),
                        Term::Constant(constant) => {
                            let fresh = fresh_variable(&mut taken, &relational.name, index);
                            equalities.push(Atom::Comparison(ComparisonAtom::new(
                                fresh.clone(),
                                ComparisonOp::Eq,
                                constant.clone(),
                            )));
                            Term::Variable(fresh)
                        }
                    })
                    .collect();
                Atom::Relational(RelationalAtom::new(relational.name.clone(), terms))
            }
            _ => atom.clone(),
        })
        .collect();
    body.extend(equalities);

    Query {
        head: query.head.clone(),
        body,
    }
}

fn fresh_variable(taken: &mut HashSet<String>, relation: &str, index: usize) -> Variable {
    let mut prefix = relation.to_owned();
    let mut candidate = format!("{}{}", prefix, index);
    while taken.contains(&candidate) {
        prefix.push('0');
        candidate = format!("{}{}", prefix, index);
    }
    taken.insert(candidate.clone());
    Variable(candidate)
}

/// Whether `comparison` can be evaluated directly above a single scan: it has
/// at most one variable, or its two variables are never split across atoms.
pub fn is_leaf_pushable(comparison: &ComparisonAtom, atoms: &[RelationalAtom]) -> bool {
    let (lhs, rhs) = match (comparison.lhs.as_variable(), comparison.rhs.as_variable()) {
        (Some(lhs), Some(rhs)) => (lhs, rhs),
        _ => return true,
    };
    !atoms
        .iter()
        .any(|atom| atom.contains(lhs) != atom.contains(rhs))
}

fn mentions_any(atom: &RelationalAtom, comparison: &ComparisonAtom) -> bool {
    comparison.variables().any(|variable| atom.contains(variable))
}

/// Index of the last atom containing either variable of a join condition.
/// The join whose right leaf is that atom is the first point at which both
/// variables are in scope.
pub fn join_position(comparison: &ComparisonAtom, atoms: &[RelationalAtom]) -> Option<usize> {
    atoms
        .iter()
        .rposition(|atom| mentions_any(atom, comparison))
}

/// Builds operator trees against one catalog.
#[derive(Clone, Copy, Debug)]
pub struct QueryPlanner<'a> {
    catalog: &'a Catalog,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn plan(&self, query: &Query) -> EvalResult<Operator> {
        let query = extract_constants(query);
        debug!(query = %query, "normalized query");

        let atoms: Vec<RelationalAtom> = query.relational_atoms().cloned().collect();
        if atoms.is_empty() {
            return Err(Error::NoRelationalAtoms);
        }
        let comparisons: Vec<ComparisonAtom> = query.comparison_atoms().cloned().collect();
        check_bound(&comparisons, &atoms)?;

        let mut leaf_predicates: Vec<Vec<ComparisonAtom>> = vec![vec![]; atoms.len()];
        let mut join_conditions: HashMap<usize, Vec<ComparisonAtom>> = HashMap::new();
        for comparison in comparisons {
            if comparison.is_ground() {
                // Nothing to substitute; any leaf can decide it.
                leaf_predicates[0].push(comparison);
            } else if is_leaf_pushable(&comparison, &atoms) {
                for (index, atom) in atoms.iter().enumerate() {
                    if mentions_any(atom, &comparison) {
                        leaf_predicates[index].push(comparison.clone());
                    }
                }
            } else if let Some(position) = join_position(&comparison, &atoms) {
                join_conditions.entry(position).or_default().push(comparison);
            }
        }

        let mut leaves = vec![];
        for (atom, predicates) in atoms.iter().zip(leaf_predicates) {
            let relation = self.catalog.relation(&atom.name)?;
            let scan = Operator::Scan(Scan::new(relation, atom.clone())?);
            let leaf = if predicates.is_empty() && !repeats_variable(atom) {
                scan
            } else {
                Operator::Select(Select::new(scan, atom.clone(), predicates)?)
            };
            leaves.push(leaf);
        }

        let mut leaves = leaves.into_iter().zip(atoms).enumerate();
        let (_, (mut root, first_atom)) = leaves.next().ok_or(Error::NoRelationalAtoms)?;
        let mut left_atoms = vec![first_atom];
        for (position, (leaf, atom)) in leaves {
            let conditions = join_conditions.remove(&position).unwrap_or_default();
            root = Operator::Join(Join::new(
                root,
                leaf,
                left_atoms.clone(),
                atom.clone(),
                conditions,
            )?);
            left_atoms.push(atom);
        }

        let root = Operator::Project(Project::new(root, query.head.terms.clone(), left_atoms)?);
        debug!(plan = %root.explain(), "planned query");
        Ok(root)
    }
}

fn repeats_variable(atom: &RelationalAtom) -> bool {
    let mut seen = HashSet::new();
    atom.variables().any(|variable| !seen.insert(variable))
}

fn check_bound(comparisons: &[ComparisonAtom], atoms: &[RelationalAtom]) -> EvalResult<()> {
    for comparison in comparisons {
        for variable in comparison.variables() {
            if !atoms.iter().any(|atom| atom.contains(variable)) {
                return Err(Error::UnboundVariable {
                    variable: variable.clone(),
                    atoms: atoms.iter().join(", "),
                });
            }
        }
    }
    Ok(())
}
