//! Substitution of tuple values into comparison atoms, and their evaluation.
//!
//! Source atoms are always passed as a slice: a single scan is a slice of one
//! atom, a joined tuple is the concatenation of several. Variables are looked
//! up by scanning the atoms in order while accumulating a column offset.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::ast::{ComparisonAtom, ComparisonOp, Constant, RelationalAtom, Term, Variable};
use crate::error::{Error, EvalResult};
use crate::tuple::Tuple;

/// Total number of columns a tuple produced for `atoms` must have.
pub fn combined_arity(atoms: &[RelationalAtom]) -> usize {
    atoms.iter().map(RelationalAtom::arity).sum()
}

pub fn check_arity(atoms: &[RelationalAtom], tuple: &Tuple) -> EvalResult<()> {
    let expected = combined_arity(atoms);
    if tuple.len() != expected {
        return Err(Error::ArityMismatch {
            context: format!("tuple ({}) for {}", tuple, describe(atoms)),
            expected,
            found: tuple.len(),
        });
    }
    Ok(())
}

/// Every value `variable` takes in `tuple`, one per occurrence across `atoms`.
pub fn occurrences<'t>(
    variable: &Variable,
    atoms: &[RelationalAtom],
    tuple: &'t Tuple,
) -> Vec<&'t Constant> {
    let mut offset = 0;
    let mut found = vec![];
    for atom in atoms {
        for (column, term) in atom.terms.iter().enumerate() {
            if term.as_variable() == Some(variable) {
                if let Some(value) = tuple.get(offset + column) {
                    found.push(value);
                }
            }
        }
        offset += atom.arity();
    }
    found
}

/// The value bound to the first occurrence of `variable` in `atoms`.
pub fn lookup<'t>(
    variable: &Variable,
    atoms: &[RelationalAtom],
    tuple: &'t Tuple,
) -> EvalResult<&'t Constant> {
    check_arity(atoms, tuple)?;

    let mut offset = 0;
    for atom in atoms {
        if let Some(column) = atom.position(variable) {
            return Ok(&tuple.fields()[offset + column]);
        }
        offset += atom.arity();
    }

    Err(Error::UnboundVariable {
        variable: variable.clone(),
        atoms: describe(atoms),
    })
}

pub fn resolve(term: &Term, atoms: &[RelationalAtom], tuple: &Tuple) -> EvalResult<Constant> {
    match term {
        Term::Constant(constant) => Ok(constant.clone()),
        Term::Variable(variable) => lookup(variable, atoms, tuple).cloned(),
    }
}

/// Replaces every variable of `atom` with its value in `tuple`.
pub fn substitute(
    atom: &ComparisonAtom,
    tuple: &Tuple,
    atoms: &[RelationalAtom],
) -> EvalResult<ComparisonAtom> {
    Ok(ComparisonAtom {
        lhs: resolve(&atom.lhs, atoms, tuple)?.into(),
        op: atom.op,
        rhs: resolve(&atom.rhs, atoms, tuple)?.into(),
    })
}

/// Like [`substitute`], but a variable may be bound by the left tuple, the
/// right tuple, or both. When both bind it they must agree.
pub fn substitute_across(
    atom: &ComparisonAtom,
    left_atoms: &[RelationalAtom],
    left: &Tuple,
    right_atom: &RelationalAtom,
    right: &Tuple,
) -> EvalResult<ComparisonAtom> {
    let resolve_term = |term: &Term| -> EvalResult<Constant> {
        let variable = match term {
            Term::Constant(constant) => return Ok(constant.clone()),
            Term::Variable(variable) => variable,
        };

        let right_value = match right_atom.position(variable) {
            Some(column) => Some(right.get(column).ok_or_else(|| Error::ArityMismatch {
                context: format!("tuple ({}) for {}", right, right_atom),
                expected: right_atom.arity(),
                found: right.len(),
            })?),
            None => None,
        };
        let left_values = occurrences(variable, left_atoms, left);

        match (left_values.first(), right_value) {
            (Some(left_value), Some(right_value)) if left_value != &right_value => {
                Err(Error::InvariantViolation {
                    variable: variable.clone(),
                    left: (*left_value).clone(),
                    right: right_value.clone(),
                })
            }
            (_, Some(value)) | (Some(&value), None) => Ok(value.clone()),
            (None, None) => Err(Error::UnboundVariable {
                variable: variable.clone(),
                atoms: describe(left_atoms.iter().chain(Some(right_atom))),
            }),
        }
    };

    Ok(ComparisonAtom {
        lhs: resolve_term(&atom.lhs)?.into(),
        op: atom.op,
        rhs: resolve_term(&atom.rhs)?.into(),
    })
}

/// Decides a ground comparison.
pub fn evaluate(atom: &ComparisonAtom) -> EvalResult<bool> {
    match (&atom.lhs, &atom.rhs) {
        (Term::Constant(lhs), Term::Constant(rhs)) => compare(atom.op, lhs, rhs),
        _ => Err(Error::NotGround { atom: atom.clone() }),
    }
}

pub fn compare(op: ComparisonOp, lhs: &Constant, rhs: &Constant) -> EvalResult<bool> {
    let ordering = match op {
        ComparisonOp::Eq => return Ok(lhs == rhs),
        ComparisonOp::Ne => return Ok(lhs != rhs),
        _ => lhs.try_cmp(rhs).ok_or_else(|| Error::IncompatibleTypes {
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        })?,
    };

    Ok(match op {
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::Le => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        ComparisonOp::Ge => ordering != Ordering::Less,
        ComparisonOp::Eq | ComparisonOp::Ne => unreachable!(),
    })
}

/// Substitutes from a single-side tuple and evaluates.
pub fn holds(atom: &ComparisonAtom, tuple: &Tuple, atoms: &[RelationalAtom]) -> EvalResult<bool> {
    evaluate(&substitute(atom, tuple, atoms)?)
}

/// Checks Datalog's implicit equi-join: every variable of `right_atom` must
/// take the same value in `right` as at each of its positions on the left.
pub fn same_variable_consistent(
    left_atoms: &[RelationalAtom],
    left: &Tuple,
    right_atom: &RelationalAtom,
    right: &Tuple,
) -> EvalResult<bool> {
    check_arity(left_atoms, left)?;
    check_arity(std::slice::from_ref(right_atom), right)?;

    for (column, term) in right_atom.terms.iter().enumerate() {
        let variable = match term {
            Term::Variable(variable) => variable,
            Term::Constant(_) => {
                return Err(Error::EmbeddedConstant {
                    atom: right_atom.clone(),
                })
            }
        };
        let value = &right.fields()[column];
        if occurrences(variable, left_atoms, left)
            .into_iter()
            .any(|left_value| left_value != value)
        {
            return Ok(false);
        }
    }
    Ok(true)
}

fn describe<'a>(atoms: impl IntoIterator<Item = &'a RelationalAtom>) -> String {
    atoms.into_iter().join(", ")
}
