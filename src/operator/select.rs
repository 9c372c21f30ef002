use std::slice;

use crate::ast::{ComparisonAtom, RelationalAtom};
use crate::error::{Error, EvalResult};
use crate::eval;
use crate::tuple::Tuple;

use super::Operator;

/// Filters one relation's tuples by predicates that only mention its columns.
///
/// A variable repeated inside the atom (`R(x, x)`) also requires the
/// repeated columns to be equal.
pub struct Select {
    child: Box<Operator>,
    atom: RelationalAtom,
    predicates: Vec<ComparisonAtom>,
}

impl Select {
    pub fn new(
        child: Operator,
        atom: RelationalAtom,
        predicates: Vec<ComparisonAtom>,
    ) -> EvalResult<Self> {
        if atom.has_constants() {
            return Err(Error::EmbeddedConstant { atom });
        }
        Ok(Self {
            child: Box::new(child),
            atom,
            predicates,
        })
    }

    pub fn atom(&self) -> &RelationalAtom {
        &self.atom
    }

    pub fn predicates(&self) -> &[ComparisonAtom] {
        &self.predicates
    }

    pub(super) fn child(&self) -> &Operator {
        &self.child
    }

    pub(super) fn next(&mut self) -> EvalResult<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            if self.passes(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    pub(super) fn reset(&mut self) -> EvalResult<()> {
        self.child.reset()
    }

    /// Whether `tuple` satisfies the atom's repeated variables and every
    /// predicate.
    pub fn passes(&self, tuple: &Tuple) -> EvalResult<bool> {
        let source = slice::from_ref(&self.atom);
        for variable in self.atom.variables() {
            let first = eval::lookup(variable, source, tuple)?;
            if eval::occurrences(variable, source, tuple)
                .into_iter()
                .any(|value| value != first)
            {
                return Ok(false);
            }
        }

        for predicate in &self.predicates {
            if !eval::holds(predicate, tuple, source)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
