use std::collections::HashSet;

use itertools::Itertools;

use crate::ast::{RelationalAtom, Term};
use crate::error::{Error, EvalResult};
use crate::eval;
use crate::tuple::Tuple;

use super::Operator;

/// Maps child tuples onto the head's terms and drops repeated outputs.
///
/// This is the only operator with set semantics; everything below it passes
/// duplicate rows through.
pub struct Project {
    child: Box<Operator>,
    outputs: Vec<Term>,
    atoms: Vec<RelationalAtom>,
    emitted: HashSet<Tuple>,
}

impl Project {
    /// `atoms` describe the child's tuples: a single atom for a leaf, or the
    /// full left-to-right atom list of a join chain.
    pub fn new(child: Operator, outputs: Vec<Term>, atoms: Vec<RelationalAtom>) -> EvalResult<Self> {
        for variable in outputs.iter().filter_map(Term::as_variable) {
            if !atoms.iter().any(|atom| atom.contains(variable)) {
                return Err(Error::UnboundVariable {
                    variable: variable.clone(),
                    atoms: atoms.iter().join(", "),
                });
            }
        }

        Ok(Self {
            child: Box::new(child),
            outputs,
            atoms,
            emitted: HashSet::new(),
        })
    }

    pub fn outputs(&self) -> &[Term] {
        &self.outputs
    }

    pub(super) fn child(&self) -> &Operator {
        &self.child
    }

    pub(super) fn next(&mut self) -> EvalResult<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            let projected = self.project(&tuple)?;
            if !self.emitted.contains(&projected) {
                self.emitted.insert(projected.clone());
                return Ok(Some(projected));
            }
        }
        Ok(None)
    }

    /// Rewinds the child and forgets what has been emitted, so a rerun yields
    /// the same output again.
    pub(super) fn reset(&mut self) -> EvalResult<()> {
        self.emitted.clear();
        self.child.reset()
    }

    fn project(&self, tuple: &Tuple) -> EvalResult<Tuple> {
        self.outputs
            .iter()
            .map(|term| eval::resolve(term, &self.atoms, tuple))
            .collect::<EvalResult<Vec<_>>>()
            .map(Tuple::new)
    }
}
