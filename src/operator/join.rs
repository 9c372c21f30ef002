use std::mem;

use crate::ast::{ComparisonAtom, RelationalAtom};
use crate::error::{Error, EvalResult};
use crate::eval;
use crate::tuple::Tuple;

use super::Operator;

/// Where a join resumes on the next call.
#[derive(Debug)]
enum Cursor {
    /// Pull a new outer tuple, then rescan the inner side.
    NeedOuter,
    /// Keep scanning the inner side against this outer tuple.
    ScanningInner(Tuple),
}

/// Tuple nested-loop join of a left subtree with a single right leaf.
///
/// Variables shared between the two sides must agree; the assigned conditions
/// must also hold. Output tuples are the left fields followed by the right
/// fields, in outer-major, inner-minor order.
pub struct Join {
    left: Box<Operator>,
    right: Box<Operator>,
    left_atoms: Vec<RelationalAtom>,
    right_atom: RelationalAtom,
    conditions: Vec<ComparisonAtom>,
    cursor: Cursor,
}

impl Join {
    pub fn new(
        left: Operator,
        right: Operator,
        left_atoms: Vec<RelationalAtom>,
        right_atom: RelationalAtom,
        conditions: Vec<ComparisonAtom>,
    ) -> EvalResult<Self> {
        if let Some(atom) = left_atoms
            .iter()
            .chain(Some(&right_atom))
            .find(|atom| atom.has_constants())
        {
            return Err(Error::EmbeddedConstant { atom: atom.clone() });
        }

        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
            left_atoms,
            right_atom,
            conditions,
            cursor: Cursor::NeedOuter,
        })
    }

    pub fn right_atom(&self) -> &RelationalAtom {
        &self.right_atom
    }

    pub fn conditions(&self) -> &[ComparisonAtom] {
        &self.conditions
    }

    pub(super) fn left(&self) -> &Operator {
        &self.left
    }

    pub(super) fn right(&self) -> &Operator {
        &self.right
    }

    pub(super) fn next(&mut self) -> EvalResult<Option<Tuple>> {
        loop {
            let outer = match mem::replace(&mut self.cursor, Cursor::NeedOuter) {
                Cursor::ScanningInner(outer) => outer,
                Cursor::NeedOuter => match self.left.next()? {
                    Some(outer) => {
                        self.right.reset()?;
                        outer
                    }
                    None => return Ok(None),
                },
            };

            while let Some(inner) = self.right.next()? {
                if self.matches(&outer, &inner)? {
                    let joined = outer.concat(&inner);
                    self.cursor = Cursor::ScanningInner(outer);
                    return Ok(Some(joined));
                }
            }
        }
    }

    pub(super) fn reset(&mut self) -> EvalResult<()> {
        self.left.reset()?;
        self.right.reset()?;
        self.cursor = Cursor::NeedOuter;
        Ok(())
    }

    /// Whether `outer` and `inner` join under shared variables and the
    /// assigned conditions.
    pub fn matches(&self, outer: &Tuple, inner: &Tuple) -> EvalResult<bool> {
        if !eval::same_variable_consistent(&self.left_atoms, outer, &self.right_atom, inner)? {
            return Ok(false);
        }

        for condition in &self.conditions {
            let ground = eval::substitute_across(
                condition,
                &self.left_atoms,
                outer,
                &self.right_atom,
                inner,
            )?;
            if !eval::evaluate(&ground)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
