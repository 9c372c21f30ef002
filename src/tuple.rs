use std::fmt;

use itertools::Itertools;

use crate::ast::Constant;

/// A row of constants, positionally aligned with the relational atom (or the
/// concatenation of atoms) it was produced for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tuple(Vec<Constant>);

impl Tuple {
    pub fn new(fields: Vec<Constant>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[Constant] {
        &self.0
    }

    pub fn into_fields(self) -> Vec<Constant> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Constant> {
        self.0.get(index)
    }

    /// `self`'s fields followed by `other`'s.
    pub fn concat(&self, other: &Tuple) -> Tuple {
        Tuple(self.0.iter().chain(&other.0).cloned().collect())
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(", "))
    }
}
