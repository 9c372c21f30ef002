use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;
use num_bigint::BigInt;

pub type Identifier = String;
pub type RelationName = Identifier;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Variable(pub Identifier);

impl Variable {
    pub fn new(name: impl Into<Identifier>) -> Self {
        Self(name.into())
    }
}

/// A ground value. Constants of different kinds are never equal and have no
/// relative order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Integer(BigInt),
    String(String),
}

impl Constant {
    /// Orders two constants of the same kind; `None` when the kinds differ.
    pub fn try_cmp(&self, other: &Constant) -> Option<Ordering> {
        match (self, other) {
            (Constant::Integer(a), Constant::Integer(b)) => Some(a.cmp(b)),
            (Constant::String(a), Constant::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Variable(Variable),
    Constant(Constant),
}

impl Term {
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(variable) => Some(variable),
            Term::Constant(_) => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }
}

impl From<Variable> for Term {
    fn from(variable: Variable) -> Self {
        Term::Variable(variable)
    }
}

impl From<Constant> for Term {
    fn from(constant: Constant) -> Self {
        Term::Constant(constant)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationalAtom {
    pub name: RelationName,
    pub terms: Vec<Term>,
}

impl RelationalAtom {
    pub fn new(name: impl Into<RelationName>, terms: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            terms,
        }
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.terms.iter().filter_map(Term::as_variable)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.variables().any(|v| v == variable)
    }

    /// Column of the first occurrence of `variable`.
    pub fn position(&self, variable: &Variable) -> Option<usize> {
        self.terms
            .iter()
            .position(|term| term.as_variable() == Some(variable))
    }

    pub fn has_constants(&self) -> bool {
        self.terms.iter().any(Term::is_constant)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComparisonAtom {
    pub lhs: Term,
    pub op: ComparisonOp,
    pub rhs: Term,
}

impl ComparisonAtom {
    pub fn new(lhs: impl Into<Term>, op: ComparisonOp, rhs: impl Into<Term>) -> Self {
        Self {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        }
    }

    /// Variables in term order; a variable compared with itself appears twice.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        [&self.lhs, &self.rhs]
            .into_iter()
            .filter_map(Term::as_variable)
    }

    pub fn is_ground(&self) -> bool {
        self.lhs.is_constant() && self.rhs.is_constant()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Atom {
    Relational(RelationalAtom),
    Comparison(ComparisonAtom),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub head: RelationalAtom,
    pub body: Vec<Atom>,
}

impl Query {
    pub fn relational_atoms(&self) -> impl Iterator<Item = &RelationalAtom> {
        self.body.iter().filter_map(|atom| match atom {
            Atom::Relational(relational) => Some(relational),
            Atom::Comparison(_) => None,
        })
    }

    pub fn comparison_atoms(&self) -> impl Iterator<Item = &ComparisonAtom> {
        self.body.iter().filter_map(|atom| match atom {
            Atom::Relational(_) => None,
            Atom::Comparison(comparison) => Some(comparison),
        })
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Integer(value) => write!(f, "{}", value),
            Constant::String(value) => write!(f, "'{}'", value),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(variable) => fmt::Display::fmt(variable, f),
            Term::Constant(constant) => fmt::Display::fmt(constant, f),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for RelationalAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.terms.iter().join(", "))
    }
}

impl fmt::Display for ComparisonAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Relational(atom) => fmt::Display::fmt(atom, f),
            Atom::Comparison(atom) => fmt::Display::fmt(atom, f),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :- {}", self.head, self.body.iter().join(", "))
    }
}
