//! Engine error types.
//!
//! Every variant is fatal to the evaluation that raised it: operators never
//! retry, they propagate the error up to whoever is driving the root.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ast::{ComparisonAtom, Constant, RelationName, RelationalAtom, Variable};
use crate::catalog::ColumnKind;

/// Result type for planning and evaluation.
pub type EvalResult<T> = Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A data row has a different number of columns than its schema.
    #[error("row {line} of {relation} has {found} columns, schema declares {expected}")]
    SchemaMismatch {
        relation: RelationName,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A column's text cannot be read as its declared kind.
    #[error("cannot parse {text:?} as {kind} (row {line}, column {column} of {relation})")]
    MalformedValue {
        relation: RelationName,
        line: usize,
        column: usize,
        kind: ColumnKind,
        text: String,
    },

    /// An ordering comparison between constants of different kinds.
    #[error("cannot order {lhs} against {rhs}: incompatible constant kinds")]
    IncompatibleTypes { lhs: Constant, rhs: Constant },

    /// A variable has no column in the atoms it is looked up against.
    #[error("variable {variable} does not occur in {atoms}")]
    UnboundVariable { variable: Variable, atoms: String },

    /// A comparison was evaluated before all of its variables were substituted.
    #[error("comparison {atom} is not ground")]
    NotGround { atom: ComparisonAtom },

    /// The two sides of a join bound one variable to different values.
    #[error("variable {variable} bound to {left} on the left of a join and {right} on the right")]
    InvariantViolation {
        variable: Variable,
        left: Constant,
        right: Constant,
    },

    /// A tuple, atom or schema disagree on the number of columns.
    #[error("{context}: expected {expected} columns, found {found}")]
    ArityMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// A relational atom reached an operator that requires variables only.
    #[error("relational atom {atom} still carries an embedded constant")]
    EmbeddedConstant { atom: RelationalAtom },

    #[error("unknown relation {name}")]
    UnknownRelation { name: RelationName },

    #[error("query body has no relational atoms")]
    NoRelationalAtoms,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The result writer failed.
    #[error("failed to write results: {0}")]
    Output(#[from] io::Error),
}
