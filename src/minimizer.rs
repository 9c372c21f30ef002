//! Conjunctive query minimization.
//!
//! Repeatedly drops a body atom whenever the full body maps homomorphically
//! onto the body without it. Head variables and constants must map to
//! themselves, so the result is equivalent to the input.

use std::collections::HashMap;

use anyhow::{bail, Result};
use tracing::debug;

use crate::ast::{Atom, Query, RelationalAtom, Term, Variable};

type Mapping<'a> = HashMap<&'a Variable, &'a Term>;

/// Computes the core of `query`. Only relational bodies are supported.
pub fn minimize(query: &Query) -> Result<Query> {
    if let Some(comparison) = query.comparison_atoms().next() {
        bail!("Cannot minimize query with comparison atom {}", comparison);
    }

    let mut body: Vec<RelationalAtom> = query.relational_atoms().cloned().collect();
    while let Some(index) = removable_atom(&query.head, &body) {
        debug!(atom = %body[index], "removing redundant atom");
        body.remove(index);
    }

    Ok(Query {
        head: query.head.clone(),
        body: body.into_iter().map(Atom::Relational).collect(),
    })
}

fn removable_atom(head: &RelationalAtom, body: &[RelationalAtom]) -> Option<usize> {
    (0..body.len()).find(|&index| {
        let mut target = body.to_vec();
        target.remove(index);
        homomorphism_exists(head, body, &target)
    })
}

/// Whether some mapping of `source`'s variables sends every atom of
/// `source` into `target`, keeping head variables fixed.
pub fn homomorphism_exists(
    head: &RelationalAtom,
    source: &[RelationalAtom],
    target: &[RelationalAtom],
) -> bool {
    let mut mapping = Mapping::new();
    for term in &head.terms {
        if let Term::Variable(variable) = term {
            mapping.insert(variable, term);
        }
    }
    extend(&mut mapping, source, target)
}

fn extend<'a>(
    mapping: &mut Mapping<'a>,
    source: &'a [RelationalAtom],
    target: &'a [RelationalAtom],
) -> bool {
    let (atom, rest) = match source.split_first() {
        Some(split) => split,
        None => return true,
    };

    for candidate in target {
        if candidate.name != atom.name || candidate.arity() != atom.arity() {
            continue;
        }
        let mut bound = vec![];
        if unify(mapping, atom, candidate, &mut bound) && extend(mapping, rest, target) {
            return true;
        }
        for variable in bound {
            mapping.remove(variable);
        }
    }
    false
}

/// Tries to map `atom` onto `candidate` term by term. Newly bound variables
/// are recorded in `bound` so the caller can undo them.
fn unify<'a>(
    mapping: &mut Mapping<'a>,
    atom: &'a RelationalAtom,
    candidate: &'a RelationalAtom,
    bound: &mut Vec<&'a Variable>,
) -> bool {
    for (from, to) in atom.terms.iter().zip(&candidate.terms) {
        match from {
            Term::Constant(_) => {
                if from != to {
                    return false;
                }
            }
            Term::Variable(variable) => match mapping.get(variable) {
                Some(&image) => {
                    if image != to {
                        return false;
                    }
                }
                None => {
                    mapping.insert(variable, to);
                    bound.push(variable);
                }
            },
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_query;

    fn minimized(code: &str) -> String {
        minimize(&parse_query(code).unwrap()).unwrap().to_string()
    }

    #[test]
    fn test_removes_atoms_subsumed_by_constants() {
        assert_eq!(
            minimized(
                "STUDENTNAME(name) :- STUDENT(sid, name, 'INF'), ENROLLMENT(sid, cid), \
                 GRADE(cid, uid, semester, mark), ENROLLMENT(sid, 'ADBS'), \
                 GRADE('ADBS', x, 'MMXXII', g)"
            ),
            "STUDENTNAME(name) :- STUDENT(sid, name, 'INF'), ENROLLMENT(sid, 'ADBS'), \
             GRADE('ADBS', x, 'MMXXII', g)"
        );
    }

    #[test]
    fn test_collapses_onto_head_variable() {
        assert_eq!(
            minimized("Q(x) :- R(w, 5, v), R(w, 5, z), R(x, 5, u)"),
            "Q(x) :- R(x, 5, u)"
        );
    }

    #[test]
    fn test_removes_exact_duplicates() {
        assert_eq!(minimized("Q(x) :- R(x, y), R(x, y), S(y)"), "Q(x) :- R(x, y), S(y)");
    }

    #[test]
    fn test_core_is_unchanged() {
        let code = "Q(x, y) :- R(x, z), R(z, y)";
        assert_eq!(minimized(code), code);
    }

    #[test]
    fn test_constants_map_to_themselves() {
        let code = "Q() :- R(1), R(2)";
        assert_eq!(minimized(code), code);
    }

    #[test]
    fn test_rejects_comparisons() {
        let query = parse_query("Q(x) :- R(x, y), y < 3").unwrap();
        assert!(minimize(&query).is_err());
    }

    #[test]
    fn test_homomorphism_respects_head() {
        let query = parse_query("Q(x, y) :- R(x), R(y)").unwrap();
        let atoms: Vec<RelationalAtom> = query.relational_atoms().cloned().collect();
        assert!(!homomorphism_exists(&query.head, &atoms, &atoms[..1]));
    }
}
