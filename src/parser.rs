use std::borrow::BorrowMut;
use std::path::Path;

use anyhow::{Context, Result};
use num_bigint::BigInt;
use pest::Parser as _;
use pest_derive::Parser;

use crate::ast::{
    Atom, ComparisonAtom, ComparisonOp, Constant, Identifier, Query, RelationalAtom, Term,
    Variable,
};

#[derive(Parser)]
#[grammar = "minibase.pest"]
struct Parser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;
type Pairs<'a> = pest::iterators::Pairs<'a, Rule>;

/// Parses a single conjunctive query, e.g. `Q(x) :- R(x, y), y > 3`.
pub fn parse_query(code: &str) -> Result<Query> {
    let query = Parser::parse(Rule::query, code)
        .context("Failed to parse query")?
        .next()
        .context("Empty parse tree")?;

    let mut pairs = query.into_inner();
    let head = RelationalAtom::from(expect_next_rule(&mut pairs, Rule::relational_atom));
    let body = expect_next_rule(&mut pairs, Rule::body)
        .into_inner()
        .map(Atom::from)
        .collect();

    Ok(Query { head, body })
}

pub fn parse_query_file(path: impl AsRef<Path>) -> Result<Query> {
    let path = path.as_ref();
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read query file {}", path.display()))?;
    parse_query(&code).with_context(|| format!("Invalid query in {}", path.display()))
}

fn expect_next_rule<'a, P: BorrowMut<Pairs<'a>>>(mut pairs: P, rule: Rule) -> Pair<'a> {
    let pair = pairs.borrow_mut().next().expect("missing pair");
    assert_eq!(pair.as_rule(), rule);
    pair
}

fn convert_identifier(pair: Pair) -> Identifier {
    assert_eq!(pair.as_rule(), Rule::identifier);
    pair.as_str().to_string()
}

impl From<Pair<'_>> for Atom {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::atom);
        let pair = pair.into_inner().next().expect("missing atom");

        match pair.as_rule() {
            Rule::relational_atom => Atom::Relational(RelationalAtom::from(pair)),

            Rule::comparison_atom => Atom::Comparison(ComparisonAtom::from(pair)),

            _ => unreachable!(),
        }
    }
}

impl From<Pair<'_>> for RelationalAtom {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::relational_atom);
        let mut pairs = pair.into_inner();
        let name = convert_identifier(expect_next_rule(&mut pairs, Rule::identifier));
        let terms = pairs.map(Term::from).collect();

        Self { name, terms }
    }
}

impl From<Pair<'_>> for ComparisonAtom {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::comparison_atom);
        let mut pairs = pair.into_inner();
        let lhs = Term::from(expect_next_rule(&mut pairs, Rule::term));
        let op = ComparisonOp::from(expect_next_rule(&mut pairs, Rule::comparison_op));
        let rhs = Term::from(expect_next_rule(&mut pairs, Rule::term));

        Self { lhs, op, rhs }
    }
}

impl From<Pair<'_>> for ComparisonOp {
    fn from(pair: Pair<'_>) -> Self {
        match pair.as_str() {
            "=" => ComparisonOp::Eq,
            "!=" => ComparisonOp::Ne,
            "<" => ComparisonOp::Lt,
            "<=" => ComparisonOp::Le,
            ">" => ComparisonOp::Gt,
            ">=" => ComparisonOp::Ge,
            _ => unreachable!(),
        }
    }
}

impl From<Pair<'_>> for Term {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::term);
        let pair = pair.into_inner().next().expect("missing term");

        match pair.as_rule() {
            Rule::variable => Term::Variable(Variable::new(pair.as_str())),

            Rule::integer => {
                let value: BigInt = pair.as_str().parse().expect("invalid integer literal");
                Term::Constant(Constant::Integer(value))
            }

            Rule::string => {
                let interior = expect_next_rule(pair.into_inner(), Rule::string_interior);
                Term::Constant(Constant::String(interior.as_str().to_string()))
            }

            _ => unreachable!(),
        }
    }
}
