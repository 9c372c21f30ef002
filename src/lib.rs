pub mod ast;
pub mod catalog;
pub mod error;
pub mod eval;
pub mod minimizer;
pub mod operator;
pub mod parser;
pub mod planner;
pub mod tuple;


pub use catalog::Catalog;
pub use error::{Error, EvalResult};
pub use minimizer::minimize;
pub use operator::Operator;
pub use parser::{parse_query, parse_query_file};
pub use planner::QueryPlanner;
pub use tuple::Tuple;
