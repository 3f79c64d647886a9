//! Filter predicates for scoped extraction
//!
//! # Overview
//!
//! - `Predicate` - filter tree over record attributes
//! - `parse_predicate` - SQL-style parser (`region in ('ca','gb','us')`)
//! - `split_predicates` - separates conjuncts that can prune partition
//!   directories from those evaluated per record

mod parser;
mod types;

pub use parser::parse_predicate;
pub use types::{split_predicates, CompareOp, Literal, Predicate, SplitPredicates};
