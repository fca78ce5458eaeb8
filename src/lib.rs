//! `mmtransform` finds and proves algebraic transformations of expressions over a
//! [Metamath](http://us.metamath.org/mm.html)-style rule library. Every step it produces cites
//! a rule of the library, so the result can be checked like any hand written proof.
//!
//! # Main data structures
//!
//! ## Expressions
//! An [`Expression`] is an AST whose inner nodes are operators and whose leaves are variables
//! or constants, for example _(A + B) = (B + A)_. Children are shared, so expressions are cheap
//! to clone and never change after construction.
//!
//! ## Libraries
//! A [`Library`](library::Library) holds the declared symbols and rules in declaration order.
//! The sequence number of a rule decides whether it may be used in a proof: only rules
//! declared before the theorem being proven are in scope.
//!
//! ## Classifiers
//! The [`info`] module scans the library once and finds the rules that express properties of
//! operators. A rule like _(A + B) = (B + A)_ makes `+` commutative, a rule like
//! _A = B ⇒ (A + C) = (B + C)_ lets the first argument of `+` be replaced by an equal one.
//!
//! ## Transformations
//! For every node of an expression the [`TransformationManager`] picks a
//! [`Transformation`](transformation::Transformation). It computes the canonical form of the
//! node (operands of associative and commutative chains sorted, arguments normalized) and
//! proves the node equal to any expression with the same canonical form.
//!
//! ## Worksheets
//! New steps are written to a [`Worksheet`](worksheet::Worksheet). The engine only asks for
//! steps it can reuse and appends derivation steps, everything else belongs to the caller.
//!
//! ```
//! use mmtransform::serialization::parse_library;
//! use mmtransform::worksheet::ProofWorksheet;
//! use mmtransform::TransformationManager;
//!
//! let library = parse_library(
//!     "typ wff\n\
//!      typ class\n\
//!      var wff ph ps ch\n\
//!      var class A B C\n\
//!      opr wff <-> 2\n\
//!      opr wff = 2\n\
//!      opr class + 2\n\
//!      axm { (ph <-> ps) => (ps <-> ph) }: bicomi\n\
//!      axm { (ph <-> ps), (ps <-> ch) => (ph <-> ch) }: bitri\n\
//!      axm { ph, (ph <-> ps) => ps }: mpbi\n\
//!      axm { (A = B) => (B = A) }: eqcomi\n\
//!      axm { (A = B), (B = C) => (A = C) }: eqtri\n\
//!      axm { (A = B) => ((A = C) <-> (B = C)) }: eqeq1i\n\
//!      axm { (A = B) => ((C = A) <-> (C = B)) }: eqeq2i\n\
//!      axm { (A = B) => ((A + C) = (B + C)) }: addeq1i\n\
//!      axm { (A = B) => ((C + A) = (C + B)) }: addeq2i\n\
//!      axm { ((A + B) = (B + A)) }: addcom\n",
//! )
//! .unwrap();
//! let manager = TransformationManager::new(library.clone());
//!
//! let mut worksheet = ProofWorksheet::new(library.next_seq());
//! let parse = |s: &str| mmtransform::serialization::parse_expression(&library, s).unwrap();
//! worksheet.add_hypothesis(&library, parse("((A + B) = C)"));
//! let goal = worksheet.add_step(&library, parse("((B + A) = C)"));
//!
//! let new_steps = manager
//!     .try_to_find_transformations(&mut worksheet, goal)
//!     .unwrap()
//!     .unwrap();
//! assert!(!new_steps.is_empty());
//! ```

#[cfg(feature = "serialization")]
extern crate nom;
#[cfg(test)]
#[macro_use]
extern crate quickcheck;

pub mod config;
pub mod error;
pub mod expression;
pub mod info;
pub mod library;
pub mod manager;
pub mod pattern;
pub mod rule_map;
#[cfg(feature = "serialization")]
pub mod serialization;
pub mod substitution;
pub mod transformation;
mod types;
pub mod worksheet;

#[cfg(test)]
mod test_util;

pub use config::TransformConfig;
pub use expression::Expression;
pub use manager::TransformationManager;
pub use types::*;
