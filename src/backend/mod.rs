//! Consumers of finished LIR modules. Generated programs are run by the
//! evaluator in [`eval`].

pub mod eval;
