//! The parts of the front end the backend consumes: the annotated tree and
//! the symbol interner shared by every stage.

pub mod ast;
pub mod intern;
