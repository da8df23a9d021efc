//! Code generation backend of the Mythril language.
//!
//! An annotated program ([`frontend::ast::Program`]) is lowered by
//! [`lower_program`] into an LIR [`middle::lir::Module`]: the runtime array
//! library, one function per user function and the implicit entry function
//! holding the top level statements. Modules can be dumped with
//! [`middle::lir::pretty_print`] and executed with [`backend::eval`].

pub mod backend;
pub mod diagnostics;
pub mod frontend;
pub mod index;
pub mod middle;
pub mod samples;

pub use diagnostics::{CodegenError, CodegenErrorKind};
pub use middle::lowering::{CodegenOptions, lower_program};
