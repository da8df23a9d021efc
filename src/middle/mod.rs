//! Types are resolved upstream and handed to us on the annotated tree. Here
//! the tree is lowered and flattened into LIR: control structures become
//! labelled blocks and jumps, expression trees become ordered register
//! operations.

pub mod lir;
pub mod lowering;
pub mod primitive;
pub mod ty;
