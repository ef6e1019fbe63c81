//! Shared program-representation models
//!
//! Program → classes → methods → bodies → instructions. Everything here is
//! plain data about the program under instrumentation; passes mutate it
//! through explicit handles.

pub mod body;
pub mod class;
pub mod instruction;
pub mod program;
pub mod ty;
pub mod value;

pub use body::{Body, LocalDecl};
pub use class::{Class, FieldDecl, Method};
pub use instruction::{
    IdentityRef, Instruction, InstructionId, InvokeExpr, InvokeKind, MethodRef, Rvalue,
};
pub use program::Program;
pub use ty::Type;
pub use value::{LocalId, Value};
