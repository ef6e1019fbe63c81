//! Instruction inspection helpers
//!
//! Classify an instruction as assignment or invocation and pull out the
//! operands call-site passes bind against.

use crate::shared::models::{Instruction, InvokeExpr, LocalId, MethodRef, Rvalue, Value};

pub fn as_assignment(instruction: &Instruction) -> Option<(LocalId, &Rvalue)> {
    match instruction {
        Instruction::Assign { target, rvalue } => Some((*target, rvalue)),
        _ => None,
    }
}

pub fn assignment_target(instruction: &Instruction) -> Option<LocalId> {
    as_assignment(instruction).map(|(target, _)| target)
}

/// The call expression of an invocation statement or of an assignment whose
/// source is a call.
pub fn invocation(instruction: &Instruction) -> Option<&InvokeExpr> {
    match instruction {
        Instruction::Invoke(invoke) => Some(invoke),
        Instruction::Assign {
            rvalue: Rvalue::Invoke(invoke),
            ..
        } => Some(invoke),
        _ => None,
    }
}

pub fn invocation_callee(instruction: &Instruction) -> Option<&MethodRef> {
    invocation(instruction).map(|invoke| &invoke.callee)
}

pub fn invocation_receiver(instruction: &Instruction) -> Option<&Value> {
    invocation(instruction).and_then(|invoke| invoke.receiver.as_ref())
}

pub fn invocation_args(instruction: &Instruction) -> Option<&[Value]> {
    invocation(instruction).map(|invoke| invoke.args.as_slice())
}
