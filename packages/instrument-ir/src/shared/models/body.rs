//! Method bodies
//!
//! A body owns an ordered instruction list, a local-variable slot table,
//! parameter locals and (for instance methods) a self-reference local.
//! Instructions carry stable ids used as insertion anchors and branch
//! targets; splicing never invalidates ids of surviving instructions.

use serde::{Deserialize, Serialize};

use crate::errors::{InstrumentError, Result};

use super::instruction::{
    IdentityRef, Instruction, InstructionId, InvokeExpr, InvokeKind, MethodRef, Rvalue,
};
use super::program::Program;
use super::ty::Type;
use super::value::{LocalId, Value};

/// Declared local-variable slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub id: LocalId,
    pub name: String,
    pub ty: Type,
}

/// Ordered instruction list plus slot tables of one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// The method this body belongs to
    pub method: MethodRef,
    locals: Vec<LocalDecl>,
    param_locals: Vec<LocalId>,
    this_local: Option<LocalId>,
    instructions: Vec<(InstructionId, Instruction)>,
    next_local: u32,
    next_instruction: u32,
}

impl Body {
    /// Empty body with no locals; callers declare parameter and self locals
    /// themselves.
    pub fn new(method: MethodRef) -> Self {
        Body {
            method,
            locals: Vec::new(),
            param_locals: Vec::new(),
            this_local: None,
            instructions: Vec::new(),
            next_local: 0,
            next_instruction: 0,
        }
    }

    /// Body with self/parameter locals declared and bound by identity
    /// instructions, the shape the external decoder produces.
    pub fn for_method(method: MethodRef) -> Self {
        let mut body = Body::new(method.clone());
        if !method.is_static {
            let this = body.fresh_local(Type::object(method.class.clone()));
            body.this_local = Some(this);
            body.push(Instruction::Identity {
                local: this,
                source: IdentityRef::This,
            });
        }
        for (index, ty) in method.params.iter().enumerate() {
            let param = body.fresh_local(ty.clone());
            body.param_locals.push(param);
            body.push(Instruction::Identity {
                local: param,
                source: IdentityRef::Parameter(index),
            });
        }
        body
    }

    /// Allocate a fresh slot; never aliases an existing one.
    pub fn fresh_local(&mut self, ty: Type) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        let prefix = match &ty {
            Type::Long => "$l",
            Type::Float | Type::Double => "$d",
            t if t.is_primitive() => "$i",
            _ => "$r",
        };
        self.locals.push(LocalDecl {
            id,
            name: format!("{}{}", prefix, id.0),
            ty,
        });
        id
    }

    pub fn locals(&self) -> &[LocalDecl] {
        &self.locals
    }

    pub fn param_locals(&self) -> &[LocalId] {
        &self.param_locals
    }

    /// Self-reference local of an instance method
    pub fn this_local(&self) -> Option<LocalId> {
        self.this_local
    }

    pub fn local_type(&self, id: LocalId) -> Option<&Type> {
        self.locals.iter().find(|decl| decl.id == id).map(|decl| &decl.ty)
    }

    /// Declared type of any value in this body's scope
    pub fn type_of(&self, value: &Value) -> Result<Type> {
        match value {
            Value::Local(id) => self.local_type(*id).cloned().ok_or_else(|| {
                InstrumentError::structural(format!(
                    "undeclared local {:?} in {}",
                    id,
                    self.method.signature()
                ))
            }),
            other => Ok(other.constant_type().expect("constant has intrinsic type")),
        }
    }

    /// Append one instruction, returning its id.
    pub fn push(&mut self, instruction: Instruction) -> InstructionId {
        let id = InstructionId(self.next_instruction);
        self.next_instruction += 1;
        self.instructions.push((id, instruction));
        id
    }

    pub fn instructions(&self) -> impl Iterator<Item = (InstructionId, &Instruction)> {
        self.instructions.iter().map(|(id, instr)| (*id, instr))
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn get(&self, id: InstructionId) -> Option<&Instruction> {
        self.instructions
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, instr)| instr)
    }

    pub fn position_of(&self, id: InstructionId) -> Option<usize> {
        self.instructions.iter().position(|(existing, _)| *existing == id)
    }

    /// First instruction past the identity prologue, the anchor for
    /// method-entry instrumentation.
    pub fn first_non_setup(&self) -> Option<InstructionId> {
        self.instructions
            .iter()
            .find(|(_, instr)| !instr.is_setup())
            .map(|(id, _)| *id)
    }

    /// Splice new instructions immediately before `anchor`.
    pub fn splice_before(
        &mut self,
        anchor: InstructionId,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<InstructionId>> {
        let position = self.position_of(anchor).ok_or_else(|| {
            InstrumentError::structural(format!(
                "unknown anchor {:?} in {}",
                anchor,
                self.method.signature()
            ))
        })?;
        Ok(self.splice_at(position, instructions))
    }

    /// Splice new instructions immediately after `anchor`.
    pub fn splice_after(
        &mut self,
        anchor: InstructionId,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<InstructionId>> {
        let position = self.position_of(anchor).ok_or_else(|| {
            InstrumentError::structural(format!(
                "unknown anchor {:?} in {}",
                anchor,
                self.method.signature()
            ))
        })?;
        Ok(self.splice_at(position + 1, instructions))
    }

    fn splice_at(&mut self, position: usize, instructions: Vec<Instruction>) -> Vec<InstructionId> {
        let mut ids = Vec::with_capacity(instructions.len());
        for (offset, instruction) in instructions.into_iter().enumerate() {
            let id = InstructionId(self.next_instruction);
            self.next_instruction += 1;
            self.instructions.insert(position + offset, (id, instruction));
            ids.push(id);
        }
        ids
    }

    /// Remove every instruction the predicate selects, returning how many
    /// were removed.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&Instruction) -> bool) -> usize {
        let before = self.instructions.len();
        self.instructions.retain(|(_, instr)| !predicate(instr));
        before - self.instructions.len()
    }

    pub fn remove(&mut self, id: InstructionId) -> bool {
        let before = self.instructions.len();
        self.instructions.retain(|(existing, _)| *existing != id);
        before != self.instructions.len()
    }

    pub fn replace(&mut self, id: InstructionId, instruction: Instruction) -> Result<()> {
        let position = self.position_of(id).ok_or_else(|| {
            InstrumentError::structural(format!("unknown instruction {:?}", id))
        })?;
        self.instructions[position].1 = instruction;
        Ok(())
    }

    /// Structural well-formedness: every referenced local declared and
    /// defined before use, every branch target resolvable, invocation arity
    /// and assignment types consistent. The program handle supplies the
    /// hierarchy for reference-type assignability.
    pub fn validate(&self, program: &Program) -> Result<()> {
        let known: Vec<InstructionId> = self.instructions.iter().map(|(id, _)| *id).collect();
        let mut defined: Vec<bool> = vec![false; self.next_local as usize];

        for (_, instruction) in &self.instructions {
            match instruction {
                Instruction::Identity { local, .. } => {
                    self.check_declared(*local)?;
                    defined[local.0 as usize] = true;
                }
                Instruction::Assign { target, rvalue } => {
                    self.check_declared(*target)?;
                    self.check_rvalue(program, rvalue, &defined)?;
                    self.check_assignment_type(program, *target, rvalue)?;
                    defined[target.0 as usize] = true;
                }
                Instruction::ArrayStore { array, index: _, value } => {
                    self.check_use(Value::Local(*array), &defined)?;
                    self.check_use(value.clone(), &defined)?;
                    let array_ty = self.type_of(&Value::Local(*array))?;
                    let Type::Array(element) = array_ty else {
                        return Err(InstrumentError::structural(format!(
                            "array store into non-array local in {}",
                            self.method.signature()
                        )));
                    };
                    let value_ty = self.type_of(value)?;
                    if !assignable(program, &element, &value_ty) {
                        return Err(InstrumentError::structural(format!(
                            "array store of {} into {}[] in {}",
                            value_ty,
                            element,
                            self.method.signature()
                        )));
                    }
                }
                Instruction::FieldStore { receiver, value, .. } => {
                    self.check_use(receiver.clone(), &defined)?;
                    self.check_use(value.clone(), &defined)?;
                }
                Instruction::Invoke(invoke) => self.check_invoke(program, invoke, &defined)?,
                Instruction::Goto { target } => {
                    if !known.contains(target) {
                        return Err(InstrumentError::structural(format!(
                            "unresolvable branch target {:?} in {}",
                            target,
                            self.method.signature()
                        )));
                    }
                }
                Instruction::IfGoto { condition, target } => {
                    self.check_use(condition.clone(), &defined)?;
                    if !known.contains(target) {
                        return Err(InstrumentError::structural(format!(
                            "unresolvable branch target {:?} in {}",
                            target,
                            self.method.signature()
                        )));
                    }
                }
                Instruction::Return(value) => {
                    if let Some(value) = value {
                        self.check_use(value.clone(), &defined)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn check_declared(&self, id: LocalId) -> Result<()> {
        if self.local_type(id).is_none() {
            return Err(InstrumentError::structural(format!(
                "undeclared local {:?} in {}",
                id,
                self.method.signature()
            )));
        }
        Ok(())
    }

    fn check_use(&self, value: Value, defined: &[bool]) -> Result<()> {
        if let Value::Local(id) = value {
            self.check_declared(id)?;
            if !defined.get(id.0 as usize).copied().unwrap_or(false) {
                return Err(InstrumentError::structural(format!(
                    "local {:?} used before definition in {}",
                    id,
                    self.method.signature()
                )));
            }
        }
        Ok(())
    }

    fn check_rvalue(&self, program: &Program, rvalue: &Rvalue, defined: &[bool]) -> Result<()> {
        match rvalue {
            Rvalue::Use(value) => self.check_use(value.clone(), defined),
            Rvalue::Invoke(invoke) => self.check_invoke(program, invoke, defined),
            Rvalue::New(_) | Rvalue::NewArray { .. } => Ok(()),
            Rvalue::Cast { value, .. } => self.check_use(value.clone(), defined),
            Rvalue::Field { receiver, .. } => self.check_use(receiver.clone(), defined),
        }
    }

    fn check_invoke(&self, program: &Program, invoke: &InvokeExpr, defined: &[bool]) -> Result<()> {
        if invoke.args.len() != invoke.callee.params.len() {
            return Err(InstrumentError::structural(format!(
                "call to {} with {} arguments in {}",
                invoke.callee.signature(),
                invoke.args.len(),
                self.method.signature()
            )));
        }
        match (&invoke.kind, &invoke.receiver) {
            (InvokeKind::Static, Some(_)) => {
                return Err(InstrumentError::structural(format!(
                    "static call to {} with a receiver",
                    invoke.callee.signature()
                )));
            }
            (InvokeKind::Static, None) => {}
            (_, None) => {
                return Err(InstrumentError::structural(format!(
                    "instance call to {} without a receiver",
                    invoke.callee.signature()
                )));
            }
            (_, Some(receiver)) => self.check_use(receiver.clone(), defined)?,
        }
        for (argument, param) in invoke.args.iter().zip(&invoke.callee.params) {
            self.check_use(argument.clone(), defined)?;
            let argument_ty = self.type_of(argument)?;
            if !assignable(program, param, &argument_ty) {
                return Err(InstrumentError::structural(format!(
                    "argument of type {} passed where {} expected by {}",
                    argument_ty,
                    param,
                    invoke.callee.signature()
                )));
            }
        }
        Ok(())
    }

    fn check_assignment_type(&self, program: &Program, target: LocalId, rvalue: &Rvalue) -> Result<()> {
        let target_ty = self
            .local_type(target)
            .cloned()
            .expect("target declared before type check");
        let value_ty = match rvalue {
            Rvalue::Use(value) => self.type_of(value)?,
            Rvalue::Invoke(invoke) => {
                if invoke.callee.ret == Type::Void {
                    return Err(InstrumentError::structural(format!(
                        "void call to {} used as assignment source",
                        invoke.callee.signature()
                    )));
                }
                invoke.callee.ret.clone()
            }
            Rvalue::New(class) => Type::object(class.clone()),
            Rvalue::NewArray { element, .. } => Type::array(element.clone()),
            Rvalue::Cast { target, .. } => target.clone(),
            // Field types live in the class table; structural validation
            // stays body-local.
            Rvalue::Field { .. } => return Ok(()),
        };
        if !assignable(program, &target_ty, &value_ty) {
            return Err(InstrumentError::structural(format!(
                "assignment of {} into {} local in {}",
                value_ty,
                target_ty,
                self.method.signature()
            )));
        }
        Ok(())
    }
}

/// `Type::accepts` plus superclass-chain widening for reference types.
fn assignable(program: &Program, expected: &Type, value: &Type) -> bool {
    if expected.accepts(value) {
        return true;
    }
    if let (Type::Object(expected), Type::Object(value)) = (expected, value) {
        return program.ancestors(value).contains(&expected.as_str());
    }
    false
}
