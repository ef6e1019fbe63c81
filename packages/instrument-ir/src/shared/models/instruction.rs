//! Instructions of the three-address method-body representation
//!
//! Bodies are ordered instruction lists. Every instruction gets a stable id
//! when appended or spliced into a body; ids serve as insertion anchors and
//! branch targets and survive later splices.

use serde::{Deserialize, Serialize};

use super::ty::Type;
use super::value::{LocalId, Value};

/// Stable instruction id within one body, used as anchor and branch target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstructionId(pub u32);

/// Reference to a method or constructor of the modeled program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    /// Declaring class, fully qualified
    pub class: String,
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub is_static: bool,
}

impl MethodRef {
    /// Fully qualified signature: `com.example.Foo.bar(int,java.lang.String)`
    pub fn signature(&self) -> String {
        format!("{}.{}({})", self.class, self.name, self.signature_params())
    }

    /// Overload key used by directive tables: `bar(int,java.lang.String)`;
    /// zero parameters still form `bar()`
    pub fn signature_key(&self) -> String {
        format!("{}({})", self.name, self.signature_params())
    }

    fn signature_params(&self) -> String {
        self.params
            .iter()
            .map(Type::name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Invocation dispatch kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeKind {
    Static,
    Virtual,
    /// Constructor and super-call dispatch
    Special,
}

/// A call expression: callee plus actual receiver/arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    pub callee: MethodRef,
    /// Present iff the dispatch is not static
    pub receiver: Option<Value>,
    pub args: Vec<Value>,
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rvalue {
    Use(Value),
    Invoke(InvokeExpr),
    /// Object allocation; the constructor call follows as a separate
    /// special invocation
    New(String),
    NewArray {
        element: Type,
        length: usize,
    },
    Cast {
        target: Type,
        value: Value,
    },
    /// Instance field load
    Field {
        receiver: Value,
        class: String,
        field: String,
    },
}

/// Source of an identity (setup) instruction at body entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentityRef {
    This,
    Parameter(usize),
}

/// One instruction of a method body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Parameter/self binding pseudo-instruction; only valid as body setup
    Identity { local: LocalId, source: IdentityRef },
    Assign { target: LocalId, rvalue: Rvalue },
    /// Constant-index store into an array local
    ArrayStore {
        array: LocalId,
        index: usize,
        value: Value,
    },
    /// Instance field store
    FieldStore {
        receiver: Value,
        class: String,
        field: String,
        value: Value,
    },
    /// Bare invocation, result (if any) discarded
    Invoke(InvokeExpr),
    Goto { target: InstructionId },
    IfGoto { condition: Value, target: InstructionId },
    Return(Option<Value>),
}

impl Instruction {
    /// Setup instructions precede the first "real" instruction of a body
    pub fn is_setup(&self) -> bool {
        matches!(self, Instruction::Identity { .. })
    }
}
