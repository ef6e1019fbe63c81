//! Append-only instruction construction with one-shot insertion
//!
//! An `InstructionSeq` accumulates new instructions against one method body,
//! allocating fresh locals as it goes. Exactly one of `insert_before` /
//! `insert_after` consumes the sequence, splices it at the anchor and
//! re-validates the body; a second insertion is unrepresentable because both
//! take the sequence by value. A validation failure after splicing is a
//! structural fault signaling a bug in the instrumentation logic itself.

use crate::errors::{InstrumentError, Result};
use crate::shared::models::{
    Body, Instruction, InstructionId, InvokeExpr, InvokeKind, LocalId, Program, Rvalue, Type,
    Value,
};

/// Builder of new instructions scoped to one body visit
pub struct InstructionSeq<'a> {
    program: &'a Program,
    body: &'a mut Body,
    pending: Vec<Instruction>,
}

impl<'a> InstructionSeq<'a> {
    pub fn new(program: &'a Program, body: &'a mut Body) -> Self {
        InstructionSeq {
            program,
            body,
            pending: Vec::new(),
        }
    }

    /// Allocate a fresh local slot; never aliases an existing one.
    pub fn fresh_local(&mut self, ty: Type) -> LocalId {
        self.body.fresh_local(ty)
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.pending.push(instruction);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Overwrite an existing local, used to redirect a call result through a
    /// decorator.
    pub fn assign(&mut self, target: LocalId, value: Value) {
        self.pending.push(Instruction::Assign {
            target,
            rvalue: Rvalue::Use(value),
        });
    }

    fn value_type(&self, value: &Value) -> Result<Type> {
        self.body.type_of(value)
    }

    fn argument_types(&self, args: &[Value]) -> Result<Vec<Type>> {
        args.iter().map(|arg| self.value_type(arg)).collect()
    }

    /// Allocate and construct an object, resolving the constructor overload
    /// by argument types. Returns the local holding the instance.
    pub fn new_object(&mut self, class: &str, args: Vec<Value>) -> Result<LocalId> {
        let constructor = self
            .program
            .resolve_constructor(class, &self.argument_types(&args)?)?;
        let object = self.fresh_local(Type::object(class));
        self.pending.push(Instruction::Assign {
            target: object,
            rvalue: Rvalue::New(class.to_string()),
        });
        self.pending.push(Instruction::Invoke(InvokeExpr {
            kind: InvokeKind::Special,
            callee: constructor,
            receiver: Some(Value::Local(object)),
            args,
        }));
        Ok(object)
    }

    /// Emit a call resolved by declaring type, name and argument types.
    /// Static dispatch when no receiver is given. Returns a local holding
    /// the result iff the callee is non-void.
    pub fn call(
        &mut self,
        receiver: Option<Value>,
        class: &str,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Option<LocalId>> {
        let callee = self
            .program
            .resolve_method(class, name, &self.argument_types(&args)?)?;
        if callee.is_static != receiver.is_none() {
            return Err(InstrumentError::lookup(format!(
                "dispatch mismatch calling {}",
                callee.signature()
            )));
        }
        let kind = if callee.is_static {
            InvokeKind::Static
        } else if name == "<init>" {
            InvokeKind::Special
        } else {
            InvokeKind::Virtual
        };
        let ret = callee.ret.clone();
        let invoke = InvokeExpr {
            kind,
            callee,
            receiver,
            args,
        };
        if ret == Type::Void {
            self.pending.push(Instruction::Invoke(invoke));
            return Ok(None);
        }
        let result = self.fresh_local(ret);
        self.pending.push(Instruction::Assign {
            target: result,
            rvalue: Rvalue::Invoke(invoke),
        });
        Ok(Some(result))
    }

    /// Same as `call`, but the result (if any) is discarded.
    pub fn call_discard(
        &mut self,
        receiver: Option<Value>,
        class: &str,
        name: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let callee = self
            .program
            .resolve_method(class, name, &self.argument_types(&args)?)?;
        if callee.is_static != receiver.is_none() {
            return Err(InstrumentError::lookup(format!(
                "dispatch mismatch calling {}",
                callee.signature()
            )));
        }
        let kind = if callee.is_static {
            InvokeKind::Static
        } else {
            InvokeKind::Virtual
        };
        self.pending.push(Instruction::Invoke(InvokeExpr {
            kind,
            callee,
            receiver,
            args,
        }));
        Ok(())
    }

    /// Textual conversion selected by declared type: machine primitives use
    /// their dedicated `String.valueOf` overload (`byte`/`short` through the
    /// `int` one), everything else the universal object conversion.
    pub fn stringify(&mut self, value: &Value) -> Result<LocalId> {
        let param = match self.value_type(value)? {
            Type::Byte | Type::Short | Type::Int => Type::Int,
            ty if ty.is_primitive() => ty,
            _ => Type::object("java.lang.Object"),
        };
        let callee = self
            .program
            .resolve_method("java.lang.String", "valueOf", &[param])?;
        let result = self.fresh_local(Type::object("java.lang.String"));
        self.pending.push(Instruction::Assign {
            target: result,
            rvalue: Rvalue::Invoke(InvokeExpr {
                kind: InvokeKind::Static,
                callee,
                receiver: None,
                args: vec![value.clone()],
            }),
        });
        Ok(result)
    }

    /// Wrap a machine primitive in its reference-type counterpart.
    pub fn box_primitive(&mut self, value: &Value) -> Result<LocalId> {
        let ty = self.value_type(value)?;
        let boxed = ty.boxed().ok_or_else(|| {
            InstrumentError::structural(format!("cannot box non-primitive {}", ty))
        })?;
        let Type::Object(class) = &boxed else {
            unreachable!("boxed counterpart is a reference type")
        };
        let callee = self.program.resolve_method(class, "valueOf", &[ty])?;
        let result = self.fresh_local(boxed.clone());
        self.pending.push(Instruction::Assign {
            target: result,
            rvalue: Rvalue::Invoke(InvokeExpr {
                kind: InvokeKind::Static,
                callee,
                receiver: None,
                args: vec![value.clone()],
            }),
        });
        Ok(result)
    }

    /// Array literal of fixed, statically known length and homogeneous
    /// element type.
    pub fn array_literal(&mut self, element: Type, values: Vec<Value>) -> Result<LocalId> {
        let array = self.fresh_local(Type::array(element.clone()));
        self.pending.push(Instruction::Assign {
            target: array,
            rvalue: Rvalue::NewArray {
                element,
                length: values.len(),
            },
        });
        for (index, value) in values.into_iter().enumerate() {
            self.pending.push(Instruction::ArrayStore {
                array,
                index,
                value,
            });
        }
        Ok(array)
    }

    /// The standard "produce formatted text" idiom: box primitives, collect
    /// into an object array, call `String.format`. The template uses the
    /// legacy positional form, one `%s` per argument.
    pub fn format(&mut self, template: &str, args: Vec<Value>) -> Result<LocalId> {
        let mut elements = Vec::with_capacity(args.len());
        for arg in args {
            let converted = match &arg {
                Value::Null => arg.clone(),
                value => {
                    if self.value_type(value)?.is_primitive() {
                        Value::Local(self.box_primitive(value)?)
                    } else {
                        arg.clone()
                    }
                }
            };
            elements.push(converted);
        }
        let array = self.array_literal(Type::object("java.lang.Object"), elements)?;
        let callee = self.program.resolve_method(
            "java.lang.String",
            "format",
            &[
                Type::object("java.lang.String"),
                Type::array(Type::object("java.lang.Object")),
            ],
        )?;
        let result = self.fresh_local(Type::object("java.lang.String"));
        self.pending.push(Instruction::Assign {
            target: result,
            rvalue: Rvalue::Invoke(InvokeExpr {
                kind: InvokeKind::Static,
                callee,
                receiver: None,
                args: vec![Value::str(template), Value::Local(array)],
            }),
        });
        Ok(result)
    }

    /// Identity-token computation; the null constant yields the zero
    /// sentinel without emitting anything.
    pub fn identity(&mut self, value: &Value) -> Result<Value> {
        if matches!(value, Value::Null) {
            return Ok(Value::Int(0));
        }
        let ty = self.value_type(value)?;
        if !ty.is_reference() {
            return Err(InstrumentError::config(format!(
                "identity token requested for non-reference type {}",
                ty
            )));
        }
        let callee = self.program.resolve_method(
            "java.lang.System",
            "identityHashCode",
            &[Type::object("java.lang.Object")],
        )?;
        let result = self.fresh_local(Type::Int);
        self.pending.push(Instruction::Assign {
            target: result,
            rvalue: Rvalue::Invoke(InvokeExpr {
                kind: InvokeKind::Static,
                callee,
                receiver: None,
                args: vec![value.clone()],
            }),
        });
        Ok(Value::Local(result))
    }

    /// Comma-joined stringification of the actual arguments: empty text for
    /// none, plain stringification for one, incremental string-builder
    /// concatenation otherwise.
    pub fn concat_args(&mut self, args: &[Value]) -> Result<Value> {
        match args {
            [] => Ok(Value::str("")),
            [single] => Ok(Value::Local(self.stringify(single)?)),
            [first, rest @ ..] => {
                let head = self.stringify(first)?;
                let builder = self.new_object(
                    "java.lang.StringBuilder",
                    vec![Value::Local(head)],
                )?;
                for arg in rest {
                    self.call_discard(
                        Some(Value::Local(builder)),
                        "java.lang.StringBuilder",
                        "append",
                        vec![Value::str(", ")],
                    )?;
                    let stringified = self.stringify(arg)?;
                    self.call_discard(
                        Some(Value::Local(builder)),
                        "java.lang.StringBuilder",
                        "append",
                        vec![Value::Local(stringified)],
                    )?;
                }
                let text = self.call(
                    Some(Value::Local(builder)),
                    "java.lang.StringBuilder",
                    "toString",
                    vec![],
                )?;
                Ok(Value::Local(text.expect("toString returns String")))
            }
        }
    }

    /// Emit the platform log call.
    pub fn log(&mut self, tag: &str, message: Value) -> Result<()> {
        self.call_discard(
            None,
            "android.util.Log",
            "i",
            vec![Value::str(tag), message],
        )
    }

    /// Splice the accumulated instructions immediately before the anchor
    /// and re-validate the body. Consumes the sequence.
    pub fn insert_before(self, anchor: InstructionId) -> Result<()> {
        let InstructionSeq {
            program,
            body,
            pending,
        } = self;
        body.splice_before(anchor, pending)?;
        body.validate(program)
    }

    /// Splice the accumulated instructions immediately after the anchor and
    /// re-validate the body. Consumes the sequence.
    pub fn insert_after(self, anchor: InstructionId) -> Result<()> {
        let InstructionSeq {
            program,
            body,
            pending,
        } = self;
        body.splice_after(anchor, pending)?;
        body.validate(program)
    }
}
