//! Shared test fixtures
//!
//! Includes a constant folder for instrumented bodies: it walks a body
//! linearly, tracks constant values through the instruction idioms the
//! builder emits, and collects every platform log call as `(tag, message)`.
//! Identity tokens of live objects fold to a fixed marker so expectations
//! stay deterministic.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use rustc_hash::FxHashMap;

use instrument_ir::shared::models::{
    Body, Class, IdentityRef, Instruction, InvokeExpr, InvokeKind, LocalId, Method, MethodRef,
    Program, Rvalue, Type, Value,
};

/// Identity token the folder assigns to any live object
pub const IDENTITY_TOKEN: i64 = 1111;

#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Str(String),
    Int(i64),
    Null,
    /// Object instance, folded to a display label
    Obj(String),
    Arr(Vec<Option<Const>>),
    Builder(String),
    Unknown,
}

impl Const {
    pub fn str(text: impl Into<String>) -> Self {
        Const::Str(text.into())
    }

    fn render(&self) -> String {
        match self {
            Const::Str(text) => text.clone(),
            Const::Int(value) => value.to_string(),
            Const::Null => "null".to_string(),
            Const::Obj(label) => label.clone(),
            Const::Builder(text) => text.clone(),
            Const::Arr(_) | Const::Unknown => "<?>".to_string(),
        }
    }
}

fn const_of(env: &FxHashMap<LocalId, Const>, value: &Value) -> Const {
    match value {
        Value::Local(id) => env.get(id).cloned().unwrap_or(Const::Unknown),
        Value::Int(value) => Const::Int(*value as i64),
        Value::Long(value) => Const::Int(*value),
        Value::Str(text) => Const::Str(text.clone()),
        Value::Null => Const::Null,
    }
}

fn stringify(value: &Const) -> Const {
    match value {
        Const::Unknown => Const::Unknown,
        other => Const::Str(other.render()),
    }
}

fn fold_format(template: &str, args: &[Option<Const>]) -> Const {
    let mut out = String::new();
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => {
                let arg = args.next().and_then(|slot| slot.clone()).unwrap_or(Const::Unknown);
                out.push_str(&arg.render());
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Const::Str(out)
}

/// Fold every platform log call in a body into `(tag, message)` pairs.
/// `this_value` and `params` seed the identity-bound locals.
pub fn fold_log_calls(body: &Body, this_value: Const, params: &[Const]) -> Vec<(String, String)> {
    let mut env: FxHashMap<LocalId, Const> = FxHashMap::default();
    let mut logged = Vec::new();

    for (_, instruction) in body.instructions() {
        match instruction {
            Instruction::Identity { local, source } => {
                let value = match source {
                    IdentityRef::This => this_value.clone(),
                    IdentityRef::Parameter(index) => {
                        params.get(*index).cloned().unwrap_or(Const::Unknown)
                    }
                };
                env.insert(*local, value);
            }
            Instruction::Assign { target, rvalue } => {
                let folded = fold_rvalue(&env, rvalue);
                env.insert(*target, folded);
            }
            Instruction::ArrayStore {
                array,
                index,
                value,
            } => {
                let element = const_of(&env, value);
                if let Some(Const::Arr(elements)) = env.get_mut(array) {
                    if let Some(slot) = elements.get_mut(*index) {
                        *slot = Some(element);
                    }
                }
            }
            Instruction::Invoke(invoke) => match (&invoke.callee.class[..], &invoke.callee.name[..]) {
                ("android.util.Log", "i") => {
                    let tag = const_of(&env, &invoke.args[0]).render();
                    let message = const_of(&env, &invoke.args[1]).render();
                    logged.push((tag, message));
                }
                ("java.lang.StringBuilder", "<init>") => {
                    let initial = const_of(&env, &invoke.args[0]).render();
                    if let Some(receiver) = invoke.receiver.as_ref().and_then(Value::as_local) {
                        env.insert(receiver, Const::Builder(initial));
                    }
                }
                ("java.lang.StringBuilder", "append") => {
                    let appended = const_of(&env, &invoke.args[0]).render();
                    if let Some(receiver) = invoke.receiver.as_ref().and_then(Value::as_local) {
                        if let Some(Const::Builder(text)) = env.get_mut(&receiver) {
                            text.push_str(&appended);
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    logged
}

fn fold_rvalue(env: &FxHashMap<LocalId, Const>, rvalue: &Rvalue) -> Const {
    match rvalue {
        Rvalue::Use(value) => const_of(env, value),
        Rvalue::New(class) => {
            if class == "java.lang.StringBuilder" {
                Const::Builder(String::new())
            } else {
                Const::Obj(format!("<{}>", class))
            }
        }
        Rvalue::NewArray { length, .. } => Const::Arr(vec![None; *length]),
        Rvalue::Cast { value, .. } => const_of(env, value),
        Rvalue::Field { .. } => Const::Unknown,
        Rvalue::Invoke(invoke) => match (&invoke.callee.class[..], &invoke.callee.name[..]) {
            ("java.lang.String", "valueOf") => stringify(&const_of(env, &invoke.args[0])),
            ("java.lang.String", "format") => {
                let Const::Str(template) = const_of(env, &invoke.args[0]) else {
                    return Const::Unknown;
                };
                let Const::Arr(elements) = const_of(env, &invoke.args[1]) else {
                    return Const::Unknown;
                };
                fold_format(&template, &elements)
            }
            ("java.lang.System", "identityHashCode") => match const_of(env, &invoke.args[0]) {
                Const::Null => Const::Int(0),
                _ => Const::Int(IDENTITY_TOKEN),
            },
            (_, "valueOf") => const_of(env, &invoke.args[0]),
            (_, "toString") => {
                match invoke
                    .receiver
                    .as_ref()
                    .map(|receiver| const_of(env, receiver))
                {
                    Some(Const::Builder(text)) => Const::Str(text),
                    Some(other) => stringify(&other),
                    None => Const::Unknown,
                }
            }
            _ => Const::Unknown,
        },
    }
}

/// A minimal instance method whose body ends in a bare return.
pub fn instance_method(class: &str, name: &str, params: Vec<Type>) -> MethodRef {
    MethodRef {
        class: class.to_string(),
        name: name.to_string(),
        params,
        ret: Type::Void,
        is_static: false,
    }
}

/// Register `method` (with the body produced by `build`, a bare return
/// appended) on a class in the program. The builder sees the program for
/// callee resolution. Returns the (class, method index) target pair.
pub fn add_method(
    program: &mut Program,
    method: MethodRef,
    build: impl FnOnce(&Program, &mut Body),
) -> (String, usize) {
    let mut body = Body::for_method(method.clone());
    build(program, &mut body);
    body.push(Instruction::Return(None));

    let class_name = method.class.clone();
    let wrapped = Method {
        name: method.name.clone(),
        params: method.params.clone(),
        ret: method.ret.clone(),
        is_static: method.is_static,
        body: Some(body),
    };
    if program.has_class(&class_name) {
        let class = program.class_mut(&class_name).unwrap();
        class.methods.push(wrapped);
        let index = class.methods.len() - 1;
        (class_name, index)
    } else {
        let class = Class::new(class_name.clone())
            .with_superclass("java.lang.Object")
            .with_method(wrapped);
        program.add_class(class).unwrap();
        (class_name, 0)
    }
}

/// Append `target = receiver.name(args)` or a bare invocation when the
/// callee is void, resolving the callee in `program`. Returns the
/// assignment target, if any.
pub fn push_call(
    program: &Program,
    body: &mut Body,
    receiver: Option<Value>,
    class: &str,
    name: &str,
    args: Vec<Value>,
) -> Option<LocalId> {
    let arg_types: Vec<Type> = args
        .iter()
        .map(|arg| body.type_of(arg).unwrap())
        .collect();
    let callee = program.resolve_method(class, name, &arg_types).unwrap();
    let kind = if callee.is_static {
        InvokeKind::Static
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
        body.push(Instruction::Invoke(invoke));
        None
    } else {
        let target = body.fresh_local(ret);
        body.push(Instruction::Assign {
            target,
            rvalue: Rvalue::Invoke(invoke),
        });
        Some(target)
    }
}
