//! Bundled helper class definitions
//!
//! Fully defined program-model renditions of the two logging stream
//! decorators, ready to be added to a target program. The constructors carry
//! the upstream provider's rewrite artifact (cast self to the supertype,
//! invoke the super constructor through the temporary); the injector
//! collapses it back to the direct form later call matching expects.

use crate::shared::models::{
    Body, Class, Instruction, InvokeExpr, InvokeKind, Method, MethodRef, Rvalue, Type, Value,
};

/// Identifier of the bundled input-stream decorator class
pub const LOGGING_INPUT_STREAM: &str = "instrumentir.runtime.LoggingInputStream";
/// Identifier of the bundled output-stream decorator class
pub const LOGGING_OUTPUT_STREAM: &str = "instrumentir.runtime.LoggingOutputStream";

/// Resolve a bundled class definition by identifier.
pub fn bundled_class(identifier: &str) -> Option<Class> {
    match identifier {
        LOGGING_INPUT_STREAM => Some(logging_input_stream()),
        LOGGING_OUTPUT_STREAM => Some(logging_output_stream()),
        _ => None,
    }
}

fn string() -> Type {
    Type::object("java.lang.String")
}

fn logging_input_stream() -> Class {
    let superclass = "java.io.FilterInputStream";
    let stream = Type::object("java.io.InputStream");

    let constructor = Method {
        name: "<init>".into(),
        params: vec![stream.clone(), string(), string()],
        ret: Type::Void,
        is_static: false,
        body: None,
    };
    let ctor_body = decorator_constructor(
        LOGGING_INPUT_STREAM,
        superclass,
        stream.clone(),
        constructor.make_ref(LOGGING_INPUT_STREAM),
    );

    let read = Method {
        name: "read".into(),
        params: vec![],
        ret: Type::Int,
        is_static: false,
        body: None,
    };
    let mut read_body = Body::for_method(read.make_ref(LOGGING_INPUT_STREAM));
    let this = read_body.this_local().expect("instance method");
    let result = read_body.fresh_local(Type::Int);
    read_body.push(Instruction::Assign {
        target: result,
        rvalue: Rvalue::Invoke(InvokeExpr {
            kind: InvokeKind::Special,
            callee: MethodRef {
                class: "java.io.InputStream".into(),
                name: "read".into(),
                params: vec![],
                ret: Type::Int,
                is_static: false,
            },
            receiver: Some(Value::Local(this)),
            args: vec![],
        }),
    });
    read_body.push(Instruction::Return(Some(Value::Local(result))));

    Class::new(LOGGING_INPUT_STREAM)
        .with_superclass(superclass)
        .with_field("tag", string())
        .with_field("prefix", string())
        .with_field("reentrance", Type::Boolean)
        .with_method(constructor.with_body(ctor_body))
        .with_method(read.with_body(read_body))
}

fn logging_output_stream() -> Class {
    let superclass = "java.io.FilterOutputStream";
    let stream = Type::object("java.io.OutputStream");

    let constructor = Method {
        name: "<init>".into(),
        params: vec![stream.clone(), string(), string()],
        ret: Type::Void,
        is_static: false,
        body: None,
    };
    let ctor_body = decorator_constructor(
        LOGGING_OUTPUT_STREAM,
        superclass,
        stream.clone(),
        constructor.make_ref(LOGGING_OUTPUT_STREAM),
    );

    let write = Method {
        name: "write".into(),
        params: vec![Type::Int],
        ret: Type::Void,
        is_static: false,
        body: None,
    };
    let mut write_body = Body::for_method(write.make_ref(LOGGING_OUTPUT_STREAM));
    let this = write_body.this_local().expect("instance method");
    let byte = write_body.param_locals()[0];
    write_body.push(Instruction::Invoke(InvokeExpr {
        kind: InvokeKind::Special,
        callee: MethodRef {
            class: "java.io.OutputStream".into(),
            name: "write".into(),
            params: vec![Type::Int],
            ret: Type::Void,
            is_static: false,
        },
        receiver: Some(Value::Local(this)),
        args: vec![Value::Local(byte)],
    }));
    write_body.push(Instruction::Return(None));

    Class::new(LOGGING_OUTPUT_STREAM)
        .with_superclass(superclass)
        .with_field("tag", string())
        .with_field("prefix", string())
        .with_field("reentrance", Type::Boolean)
        .with_method(constructor.with_body(ctor_body))
        .with_method(write.with_body(write_body))
}

/// Constructor body `(stream, tag, prefix)` in the post-resolution shape:
///
/// ```text
/// r0 := @this
/// r1 := @parameter0    // wrapped stream
/// r2 := @parameter1    // tag
/// r3 := @parameter2    // prefix
/// $r4 = (Super) r0                         <- rewrite artifact
/// specialinvoke $r4.<Super: <init>(...)>   <- through the temporary
/// r0.tag = r2
/// r0.prefix = r3
/// r0.reentrance = 0
/// return
/// ```
fn decorator_constructor(
    class: &str,
    superclass: &str,
    stream: Type,
    method: MethodRef,
) -> Body {
    let mut body = Body::for_method(method);
    let this = body.this_local().expect("constructor is an instance method");
    let wrapped = body.param_locals()[0];
    let tag = body.param_locals()[1];
    let prefix = body.param_locals()[2];

    let casted = body.fresh_local(Type::object(superclass));
    body.push(Instruction::Assign {
        target: casted,
        rvalue: Rvalue::Cast {
            target: Type::object(superclass),
            value: Value::Local(this),
        },
    });
    body.push(Instruction::Invoke(InvokeExpr {
        kind: InvokeKind::Special,
        callee: MethodRef {
            class: superclass.to_string(),
            name: "<init>".into(),
            params: vec![stream],
            ret: Type::Void,
            is_static: false,
        },
        receiver: Some(Value::Local(casted)),
        args: vec![Value::Local(wrapped)],
    }));
    for (field, value) in [
        ("tag", Value::Local(tag)),
        ("prefix", Value::Local(prefix)),
        ("reentrance", Value::Int(0)),
    ] {
        body.push(Instruction::FieldStore {
            receiver: Value::Local(this),
            class: class.to_string(),
            field: field.into(),
            value,
        });
    }
    body.push(Instruction::Return(None));
    body
}
