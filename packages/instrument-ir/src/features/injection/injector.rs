//! Auxiliary class injection and constructor fix-up
//!
//! Adds a bundled helper class to the target program's class table. The
//! upstream provider's resolution stage rewrites constructor super-calls
//! into a two-step "cast self, invoke through the temporary" form; later
//! call matching expects the direct form, so injection collapses the
//! pattern back. Idempotent; a no-op when the pattern is absent.

use tracing::debug;

use crate::errors::{InstrumentError, Result};
use crate::shared::models::{Body, Instruction, InvokeKind, Program, Rvalue, Type, Value};

use super::bundled;

/// Resolve a bundled helper class and add it to the program, repairing the
/// constructor-rewrite artifact. Re-injecting an already present class is a
/// no-op.
pub fn inject_class(program: &mut Program, identifier: &str) -> Result<()> {
    if program.has_class(identifier) {
        return Ok(());
    }
    let mut class = bundled::bundled_class(identifier).ok_or_else(|| {
        InstrumentError::lookup(format!("no bundled class named {}", identifier))
    })?;
    let superclass = class.superclass.clone();
    for method in &mut class.methods {
        if method.name != "<init>" {
            continue;
        }
        if let (Some(body), Some(superclass)) = (method.body.as_mut(), superclass.as_deref()) {
            collapse_super_call(body, superclass, program)?;
        }
    }
    debug!(class = identifier, "injected helper class");
    program.add_class(class)
}

/// Collapse `$tmp = (Super) this; specialinvoke $tmp.<init>(...)` back into
/// a direct super-constructor call on the self reference. Returns whether
/// the body changed.
pub fn collapse_super_call(body: &mut Body, superclass: &str, program: &Program) -> Result<bool> {
    let Some(this) = body.this_local() else {
        return Ok(false);
    };
    let super_ty = Type::object(superclass);

    let mut cast_instruction = None;
    let mut casted_local = None;
    for (id, instruction) in body.instructions() {
        if let Instruction::Assign {
            target,
            rvalue: Rvalue::Cast { target: ty, value },
        } = instruction
        {
            if *ty == super_ty && *value == Value::Local(this) {
                cast_instruction = Some(id);
                casted_local = Some(*target);
                break;
            }
        }
    }
    let (Some(cast_instruction), Some(casted_local)) = (cast_instruction, casted_local) else {
        return Ok(false);
    };

    let mut redirects = Vec::new();
    for (id, instruction) in body.instructions() {
        if let Instruction::Invoke(invoke) = instruction {
            if invoke.kind == InvokeKind::Special
                && invoke.receiver == Some(Value::Local(casted_local))
            {
                let mut direct = invoke.clone();
                direct.receiver = Some(Value::Local(this));
                redirects.push((id, Instruction::Invoke(direct)));
            }
        }
    }
    for (id, instruction) in redirects {
        body.replace(id, instruction)?;
    }
    body.remove(cast_instruction);
    body.validate(program)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::building::inspect;

    #[test]
    fn test_injection_collapses_constructor_pattern() {
        let mut program = Program::with_platform_stubs();
        inject_class(&mut program, bundled::LOGGING_INPUT_STREAM).unwrap();

        let class = program.class(bundled::LOGGING_INPUT_STREAM).unwrap();
        let constructor = class
            .methods
            .iter()
            .find(|method| method.name == "<init>")
            .unwrap();
        let body = constructor.body.as_ref().unwrap();

        // No cast remains, and the super call dispatches on the self local.
        assert!(body.instructions().all(|(_, instruction)| !matches!(
            instruction,
            Instruction::Assign {
                rvalue: Rvalue::Cast { .. },
                ..
            }
        )));
        let super_call = body
            .instructions()
            .filter_map(|(_, instruction)| inspect::invocation(instruction))
            .find(|invoke| invoke.callee.name == "<init>")
            .unwrap();
        assert_eq!(super_call.receiver, Some(Value::Local(body.this_local().unwrap())));
    }

    #[test]
    fn test_injection_is_idempotent() {
        let mut program = Program::with_platform_stubs();
        inject_class(&mut program, bundled::LOGGING_OUTPUT_STREAM).unwrap();
        let first = program.class(bundled::LOGGING_OUTPUT_STREAM).unwrap().clone();
        inject_class(&mut program, bundled::LOGGING_OUTPUT_STREAM).unwrap();
        assert_eq!(
            &first,
            program.class(bundled::LOGGING_OUTPUT_STREAM).unwrap()
        );
    }

    #[test]
    fn test_unknown_identifier_is_lookup_error() {
        let mut program = Program::with_platform_stubs();
        let err = inject_class(&mut program, "no.such.Helper").unwrap_err();
        assert!(matches!(err, InstrumentError::Lookup(_)));
    }

    #[test]
    fn test_collapse_without_pattern_is_noop() {
        let mut program = Program::with_platform_stubs();
        inject_class(&mut program, bundled::LOGGING_INPUT_STREAM).unwrap();
        let mut body = program
            .class(bundled::LOGGING_INPUT_STREAM)
            .unwrap()
            .methods
            .iter()
            .find(|method| method.name == "<init>")
            .unwrap()
            .body
            .clone()
            .unwrap();
        assert!(!collapse_super_call(&mut body, "java.io.FilterInputStream", &program).unwrap());
    }
}
