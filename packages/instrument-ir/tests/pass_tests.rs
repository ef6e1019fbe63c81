//! End-to-end pass behavior over fixture programs

mod common;

use common::{add_method, fold_log_calls, instance_method, push_call, Const, IDENTITY_TOKEN};
use instrument_ir::config::Config;
use instrument_ir::features::injection::{LOGGING_INPUT_STREAM, LOGGING_OUTPUT_STREAM};
use instrument_ir::features::passes::{
    AssignmentEraser, CallEraser, CallLogger, DownloadLogger, MethodLogger, StreamLogger,
    TransformPass,
};
use instrument_ir::shared::models::{Instruction, Program, Rvalue, Type, Value};
use instrument_ir::{InstrumentError, Instrumenter};
use pretty_assertions::assert_eq;

fn config(text: &str) -> Config {
    Config::from_str(text).unwrap()
}

/// Detach, process and reattach one body, the way the driver does.
fn process(
    pass: &dyn TransformPass,
    program: &mut Program,
    target: &(String, usize),
) -> instrument_ir::Result<()> {
    let mut body = program.take_body(&target.0, target.1).unwrap();
    let outcome = pass.process_body(program, &mut body);
    program.put_body(&target.0, target.1, body);
    outcome
}

fn body_of<'a>(program: &'a Program, target: &(String, usize)) -> &'a instrument_ir::shared::models::Body {
    program.class(&target.0).unwrap().methods[target.1]
        .body
        .as_ref()
        .unwrap()
}

#[test]
fn assignment_eraser_removes_matching_types_only() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method("com.example.Foo", "run", vec![]),
        |_, body| {
            let secret = body.fresh_local(Type::object("com.example.Secret"));
            let plain = body.fresh_local(Type::object("java.lang.String"));
            body.push(Instruction::Assign {
                target: secret,
                rvalue: Rvalue::Use(Value::Null),
            });
            body.push(Instruction::Assign {
                target: plain,
                rvalue: Rvalue::Use(Value::str("kept")),
            });
        },
    );

    let pass = AssignmentEraser::from_config(&config(
        "AssignmentEraser.enabled = 1\n\
         AssignmentEraser.type = com.example.Secret\n\
         AssignmentEraser.filter = com.example.*\n",
    ))
    .unwrap();
    process(&pass, &mut program, &target).unwrap();

    let assignments: Vec<_> = body_of(&program, &target)
        .instructions()
        .filter(|(_, instruction)| matches!(instruction, Instruction::Assign { .. }))
        .collect();
    assert_eq!(assignments.len(), 1);
}

#[test]
fn assignment_eraser_skips_filtered_out_bodies() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method("org.other.Foo", "run", vec![]),
        |_, body| {
            let secret = body.fresh_local(Type::object("com.example.Secret"));
            body.push(Instruction::Assign {
                target: secret,
                rvalue: Rvalue::Use(Value::Null),
            });
        },
    );

    let pass = AssignmentEraser::from_config(&config(
        "AssignmentEraser.type = com.example.Secret\n\
         AssignmentEraser.filter = com.example.*\n",
    ))
    .unwrap();
    process(&pass, &mut program, &target).unwrap();

    assert!(body_of(&program, &target)
        .instructions()
        .any(|(_, instruction)| matches!(instruction, Instruction::Assign { .. })));
}

#[test]
fn assignment_eraser_requires_its_type_option() {
    let err = AssignmentEraser::from_config(&config("AssignmentEraser.enabled = 1\n")).unwrap_err();
    assert!(matches!(err, InstrumentError::Config(_)));
}

#[test]
fn call_eraser_removes_matching_calls() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method("com.example.Foo", "run", vec![]),
        |program, body| {
            push_call(
                program,
                body,
                None,
                "android.util.Log",
                "i",
                vec![Value::str("t"), Value::str("m")],
            );
        },
    );

    let pass =
        CallEraser::from_config(&config("CallEraser.methods = android.util.Log:i\n")).unwrap();
    process(&pass, &mut program, &target).unwrap();

    assert!(!body_of(&program, &target)
        .instructions()
        .any(|(_, instruction)| matches!(
            instruction,
            Instruction::Invoke(_) | Instruction::Assign { rvalue: Rvalue::Invoke(_), .. }
        )));
}

#[test]
fn call_eraser_requires_its_methods_option() {
    assert!(CallEraser::from_config(&config("CallEraser.enabled = 1\n")).is_err());
}

#[test]
fn call_logger_logs_matching_calls_with_bound_template() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method("com.example.Service", "fetch", vec![]),
        |program, body| {
            push_call(
                program,
                body,
                None,
                "java.lang.String",
                "valueOf",
                vec![Value::Int(99)],
            );
        },
    );

    let pass = CallLogger::from_config(&config(
        "CallLogger.enabled = 1\n\
         CallLogger.tag = Calls\n\
         CallLogger.java.lang.String:valueOf(int) = Method {method:%s} got {result:%s} from {arg0:%i}\n",
    ))
    .unwrap();
    process(&pass, &mut program, &target).unwrap();

    let logged = fold_log_calls(body_of(&program, &target), Const::Obj("<service>".into()), &[]);
    assert_eq!(
        logged,
        vec![(
            "Calls".to_string(),
            "Method com.example.Service.fetch() got 99 from 99".to_string()
        )]
    );
}

#[test]
fn call_logger_template_errors_surface_at_construction() {
    let err = CallLogger::from_config(&config(
        "CallLogger.enabled = 1\n\
         CallLogger.a.B:m = {bogus:%s}\n",
    ))
    .unwrap_err();
    assert!(matches!(err, InstrumentError::Config(_)));
}

#[test]
fn method_logger_inserts_after_setup_instructions() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method(
            "com.example.Service",
            "run",
            vec![Type::Int, Type::object("java.lang.String")],
        ),
        |_, _| {},
    );

    let pass = MethodLogger::from_config(&config(
        "MethodLogger.enabled = 1\n\
         MethodLogger.tag = Entry\n",
    ))
    .unwrap();
    process(&pass, &mut program, &target).unwrap();

    let body = body_of(&program, &target);
    // Setup instructions still lead the body.
    let first_kinds: Vec<bool> = body
        .instructions()
        .take(3)
        .map(|(_, instruction)| instruction.is_setup())
        .collect();
    assert_eq!(first_kinds, vec![true, true, true]);

    let logged = fold_log_calls(
        body,
        Const::Obj("<service>".into()),
        &[Const::Int(5), Const::str("xyz")],
    );
    assert_eq!(
        logged,
        vec![(
            "Entry".to_string(),
            "Entered method com.example.Service.run(int,java.lang.String) with parameters: 5, xyz"
                .to_string()
        )]
    );
}

#[test]
fn method_logger_without_parameters_logs_constant_text() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method("com.example.Service", "ping", vec![]),
        |_, _| {},
    );

    let pass = MethodLogger::from_config(&config("MethodLogger.enabled = 1\n")).unwrap();
    process(&pass, &mut program, &target).unwrap();

    let logged = fold_log_calls(body_of(&program, &target), Const::Obj("<service>".into()), &[]);
    assert_eq!(
        logged,
        vec![(
            "MethodLogger".to_string(),
            "Entered method com.example.Service.ping()".to_string()
        )]
    );
}

#[test]
fn stream_logger_wraps_and_reassigns_the_result() {
    let mut program = Program::with_platform_stubs();
    let mut result_local = None;
    let target = add_method(
        &mut program,
        instance_method(
            "com.example.Net",
            "open",
            vec![Type::object("java.net.URLConnection")],
        ),
        |program, body| {
            let conn = body.param_locals()[0];
            result_local = push_call(
                program,
                body,
                Some(Value::Local(conn)),
                "java.net.URLConnection",
                "getInputStream",
                vec![],
            );
        },
    );

    let pass = StreamLogger::from_config(
        &config(
            "StreamLogger.enabled = 1\n\
             StreamLogger.tag = Streams\n\
             StreamLogger.java.net.URLConnection:getInputStream() = wrapped {this:%x}\n",
        ),
        &mut program,
    )
    .unwrap();
    assert!(program.has_class(LOGGING_INPUT_STREAM));
    assert!(program.has_class(LOGGING_OUTPUT_STREAM));

    process(&pass, &mut program, &target).unwrap();

    let body = body_of(&program, &target);
    let result = result_local.unwrap();

    // A decorator is constructed and the result local is overwritten with it.
    let constructed = body
        .instructions()
        .find_map(|(_, instruction)| match instruction {
            Instruction::Assign {
                target,
                rvalue: Rvalue::New(class),
            } if class == LOGGING_INPUT_STREAM => Some(*target),
            _ => None,
        })
        .expect("decorator constructed");
    let reassigned = body.instructions().any(|(_, instruction)| {
        matches!(
            instruction,
            Instruction::Assign {
                target,
                rvalue: Rvalue::Use(Value::Local(source)),
            } if *target == result && *source == constructed
        )
    });
    assert!(reassigned);
}

#[test]
fn stream_logger_rejects_non_stream_results() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method(
            "com.example.Net",
            "open",
            vec![Type::object("java.net.URLConnection")],
        ),
        |program, body| {
            let conn = body.param_locals()[0];
            push_call(
                program,
                body,
                Some(Value::Local(conn)),
                "java.net.URLConnection",
                "getContentType",
                vec![],
            );
        },
    );

    let pass = StreamLogger::from_config(
        &config(
            "StreamLogger.enabled = 1\n\
             StreamLogger.java.net.URLConnection:getContentType() = bad {this:%x}\n",
        ),
        &mut program,
    )
    .unwrap();
    let err = process(&pass, &mut program, &target).unwrap_err();
    assert!(matches!(err, InstrumentError::Config(_)));
}

#[test]
fn download_logger_logs_known_endpoints() {
    let mut program = Program::with_platform_stubs();
    let target = add_method(
        &mut program,
        instance_method(
            "com.example.Net",
            "fetch",
            vec![
                Type::object("java.net.URL"),
                Type::object("java.net.HttpURLConnection"),
            ],
        ),
        |program, body| {
            let url = body.param_locals()[0];
            let conn = body.param_locals()[1];
            push_call(
                program,
                body,
                Some(Value::Local(url)),
                "java.net.URL",
                "openConnection",
                vec![],
            );
            push_call(
                program,
                body,
                Some(Value::Local(conn)),
                "java.net.HttpURLConnection",
                "getResponseCode",
                vec![],
            );
            push_call(
                program,
                body,
                Some(Value::Local(conn)),
                "java.net.URLConnection",
                "connect",
                vec![],
            );
        },
    );

    let pass =
        DownloadLogger::from_config(&config("DownloadLogger.enabled = 1\n"), &mut program).unwrap();
    process(&pass, &mut program, &target).unwrap();

    let logged = fold_log_calls(
        body_of(&program, &target),
        Const::Obj("<net>".into()),
        &[Const::Obj("http://x/".into()), Const::Obj("<conn>".into())],
    );
    let signature = "com.example.Net.fetch(java.net.URL,java.net.HttpURLConnection)";
    assert_eq!(
        logged,
        vec![
            (
                "DownloadLogger".to_string(),
                format!(
                    "Method {} opened URLConnection {} to URL http://x/",
                    signature, IDENTITY_TOKEN
                )
            ),
            (
                "DownloadLogger".to_string(),
                format!(
                    "Method {} retrieved response code on URLConnection {} (<?>)",
                    signature, IDENTITY_TOKEN
                )
            ),
            (
                "DownloadLogger".to_string(),
                format!(
                    "Method {} called connect() on URLConnection {}",
                    signature, IDENTITY_TOKEN
                )
            ),
        ]
    );
}

#[test]
fn download_logger_wraps_streams_only_when_flagged() {
    let build = |program: &mut Program| {
        add_method(
            program,
            instance_method(
                "com.example.Net",
                "read",
                vec![Type::object("java.net.HttpURLConnection")],
            ),
            |program, body| {
                let conn = body.param_locals()[0];
                push_call(
                    program,
                    body,
                    Some(Value::Local(conn)),
                    "java.net.URLConnection",
                    "getInputStream",
                    vec![],
                );
            },
        )
    };
    let wrapped = |program: &Program, target: &(String, usize)| {
        body_of(program, target).instructions().any(|(_, instruction)| {
            matches!(instruction, Instruction::Assign { rvalue: Rvalue::New(class), .. }
                if class == LOGGING_INPUT_STREAM)
        })
    };

    // Flag off: the stream entry point is neither logged nor wrapped.
    let mut program = Program::with_platform_stubs();
    let target = build(&mut program);
    let pass =
        DownloadLogger::from_config(&config("DownloadLogger.enabled = 1\n"), &mut program).unwrap();
    process(&pass, &mut program, &target).unwrap();
    assert!(!wrapped(&program, &target));

    // Flag on: the result is wrapped in the injected decorator.
    let mut program = Program::with_platform_stubs();
    let target = build(&mut program);
    let pass = DownloadLogger::from_config(
        &config(
            "DownloadLogger.enabled = 1\n\
             DownloadLogger.responses = 1\n",
        ),
        &mut program,
    )
    .unwrap();
    assert!(program.has_class(LOGGING_INPUT_STREAM));
    process(&pass, &mut program, &target).unwrap();
    assert!(wrapped(&program, &target));
}

#[test]
fn driver_requires_at_least_one_enabled_pass() {
    let mut program = Program::with_platform_stubs();
    let err =
        Instrumenter::from_config(&config("SomethingElse.key = 1\n"), &mut program).unwrap_err();
    assert!(matches!(err, InstrumentError::Config(_)));
}

#[test]
fn driver_builds_passes_in_registration_order() {
    let mut program = Program::with_platform_stubs();
    let instrumenter = Instrumenter::from_config(
        &config(
            "CallLogger.enabled = 1\n\
             MethodLogger.enabled = 1\n\
             AssignmentEraser.enabled = 1\n\
             AssignmentEraser.type = com.example.Secret\n",
        ),
        &mut program,
    )
    .unwrap();
    assert_eq!(
        instrumenter.pass_names(),
        vec!["MethodLogger", "AssignmentEraser", "CallLogger"]
    );
}

#[test]
fn driver_visits_every_body() {
    let mut program = Program::with_platform_stubs();
    let first = add_method(
        &mut program,
        instance_method("com.example.A", "first", vec![]),
        |_, _| {},
    );
    let second = add_method(
        &mut program,
        instance_method("com.example.B", "second", vec![Type::Int]),
        |_, _| {},
    );

    let instrumenter = Instrumenter::from_config(
        &config(
            "MethodLogger.enabled = 1\n\
             MethodLogger.tag = Entry\n",
        ),
        &mut program,
    )
    .unwrap();
    instrumenter.run(&mut program).unwrap();

    for (target, expected) in [
        (&first, "Entered method com.example.A.first()"),
        (
            &second,
            "Entered method com.example.B.second(int) with parameters: 3",
        ),
    ] {
        let logged = fold_log_calls(body_of(&program, target), Const::Obj("<o>".into()), &[
            Const::Int(3),
        ]);
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].1, expected);
    }
}
