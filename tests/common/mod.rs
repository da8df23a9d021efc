#![allow(dead_code)]

use mythc::{
    CodegenErrorKind, CodegenOptions,
    backend::eval::{EvaluationOptions, ExecutionOutcome, evaluate},
    frontend::ast::{Statement, build::program},
    lower_program,
    middle::lir::Module,
};

pub fn lower(statements: Vec<Statement>) -> Module {
    lower_program(&program(statements), &CodegenOptions::default())
        .unwrap_or_else(|e| panic!("lowering failed: {e}"))
}

pub fn lower_error(statements: Vec<Statement>) -> CodegenErrorKind {
    match lower_program(&program(statements), &CodegenOptions::default()) {
        Ok(_) => panic!("expected lowering to fail"),
        Err(error) => error.kind,
    }
}

pub fn execute(statements: Vec<Statement>, stdin: &str) -> ExecutionOutcome {
    let module = lower(statements);
    let options = EvaluationOptions {
        stdin: stdin.as_bytes().to_vec(),
        step_limit: Some(5_000_000),
        ..Default::default()
    };

    evaluate(&module, &options).unwrap_or_else(|e| panic!("evaluation failed: {e}"))
}

/// Exit code and captured standard output of a program
pub fn run(statements: Vec<Statement>) -> (i32, String) {
    let outcome = execute(statements, "");

    (outcome.exit_code, outcome.stdout_text())
}

/// Standard output of a program which is expected to exit normally
pub fn output(statements: Vec<Statement>) -> String {
    let (exit_code, stdout) = run(statements);
    assert_eq!(exit_code, 0, "program exited with {exit_code}, output: {stdout:?}");

    stdout
}
