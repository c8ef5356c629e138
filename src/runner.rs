use std::sync::{Arc, Mutex};

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Scope};
use serde::Serialize;
use thiserror::Error;

const VALID_SYNTAX_MSG: &str = "Code syntax is valid";
const TEST_PREFIX: &str = "test_";

// Outcome of one runner invocation. `error_message` is empty on success.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub success: bool,
    pub output: String,
    pub error_message: String,
}

impl RunResult {
    fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error_message: String::new(),
        }
    }

    fn fault(fault: Fault, output: String) -> Self {
        Self {
            success: false,
            output,
            error_message: fault.to_string(),
        }
    }
}

// Fault taxonomy. Every fault is flattened into a RunResult; submitted code
// can never crash the host process or escape as an Err.
#[derive(Debug, Error)]
enum Fault {
    #[error("Syntax Error: {0}")]
    Syntax(String),
    #[error("Execution Error: {0}")]
    Runtime(String),
    #[error("Test Execution Error: {0}")]
    TestSetup(String),
    #[error("No test cases found")]
    NoTestsFound,
    #[error("Some tests failed")]
    TestsFailed,
}

// Per-invocation sink for script `print` calls. Each invocation gets its own
// buffer, so nothing is shared between runs or with the process stdout.
#[derive(Clone, Default)]
struct CaptureBuffer(Arc<Mutex<String>>);

impl CaptureBuffer {
    fn push_line(&self, text: &str) {
        let mut buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        buf.push_str(text);
        buf.push('\n');
    }

    fn take(&self) -> String {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

// A fresh engine per invocation: isolated namespace, print wired to the
// capture buffer, assertion helpers registered for test scripts. The default
// rhai engine has no filesystem, network, or process access. No operation or
// time limits are imposed; callers needing bounded execution must wrap the
// call in an external watchdog.
fn capture_engine(buffer: &CaptureBuffer) -> Engine {
    let mut engine = Engine::new();

    let sink = buffer.clone();
    engine.on_print(move |text| sink.push_line(text));

    register_asserts(&mut engine);
    engine
}

fn register_asserts(engine: &mut Engine) {
    engine.register_fn("assert", |cond: bool| -> Result<(), Box<EvalAltResult>> {
        if cond {
            Ok(())
        } else {
            Err("assertion failed".into())
        }
    });
    engine.register_fn(
        "assert_eq",
        |a: i64, b: i64| -> Result<(), Box<EvalAltResult>> {
            if a == b {
                Ok(())
            } else {
                Err(format!("assertion failed: {} != {}", a, b).into())
            }
        },
    );
    engine.register_fn(
        "assert_eq",
        |a: f64, b: f64| -> Result<(), Box<EvalAltResult>> {
            if a == b {
                Ok(())
            } else {
                Err(format!("assertion failed: {} != {}", a, b).into())
            }
        },
    );
    engine.register_fn(
        "assert_eq",
        |a: bool, b: bool| -> Result<(), Box<EvalAltResult>> {
            if a == b {
                Ok(())
            } else {
                Err(format!("assertion failed: {} != {}", a, b).into())
            }
        },
    );
    engine.register_fn(
        "assert_eq",
        |a: ImmutableString, b: ImmutableString| -> Result<(), Box<EvalAltResult>> {
            if a == b {
                Ok(())
            } else {
                Err(format!("assertion failed: {:?} != {:?}", a, b).into())
            }
        },
    );
}

// Render a runtime error with its nested function-call chain as a call
// trace, innermost frame first.
fn render_trace(err: &EvalAltResult) -> String {
    let mut frames = Vec::new();
    let mut cur = err;
    while let EvalAltResult::ErrorInFunctionCall(name, _, inner, pos) = cur {
        frames.push(format!("  in function '{}' ({})", name, pos));
        cur = inner.as_ref();
    }

    let mut out = cur.to_string();
    if !frames.is_empty() {
        out.push_str("\nCall trace:");
        for frame in frames.iter().rev() {
            out.push('\n');
            out.push_str(frame);
        }
    }
    out
}

// Parse `source` without executing it.
pub fn validate_syntax(source: &str) -> RunResult {
    let engine = Engine::new();
    match engine.compile(source) {
        Ok(_) => RunResult::ok(VALID_SYNTAX_MSG),
        Err(err) => RunResult::fault(Fault::Syntax(err.to_string()), String::new()),
    }
}

// Execute `source` in a fresh, isolated engine, capturing everything it
// prints. On a runtime fault the output captured so far is preserved and
// the error carries the fault description plus a call trace.
pub fn execute(source: &str) -> RunResult {
    let buffer = CaptureBuffer::default();
    let engine = capture_engine(&buffer);

    match engine.run(source) {
        Ok(()) => RunResult::ok(buffer.take()),
        Err(err) => RunResult::fault(Fault::Runtime(render_trace(&err)), buffer.take()),
    }
}

// Run `source`, then `tests`, in one shared namespace, then discover and
// run every test case defined between them.
//
// A test case is a zero-parameter function whose name starts with `test_`.
// A failed assertion (or any runtime error) inside a case marks it FAILED;
// the rest of the suite still runs. The returned output is the textual
// suite report.
pub fn run_tests(source: &str, tests: &str) -> RunResult {
    let buffer = CaptureBuffer::default();
    let engine = capture_engine(&buffer);

    let source_ast = match engine.compile(source) {
        Ok(ast) => ast,
        Err(err) => return RunResult::fault(Fault::TestSetup(err.to_string()), String::new()),
    };
    let test_ast = match engine.compile(tests) {
        Ok(ast) => ast,
        Err(err) => return RunResult::fault(Fault::TestSetup(err.to_string()), String::new()),
    };

    // Merge keeps statement order: source top-level runs before test
    // top-level, and test functions can call source functions.
    let suite = source_ast.merge(&test_ast);

    let mut scope = Scope::new();
    if let Err(err) = engine.run_ast_with_scope(&mut scope, &suite) {
        return RunResult::fault(Fault::TestSetup(render_trace(&err)), String::new());
    }

    let cases: Vec<String> = suite
        .iter_functions()
        .filter(|f| f.params.is_empty() && f.name.starts_with(TEST_PREFIX))
        .map(|f| f.name.to_string())
        .collect();

    if cases.is_empty() {
        return RunResult::fault(Fault::NoTestsFound, String::new());
    }

    // Top-level statements already ran; calling through a functions-only
    // copy of the AST keeps them from running again per case.
    let lib = suite.clone_functions_only();

    let mut report = String::new();
    let mut failed = 0usize;
    for name in &cases {
        match engine.call_fn::<Dynamic>(&mut scope, &lib, name, ()) {
            Ok(_) => {
                report.push_str(&format!("test {} ... ok\n", name));
            }
            Err(err) => {
                failed += 1;
                report.push_str(&format!("test {} ... FAILED: {}\n", name, err));
            }
        }
    }

    let passed = cases.len() - failed;
    report.push_str(&format!(
        "\ntest result: {}. {} passed; {} failed\n",
        if failed == 0 { "ok" } else { "FAILED" },
        passed,
        failed
    ));

    if failed == 0 {
        RunResult::ok(report)
    } else {
        RunResult::fault(Fault::TestsFailed, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod validate_tests {
        use super::*;

        #[test]
        fn valid_source_passes() {
            let result = validate_syntax("let x = 1;");
            assert!(result.success);
            assert_eq!(result.output, "Code syntax is valid");
            assert!(result.error_message.is_empty());
        }

        #[test]
        fn unclosed_paren_fails() {
            let result = validate_syntax("let x = (");
            assert!(!result.success);
            assert!(result.output.is_empty());
            assert!(result.error_message.starts_with("Syntax Error:"));
        }

        #[test]
        fn error_includes_location() {
            let result = validate_syntax("let x = ;");
            assert!(!result.success);
            assert!(result.error_message.contains("line"));
        }

        #[test]
        fn validation_does_not_execute() {
            // A division by zero is a runtime fault, not a parse fault.
            let result = validate_syntax("let d = 0; let x = 1 / d;");
            assert!(result.success);
        }
    }

    mod execute_tests {
        use super::*;

        #[test]
        fn captures_print_output() {
            let result = execute("print(\"hi\")");
            assert!(result.success);
            assert_eq!(result.output, "hi\n");
            assert!(result.error_message.is_empty());
        }

        #[test]
        fn captures_multiple_lines_in_order() {
            let result = execute("print(\"a\"); print(\"b\");");
            assert!(result.success);
            assert_eq!(result.output, "a\nb\n");
        }

        #[test]
        fn empty_source_succeeds_with_empty_output() {
            let result = execute("");
            assert!(result.success);
            assert!(result.output.is_empty());
        }

        #[test]
        fn division_by_zero_is_a_runtime_fault() {
            let result = execute("let d = 0; let x = 1 / d; print(x);");
            assert!(!result.success);
            assert!(result.output.is_empty());
            assert!(result.error_message.starts_with("Execution Error:"));
        }

        #[test]
        fn output_before_fault_is_preserved() {
            let result = execute("print(\"partial\"); throw \"boom\";");
            assert!(!result.success);
            assert_eq!(result.output, "partial\n");
            assert!(result.error_message.contains("boom"));
        }

        #[test]
        fn fault_inside_function_reports_a_call_trace() {
            let result = execute("fn inner() { throw \"deep\" } fn outer() { inner() } outer()");
            assert!(!result.success);
            assert!(result.error_message.contains("Call trace:"));
            assert!(result.error_message.contains("inner"));
            assert!(result.error_message.contains("outer"));
        }

        #[test]
        fn invocations_are_isolated() {
            let first = execute("fn defined_earlier() { 42 }");
            assert!(first.success);

            // The next invocation must not see the previous definition.
            let second = execute("print(defined_earlier());");
            assert!(!second.success);
        }

        #[test]
        fn syntax_error_surfaces_as_execution_fault() {
            let result = execute("let x = (");
            assert!(!result.success);
            assert!(result.error_message.starts_with("Execution Error:"));
        }
    }

    mod run_tests_tests {
        use super::*;

        const ADD_SOURCE: &str = "fn add(a, b) { a + b }";

        #[test]
        fn passing_suite_succeeds() {
            let result = run_tests(ADD_SOURCE, "fn test_add() { assert(add(1, 2) == 3); }");
            assert!(result.success);
            assert!(result.output.contains("test test_add ... ok"));
            assert!(result.output.contains("test result: ok. 1 passed; 0 failed"));
            assert!(result.error_message.is_empty());
        }

        #[test]
        fn failing_assertion_fails_the_suite() {
            let result = run_tests(ADD_SOURCE, "fn test_add() { assert(add(1, 2) == 4); }");
            assert!(!result.success);
            assert!(result.output.contains("test test_add ... FAILED"));
            assert_eq!(result.error_message, "Some tests failed");
        }

        #[test]
        fn mixed_suite_reports_both_and_fails() {
            let tests = r#"
                fn test_good() { assert_eq(add(2, 2), 4); }
                fn test_bad() { assert_eq(add(2, 2), 5); }
            "#;
            let result = run_tests(ADD_SOURCE, tests);
            assert!(!result.success);
            assert!(result.output.contains("test test_good ... ok"));
            assert!(result.output.contains("test test_bad ... FAILED"));
            assert!(result.output.contains("1 passed; 1 failed"));
            assert_eq!(result.error_message, "Some tests failed");
        }

        #[test]
        fn no_test_cases_found() {
            let result = run_tests("let x = 1;", "let y = 2;");
            assert!(!result.success);
            assert!(result.output.is_empty());
            assert_eq!(result.error_message, "No test cases found");
        }

        #[test]
        fn functions_with_params_are_not_test_cases() {
            let tests = r#"
                fn test_helper(x) { x }
                fn test_real() { assert(true); }
            "#;
            let result = run_tests("", tests);
            assert!(result.success);
            assert!(result.output.contains("test test_real ... ok"));
            assert!(!result.output.contains("test_helper ..."));
            assert!(result.output.contains("1 passed; 0 failed"));
        }

        #[test]
        fn source_fault_before_discovery() {
            let result = run_tests("throw \"setup blew up\";", "fn test_never() { }");
            assert!(!result.success);
            assert!(result.output.is_empty());
            assert!(result.error_message.starts_with("Test Execution Error:"));
            assert!(result.error_message.contains("setup blew up"));
        }

        #[test]
        fn test_top_level_fault_before_discovery() {
            let result = run_tests("let x = 1;", "throw \"bad test file\";");
            assert!(!result.success);
            assert!(result.error_message.starts_with("Test Execution Error:"));
        }

        #[test]
        fn source_syntax_error_is_a_setup_fault() {
            let result = run_tests("fn broken( {", "fn test_x() { }");
            assert!(!result.success);
            assert!(result.error_message.starts_with("Test Execution Error:"));
        }

        #[test]
        fn test_top_level_shares_source_namespace() {
            // The test file's top level mutates a variable the source file
            // declared; this only works if both run in the same scope, in
            // order.
            let result = run_tests(
                "let counter = 1;",
                "counter += 1; fn test_ok() { assert(true); }",
            );
            assert!(result.success, "got: {}", result.error_message);
        }

        #[test]
        fn runtime_error_in_a_case_is_reported_as_failed() {
            let tests = r#"
                fn test_explodes() { let d = 0; let x = 1 / d; }
                fn test_fine() { assert(true); }
            "#;
            let result = run_tests("", tests);
            assert!(!result.success);
            assert!(result.output.contains("test test_explodes ... FAILED"));
            assert!(result.output.contains("test test_fine ... ok"));
            assert_eq!(result.error_message, "Some tests failed");
        }

        #[test]
        fn assert_eq_reports_values_on_failure() {
            let result = run_tests(ADD_SOURCE, "fn test_add() { assert_eq(add(1, 2), 7); }");
            assert!(!result.success);
            assert!(result.output.contains("3 != 7"));
        }
    }
}
