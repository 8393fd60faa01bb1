//! Integration tests against small, self-contained `.wast` scripts.
//!
//! The official `testsuite` submodule is not checked out in this
//! workspace, so these exercise the §8 end-to-end scenarios directly
//! instead of replaying the upstream corpus (see `DESIGN.md`).

use wasmi::Config;
use wast_harness::{exec, run};

fn spec_config() -> Config {
    let mut config = Config::default();
    config.wasm_custom_page_sizes(true);
    config.wasm_wide_arithmetic(true);
    config
}

fn process_wast(path: &str, wast: &str) {
    if let Err(error) = exec(path, wast, false, &spec_config()) {
        panic!("{path}: {error}");
    }
}

#[test]
fn spectest_print_i32() {
    process_wast(
        "spectest_print_i32",
        r#"(assert_return (invoke "print_i32" (i32.const 42)))"#,
    );
}

#[test]
fn malformed_binary_magic_header() {
    process_wast(
        "malformed_binary_magic_header",
        r#"(assert_malformed
             (module binary "\02\00\00\00")
             "magic header not detected")"#,
    );
}

#[test]
fn add_module_roundtrip() {
    process_wast(
        "add_module_roundtrip",
        r#"
        (module
          (func (export "add") (param i32 i32) (result i32)
            local.get 0
            local.get 1
            i32.add))
        (assert_return (invoke "add" (i32.const 1) (i32.const 2)) (i32.const 3))
        "#,
    );
}

#[test]
fn divide_by_zero_traps() {
    process_wast(
        "divide_by_zero_traps",
        r#"
        (module
          (func (export "divz") (param i32) (result i32)
            i32.const 1
            local.get 0
            i32.div_s))
        (assert_trap (invoke "divz" (i32.const 0)) "integer divide by zero")
        "#,
    );
}

#[test]
fn registered_module_returns_any_nan() {
    process_wast(
        "registered_module_returns_any_nan",
        r#"
        (module (func (export "f") (result f64) (f64.const nan)))
        (register "m1")
        (assert_return (invoke "m1" "f") (f64.const nan:canonical))
        "#,
    );
}

#[test]
fn mismatched_return_fails() {
    let config = spec_config();
    let script = r#"
        (module (func (export "id") (param i32) (result i32) local.get 0))
        (assert_return (invoke "id" (i32.const 1)) (i32.const 2))
    "#;
    let error = exec("mismatched_return_fails", script, false, &config).unwrap_err();
    assert_eq!(error, wast_harness::error::ErrKind::BadResult);
}

#[test]
fn final_link_state_contains_registered_names() {
    let config = spec_config();
    let script = r#"
        (module (func (export "f") (result i32) i32.const 1))
        (register "m1")
    "#;
    let ls = run("final_link_state_contains_registered_names", script, false, &config).unwrap();
    assert!(ls.contains("m1"));
    assert!(ls.contains("spectest"));
    assert!(ls.contains("spectest_extern"));
}
