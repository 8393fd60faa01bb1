//! Script-driven WebAssembly conformance harness.
//!
//! The core pieces, [`value`], [`error`], [`oracle`], [`link_state`], and
//! [`action`], never depend on a concrete Wasm toolkit; [`backend`] is
//! where a real one (`wasmi` + `wast`) is wired in. [`run`] and [`exec`]
//! are the top-level entry points a CLI front-end (or a test) drives.

pub mod action;
pub mod backend;
pub mod error;
pub mod link_state;
pub mod oracle;
pub mod value;

use backend::Driver;
use error::ErrKind;
use link_state::LinkState;

/// The two host module names the harness installs before any user
/// directive runs. Both are backed by the same fixture (see
/// `backend::wasmi_backend::Driver::register_spectest`'s doc comment).
const SPECTEST: &str = "spectest";
const SPECTEST_EXTERN: &str = "spectest_extern";

/// Runs `wast` (read from `filename` only for diagnostics) to completion
/// and returns the final link state.
///
/// Installs the `spectest`/`spectest_extern` host fixtures first, per
/// §4.5's initialization step, then folds every directive in `wast` over
/// the resulting state.
pub fn run(
    filename: &str,
    wast: &str,
    no_exhaustion: bool,
    config: &wasmi::Config,
) -> Result<LinkState, ErrKind> {
    let mut driver = Driver::new(config, no_exhaustion);
    driver.register_spectest(SPECTEST)?;
    driver.register_spectest(SPECTEST_EXTERN)?;
    driver.process_script(filename, wast)?;
    Ok(driver.link_state().clone())
}

/// Like [`run`], but discards the final link state; for callers that only
/// care whether the script passed.
pub fn exec(
    filename: &str,
    wast: &str,
    no_exhaustion: bool,
    config: &wasmi::Config,
) -> Result<(), ErrKind> {
    run(filename, wast, no_exhaustion, config).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> wasmi::Config {
        let mut config = wasmi::Config::default();
        config.wasm_custom_page_sizes(true);
        config.wasm_wide_arithmetic(true);
        config
    }

    #[test]
    fn spectest_is_installed_before_any_user_directive() {
        let ls = run("inline", "", false, &default_config()).unwrap();
        assert!(ls.contains(SPECTEST));
        assert!(ls.contains(SPECTEST_EXTERN));
    }

    #[test]
    fn print_i32_consumes_its_argument() {
        let script = r#"(assert_return (invoke "print_i32" (i32.const 42)))"#;
        exec("inline", script, false, &default_config()).unwrap();
    }

    #[test]
    fn simple_add_module_round_trips() {
        let script = r#"
            (module
              (func (export "add") (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add))
            (assert_return (invoke "add" (i32.const 1) (i32.const 2)) (i32.const 3))
        "#;
        exec("inline", script, false, &default_config()).unwrap();
    }

    #[test]
    fn mismatched_result_is_bad_result() {
        let script = r#"
            (module (func (export "id") (param i32) (result i32) local.get 0))
            (assert_return (invoke "id" (i32.const 1)) (i32.const 2))
        "#;
        let error = exec("inline", script, false, &default_config()).unwrap_err();
        assert_eq!(error, ErrKind::BadResult);
    }

    #[test]
    fn register_aliases_last_module_into_link_state() {
        let script = r#"
            (module (func (export "f") (result i32) i32.const 1))
            (register "m1")
        "#;
        let ls = run("inline", script, false, &default_config()).unwrap();
        assert!(ls.contains("m1"));
    }

    #[test]
    fn assert_exhaustion_is_skipped_when_disabled() {
        let script = r#"
            (module
              (func $inf (export "inf") (result i32)
                call $inf
                i32.const 0
                i32.add))
            (assert_exhaustion (invoke "inf") "call stack exhausted")
        "#;
        exec("inline", script, true, &default_config()).unwrap();
    }
}
