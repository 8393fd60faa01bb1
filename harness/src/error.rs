//! The error taxonomy and classifier (§4.2, §7).

use core::fmt;

/// Flat tagged sum over everything that can make a directive fail.
///
/// Modeled by hand, without a derive-macro error crate, matching the
/// teacher's own hand-rolled error enums (`wasmi_core::MemoryError`,
/// `TableError`): each variant carries exactly the data the classifier or a
/// human reader needs, and `Display` is a plain `match`.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrKind {
    /// A free-form message from a capability (parser, compiler, linker, ...).
    Msg(String),
    /// A free-form parse failure, kept distinct from [`ErrKind::Msg`] so the
    /// classifier can special-case parser wording independently of runtime
    /// wording if a future rule needs to.
    ParseFail(String),
    /// Distinguished kind for "constant out of range" so callers that expect
    /// `i32 constant ...` can recognize it without string matching.
    ConstantOutOfRange,
    /// An action referenced no module by omitting `mod_id` before any module
    /// had been installed.
    UnboundLastModule,
    /// An action referenced a module id that was never registered.
    UnboundModule(String),
    /// An action referenced an export name absent from the resolved module.
    UnboundName(String),
    /// The oracle rejected a produced value against its expected result.
    BadResult,
    /// A staged computation failed with one error where another was expected.
    FailedWithButExpected(Box<ErrKind>, String),
    /// An `Assert` directive's staged computation unexpectedly succeeded.
    DidNotFailButExpected(String),
}

impl fmt::Display for ErrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Msg(s) | Self::ParseFail(s) => write!(f, "{s}"),
            Self::ConstantOutOfRange => write!(f, "constant out of range"),
            Self::UnboundLastModule => write!(f, "no previous module instance to resolve against"),
            Self::UnboundModule(id) => write!(f, "unbound module instance: {id}"),
            Self::UnboundName(name) => write!(f, "unbound export name: {name}"),
            Self::BadResult => write!(f, "produced result did not match the expected result"),
            Self::FailedWithButExpected(got, expected) => {
                write!(f, "failed with '{got}' but expected '{expected}'")
            }
            Self::DidNotFailButExpected(expected) => {
                write!(f, "did not fail but expected failure matching '{expected}'")
            }
        }
    }
}

impl std::error::Error for ErrKind {}

impl ErrKind {
    /// Canonicalizes `self` to the string the classifier compares against an
    /// expected prefix (§4.2).
    fn canonical(&self) -> String {
        match self {
            Self::Msg(s) | Self::ParseFail(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Returns `true` iff `error`'s canonical message equals or is prefixed by
/// `expected`, applying the small set of fuzzy-match rules the spec licenses
/// and nothing else.
pub fn check_error(expected: &str, error: &ErrKind) -> bool {
    let canon = error.canonical();

    if canon == expected || canon.starts_with(expected) {
        return true;
    }
    if canon.starts_with("constant out of range") && expected.starts_with("i32 constant") {
        return true;
    }
    if matches!(error, ErrKind::ConstantOutOfRange) && expected.starts_with("i32 constant") {
        return true;
    }
    if canon == "unexpected end of section or function" && expected == "section size mismatch" {
        return true;
    }
    false
}

/// Wraps a staged computation expected to fail with a message matching
/// `expected`. Succeeds if the computation failed with a matching error;
/// otherwise returns the appropriate [`ErrKind`].
pub fn check_error_result<T>(expected: &str, result: Result<T, ErrKind>) -> Result<(), ErrKind> {
    match result {
        Ok(_) => Err(ErrKind::DidNotFailButExpected(expected.to_string())),
        Err(error) => {
            if check_error(expected, &error) {
                Ok(())
            } else {
                Err(ErrKind::FailedWithButExpected(
                    Box::new(error),
                    expected.to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_prefix_matches() {
        let err = ErrKind::Msg("magic header not detected in blob".into());
        assert!(check_error("magic header not detected", &err));
    }

    #[test]
    fn strict_prefix_rejects_unrelated() {
        let err = ErrKind::Msg("magic header not detected in blob".into());
        assert!(!check_error("unknown import", &err));
    }

    #[test]
    fn i32_constant_out_of_range_prefix_rule() {
        let err = ErrKind::Msg("constant out of range for the target type".into());
        assert!(check_error("i32 constant out of range", &err));
        let err = ErrKind::ConstantOutOfRange;
        assert!(check_error("i32 constant out of range", &err));
    }

    #[test]
    fn section_size_mismatch_reconciliation() {
        let err = ErrKind::Msg("unexpected end of section or function".into());
        assert!(check_error("section size mismatch", &err));
    }

    #[test]
    fn check_error_result_success_is_failure() {
        let result: Result<(), ErrKind> = Ok(());
        let outcome = check_error_result("anything", result);
        assert_eq!(
            outcome,
            Err(ErrKind::DidNotFailButExpected("anything".to_string()))
        );
    }

    #[test]
    fn check_error_result_mismatched_error() {
        let result: Result<(), ErrKind> = Err(ErrKind::Msg("wrong message".into()));
        let outcome = check_error_result("right message", result);
        assert!(matches!(outcome, Err(ErrKind::FailedWithButExpected(_, _))));
    }
}
