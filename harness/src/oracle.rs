//! The result oracle (§4.1): decides whether a produced value stack
//! satisfies a script's symbolic expected-result list.

use crate::value::{ConstLit, ExpR, HostBrand, NanWidth, RefValue, V};

const CANONICAL_NAN_F32: u32 = 0x7FC0_0000;
const CANONICAL_NAN_F64: u64 = 0x7FF8_0000_0000_0000;

/// Returns `true` iff `expected` and `produced` have equal length and each
/// position satisfies [`match1`].
///
/// `produced` must already be in the harness's comparison order: the driver
/// reverses the interpreter's push order before calling this function, per
/// §4.1. `host_brand` is the harness's own externref brand, used to reject
/// externrefs minted by anyone else.
pub fn matches(host_brand: HostBrand, expected: &[ExpR], produced: &[V]) -> bool {
    if expected.len() != produced.len() {
        return false;
    }
    expected
        .iter()
        .zip(produced.iter())
        .all(|(e, v)| match1(host_brand, e, v))
}

/// Pair-wise predicate from the §4.1 table.
///
/// # Panics
///
/// Panics if `expected` names an unsupported constant form
/// ([`ConstLit::Unsupported`]): the spec requires this to be a hard
/// implementation error, never a silent rejection.
pub fn match1(host_brand: HostBrand, expected: &ExpR, produced: &V) -> bool {
    match (expected, produced) {
        (ExpR::Literal(ConstLit::Unsupported), _) => {
            panic!("encountered unsupported expected-result constant")
        }
        (ExpR::Literal(ConstLit::I32(n)), V::I32(m)) => n == m,
        (ExpR::Literal(ConstLit::I64(n)), V::I64(m)) => n == m,
        (ExpR::Literal(ConstLit::F32(n)), V::F32(m)) => f32_literal_matches(*n, *m),
        (ExpR::Literal(ConstLit::F64(n)), V::F64(m)) => f64_literal_matches(*n, *m),
        (ExpR::Literal(ConstLit::V128(n)), V::V128(m)) => n == m,
        (ExpR::Literal(ConstLit::NullFunc), V::Ref(RefValue::FuncRef(None))) => true,
        (ExpR::Literal(ConstLit::NullExtern), V::Ref(RefValue::ExternRef(None))) => true,
        (ExpR::Literal(ConstLit::Extern(n)), V::Ref(RefValue::ExternRef(Some(payload)))) => {
            payload.brand == host_brand && payload.payload == *n
        }
        (ExpR::NanCanon(NanWidth::S32), V::F32(f)) => nan_canon_f32(*f),
        (ExpR::NanCanon(NanWidth::S64), V::F64(f)) => nan_canon_f64(*f),
        (ExpR::NanArith(NanWidth::S32), V::F32(f)) => nan_arith_f32(*f),
        (ExpR::NanArith(NanWidth::S64), V::F64(f)) => nan_arith_f64(*f),
        _ => false,
    }
}

/// `f32` literal comparison: bit-identical, or identical canonical decimal
/// rendering (the spec test corpus relies on the latter for round-tripped
/// literals whose bits a runtime may legitimately reconstruct differently).
///
/// Exposed `pub(crate)` so the backend's per-lane `v128` matcher (which has
/// no `ExpR` of its own to dispatch through, since §3 models `v128` as a
/// single bit-identical literal) can reuse the same predicate lane by lane.
pub(crate) fn f32_literal_matches(expected: f32, produced: f32) -> bool {
    expected.to_bits() == produced.to_bits() || format!("{expected}") == format!("{produced}")
}

/// `f64` analogue of [`f32_literal_matches`].
pub(crate) fn f64_literal_matches(expected: f64, produced: f64) -> bool {
    expected.to_bits() == produced.to_bits() || format!("{expected}") == format!("{produced}")
}

/// `true` iff `f` is any NaN (§4.1 `NanCanon(S32)`).
pub(crate) fn nan_canon_f32(f: f32) -> bool {
    f.is_nan()
}

/// `true` iff `f` is any NaN (§4.1 `NanCanon(S64)`).
pub(crate) fn nan_canon_f64(f: f64) -> bool {
    f.is_nan()
}

/// Arithmetic-NaN predicate (§4.1 `NanArith(S32)`, preserved exactly per the
/// §9 open question: bitwise `AND` against the positive canonical NaN, not
/// the strictly symmetric spec definition).
pub(crate) fn nan_arith_f32(f: f32) -> bool {
    (f.to_bits() & CANONICAL_NAN_F32) == CANONICAL_NAN_F32
}

/// `f64` analogue of [`nan_arith_f32`].
pub(crate) fn nan_arith_f64(f: f64) -> bool {
    (f.to_bits() & CANONICAL_NAN_F64) == CANONICAL_NAN_F64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ExternPayload, HostBrand};

    #[test]
    fn i32_literal_reflexive() {
        let brand = HostBrand::fresh();
        assert!(matches(
            brand,
            &[ExpR::Literal(ConstLit::I32(3))],
            &[V::I32(3)]
        ));
    }

    #[test]
    fn f32_bit_identical_reflexive() {
        let brand = HostBrand::fresh();
        let f = 0.1f32;
        assert!(match1(brand, &ExpR::Literal(ConstLit::F32(f)), &V::F32(f)));
    }

    #[test]
    fn nan_canon_accepts_any_nan() {
        let brand = HostBrand::fresh();
        assert!(match1(brand, &ExpR::NanCanon(NanWidth::S32), &V::F32(f32::NAN)));
        assert!(match1(brand, &ExpR::NanCanon(NanWidth::S32), &V::F32(-f32::NAN)));
    }

    #[test]
    fn nan_canon_rejects_non_nan() {
        let brand = HostBrand::fresh();
        assert!(!match1(brand, &ExpR::NanCanon(NanWidth::S32), &V::F32(1.0)));
    }

    #[test]
    fn arithmetic_nan_requires_quiet_bit() {
        let brand = HostBrand::fresh();
        let quiet = f32::from_bits(0x7FC0_0001);
        assert!(match1(brand, &ExpR::NanArith(NanWidth::S32), &V::F32(quiet)));
        let signaling = f32::from_bits(0x7F80_0001);
        assert!(!match1(brand, &ExpR::NanArith(NanWidth::S32), &V::F32(signaling)));
    }

    #[test]
    fn length_mismatch_rejects() {
        let brand = HostBrand::fresh();
        assert!(!matches(brand, &[ExpR::Literal(ConstLit::I32(1))], &[]));
    }

    #[test]
    fn null_funcref_matches_only_null() {
        use crate::value::RefValue;
        let brand = HostBrand::fresh();
        assert!(match1(
            brand,
            &ExpR::Literal(ConstLit::NullFunc),
            &V::Ref(RefValue::FuncRef(None))
        ));
        assert!(!match1(
            brand,
            &ExpR::Literal(ConstLit::NullFunc),
            &V::Ref(RefValue::FuncRef(Some(crate::value::FuncId(0))))
        ));
    }

    #[test]
    fn externref_rejects_foreign_brand() {
        let brand = HostBrand::fresh();
        let other_brand = HostBrand::fresh();
        let payload = ExternPayload {
            brand: other_brand,
            payload: 42,
        };
        assert!(!match1(
            brand,
            &ExpR::Literal(ConstLit::Extern(42)),
            &V::Ref(RefValue::ExternRef(Some(payload)))
        ));
        assert!(match1(
            other_brand,
            &ExpR::Literal(ConstLit::Extern(42)),
            &V::Ref(RefValue::ExternRef(Some(payload)))
        ));
    }

    #[test]
    #[should_panic(expected = "unsupported expected-result constant")]
    fn unsupported_literal_is_a_hard_error() {
        let brand = HostBrand::fresh();
        match1(brand, &ExpR::Literal(ConstLit::Unsupported), &V::I32(0));
    }
}
