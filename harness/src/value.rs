//! Runtime value and expected-result data model (§3 of the harness spec).

use std::sync::atomic::{AtomicU64, Ordering};

/// A runtime value produced by invoking a function or reading a global.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum V {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    V128(u128),
    Ref(RefValue),
}

/// The two reference kinds the harness has to reason about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefValue {
    FuncRef(Option<FuncId>),
    ExternRef(Option<ExternPayload>),
}

/// Opaque identifier for a function reference. The harness never inspects
/// the identity of a `funcref` beyond null-vs-non-null, so this is a bare
/// newtype around whatever handle the backend hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u64);

/// A host-branded externref payload: `spectest`'s `(ref.extern n)` values
/// must compare equal only to other values minted by *this* harness run,
/// never to externrefs a different host might produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternPayload {
    pub brand: HostBrand,
    pub payload: i32,
}

/// Process-wide identity token minted once per harness instance.
///
/// This stands in for the "runtime-generated type witness" the spec calls
/// for (§9, Host externref brand): a fresh integer allocated lazily and
/// never reused, so externrefs from two independent [`crate::backend::Driver`]
/// instances are never mistaken for one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBrand(u64);

static NEXT_BRAND: AtomicU64 = AtomicU64::new(1);

impl HostBrand {
    /// Mints a fresh, never-reused brand.
    pub fn fresh() -> Self {
        Self(NEXT_BRAND.fetch_add(1, Ordering::Relaxed))
    }
}

/// Symbolic description of an acceptable result, as written in a script's
/// `assert_return` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpR {
    Literal(ConstLit),
    NanCanon(NanWidth),
    NanArith(NanWidth),
}

/// Which float width an NaN predicate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NanWidth {
    S32,
    S64,
}

/// A value-constant as written in script source.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstLit {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    V128(u128),
    NullFunc,
    NullExtern,
    Extern(i32),
    /// Placeholder for constant forms the harness does not (yet) support.
    ///
    /// Matching against this variant must be a hard error, never a silent
    /// `false`: see [`crate::oracle::match1`].
    Unsupported,
}
