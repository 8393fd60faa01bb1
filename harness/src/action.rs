//! The action executor (§4.4): translates `invoke` and `get` actions into
//! calls on the backing `wasmi` runtime.

use wasmi::{ExternRef, Func, Global, Linker, Ref, Store, Val, F32, F64};

use crate::{
    error::ErrKind,
    link_state::LinkState,
    value::{ConstLit, ExternPayload, FuncId, HostBrand, RefValue, V},
};

/// An action as written in a script: either a function invocation or a
/// global read.
#[derive(Debug, Clone)]
pub enum Action {
    Invoke {
        mod_id: Option<String>,
        name: String,
        args: Vec<ConstLit>,
    },
    Get {
        mod_id: Option<String>,
        name: String,
    },
}

/// Converts a script-level constant into a runtime [`Val`], minting a
/// fresh host-branded externref payload for `Const_extern` forms.
///
/// # Panics
///
/// Panics on [`ConstLit::Unsupported`], mirroring the oracle's exhaustiveness
/// posture (§9): an unrecognized constant form is a hard implementation
/// error, not something to silently default away.
pub fn value_of_const(store: &mut Store<()>, host_brand: HostBrand, lit: &ConstLit) -> Val {
    match lit {
        ConstLit::Unsupported => panic!("encountered unsupported constant literal"),
        ConstLit::I32(n) => Val::I32(*n),
        ConstLit::I64(n) => Val::I64(*n),
        ConstLit::F32(n) => Val::F32(F32::from_bits(n.to_bits())),
        ConstLit::F64(n) => Val::F64(F64::from_bits(n.to_bits())),
        ConstLit::V128(n) => Val::V128((*n).into()),
        ConstLit::NullFunc => Val::FuncRef(<Ref<Func>>::Null),
        ConstLit::NullExtern => Val::ExternRef(<Ref<ExternRef>>::Null),
        ConstLit::Extern(payload) => {
            let branded = ExternPayload {
                brand: host_brand,
                payload: *payload,
            };
            Val::from(ExternRef::new(store, branded))
        }
    }
}

/// Converts a produced [`Val`] back into the harness's value model,
/// reading through `store` to recover branded externref payloads.
pub fn value_from_runtime(store: &Store<()>, val: &Val) -> V {
    match val {
        Val::I32(n) => V::I32(*n),
        Val::I64(n) => V::I64(*n),
        Val::F32(f) => V::F32(f32::from_bits(f.to_bits())),
        Val::F64(f) => V::F64(f64::from_bits(f.to_bits())),
        Val::V128(v) => V::V128(v.as_u128()),
        Val::FuncRef(func_ref) => {
            let id = match func_ref {
                Ref::Null => None,
                Ref::Val(func) => Some(FuncId(func_id(func))),
            };
            V::Ref(RefValue::FuncRef(id))
        }
        Val::ExternRef(extern_ref) => {
            let payload = match extern_ref {
                Ref::Null => None,
                Ref::Val(data) => data
                    .data(store)
                    .downcast_ref::<ExternPayload>()
                    .copied(),
            };
            V::Ref(RefValue::ExternRef(payload))
        }
    }
}

/// Returns a stable opaque identity for a [`Func`] handle.
///
/// `wasmi::Func` does not expose its arena index publicly, so we round-trip
/// through `Debug` formatting: the harness only ever needs function
/// identity to decide null-vs-non-null, never to compare two distinct
/// non-null functions for equality.
fn func_id(func: &Func) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    format!("{func:?}").hash(&mut hasher);
    hasher.finish()
}

/// Executes `action` against `ls`.
///
/// §4.1/§4.4 describe the reference interpreter's explicit operand stack,
/// where arguments must be pushed in reverse and results popped in reverse
/// to recover source order. `wasmi::Func::call` already takes parameters
/// and returns results in ordinary left-to-right declaration order, so both
/// reversals are no-ops at this boundary and are intentionally not
/// performed here; see `DESIGN.md`.
pub fn execute(
    store: &mut Store<()>,
    linker: &Linker<()>,
    host_brand: HostBrand,
    ls: &LinkState,
    action: &Action,
) -> Result<Vec<V>, ErrKind> {
    match action {
        Action::Invoke {
            mod_id,
            name,
            args,
        } => invoke(store, linker, host_brand, ls, mod_id.as_deref(), name, args),
        Action::Get { mod_id, name } => {
            let value = get_global(store, linker, ls, mod_id.as_deref(), name)?;
            Ok(vec![value])
        }
    }
}

fn invoke(
    store: &mut Store<()>,
    linker: &Linker<()>,
    host_brand: HostBrand,
    ls: &LinkState,
    mod_id: Option<&str>,
    name: &str,
    args: &[ConstLit],
) -> Result<Vec<V>, ErrKind> {
    let (func, _env) = ls.resolve_func(store, linker, mod_id, name)?;
    let params: Vec<Val> = args
        .iter()
        .map(|arg| value_of_const(store, host_brand, arg))
        .collect();
    let ty = func.ty(&*store);
    let mut results = vec![Val::I32(0); ty.results().len()];
    func.call(&mut *store, &params, &mut results)
        .map_err(|error| ErrKind::Msg(error.to_string()))?;
    Ok(results
        .iter()
        .map(|val| value_from_runtime(store, val))
        .collect())
}

fn get_global(
    store: &Store<()>,
    linker: &Linker<()>,
    ls: &LinkState,
    mod_id: Option<&str>,
    name: &str,
) -> Result<V, ErrKind> {
    let global: Global = ls.resolve_global(store, linker, mod_id, name)?;
    let value = global.get(store);
    Ok(value_from_runtime(store, &value))
}
