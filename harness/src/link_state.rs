//! The link state (§3) and the name resolver (§4.3).
//!
//! The backing interpreter (`wasmi`) already maintains a name → exports
//! registry inside its own [`wasmi::Linker`] (used to satisfy module
//! imports during instantiation). Rather than duplicate that map, this
//! module tracks only what the spec's link state needs beyond it: which
//! names are currently bound and which one was bound most recently
//! (`last`). Export lookup itself is delegated to `Linker::get`, exactly as
//! the teacher's own `WastRunner::get_export` does.

use std::collections::HashSet;

use wasmi::{AsContext, Func, Global, Linker, Store};

/// Identifies the runtime environment a module was instantiated into.
///
/// `wasmi` links every test module into a single shared [`wasmi::Store`]
/// for the lifetime of a run; cross-module calls and `spectest` wiring all
/// go through that one store, exactly as in the teacher's `WastRunner`. §3
/// allows for more than one environment; this backend only ever mints
/// [`EnvId::MAIN`], and every `Exports` entry always resolves to it, which
/// is what the §3 "every `env_id` referenced... exists in `envs`" invariant
/// demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(u32);

impl EnvId {
    pub const MAIN: EnvId = EnvId(0);
}

/// Registry of instantiated-module *names* and which one was last
/// installed (§3). Does not itself store exports; see the module doc.
#[derive(Debug, Clone, Default)]
pub struct LinkState {
    names: HashSet<String>,
    last: Option<String>,
}

/// Errors the resolver and registry can raise. These map directly onto
/// [`crate::error::ErrKind`] variants at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnboundLastModule,
    UnboundModule(String),
    UnboundName(String),
}

impl LinkState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `name` now names an instantiated module and marks it as
    /// the most recently instantiated one.
    pub fn mark_installed(&mut self, name: String) {
        self.names.insert(name.clone());
        self.last = Some(name);
    }

    /// Implements `Register`: aliases an existing name under a new one
    /// *without* creating a new environment or touching `last`. `mod_id =
    /// None` aliases the last instantiated module.
    ///
    /// The caller is responsible for performing the matching alias in the
    /// backing [`wasmi::Linker`] (`alias_module`/`instance`); this method
    /// only updates the bookkeeping the spec's `LinkState` model requires.
    pub fn register(&mut self, as_name: &str, mod_id: Option<&str>) -> Result<String, ResolveError> {
        let source = match mod_id {
            Some(id) => {
                if !self.names.contains(id) {
                    return Err(ResolveError::UnboundModule(id.to_string()));
                }
                id.to_string()
            }
            None => self.last.clone().ok_or(ResolveError::UnboundLastModule)?,
        };
        self.names.insert(as_name.to_string());
        Ok(source)
    }

    /// Returns the name of the last instantiated module, if any.
    pub fn last_name(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// True iff `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// All currently registered names, for diagnostics and the §8 invariant
    /// that every `Register`-ed name survives into the final link state.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    fn target_name<'a>(&'a self, mod_id: Option<&'a str>) -> Result<&'a str, ResolveError> {
        match mod_id {
            Some(id) => {
                if self.names.contains(id) {
                    Ok(id)
                } else {
                    Err(ResolveError::UnboundModule(id.to_string()))
                }
            }
            None => self.last.as_deref().ok_or(ResolveError::UnboundLastModule),
        }
    }

    /// `resolve_func` from §4.3.
    pub fn resolve_func(
        &self,
        store: &Store<()>,
        linker: &Linker<()>,
        mod_id: Option<&str>,
        name: &str,
    ) -> Result<(Func, EnvId), ResolveError> {
        let module_name = self.target_name(mod_id)?;
        let export = linker
            .get(store.as_context(), module_name, name)
            .ok_or_else(|| ResolveError::UnboundName(name.to_string()))?;
        let func = export
            .into_func()
            .ok_or_else(|| ResolveError::UnboundName(name.to_string()))?;
        Ok((func, EnvId::MAIN))
    }

    /// `resolve_global` from §4.3.
    pub fn resolve_global(
        &self,
        store: &Store<()>,
        linker: &Linker<()>,
        mod_id: Option<&str>,
        name: &str,
    ) -> Result<Global, ResolveError> {
        let module_name = self.target_name(mod_id)?;
        let export = linker
            .get(store.as_context(), module_name, name)
            .ok_or_else(|| ResolveError::UnboundName(name.to_string()))?;
        export
            .into_global()
            .ok_or_else(|| ResolveError::UnboundName(name.to_string()))
    }
}

impl From<ResolveError> for crate::error::ErrKind {
    fn from(error: ResolveError) -> Self {
        use crate::error::ErrKind;
        match error {
            ResolveError::UnboundLastModule => ErrKind::UnboundLastModule,
            ResolveError::UnboundModule(id) => ErrKind::UnboundModule(id),
            ResolveError::UnboundName(name) => ErrKind::UnboundName(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_last_module_before_any_install() {
        let ls = LinkState::new();
        assert_eq!(
            ls.register("alias", None).unwrap_err(),
            ResolveError::UnboundLastModule
        );
    }

    #[test]
    fn unbound_module_for_unknown_id() {
        let ls = LinkState::new();
        assert_eq!(
            ls.register("alias", Some("missing")).unwrap_err(),
            ResolveError::UnboundModule("missing".to_string())
        );
    }

    #[test]
    fn register_aliases_last_module() {
        let mut ls = LinkState::new();
        ls.mark_installed("m1".to_string());
        let source = ls.register("m1_alias", None).unwrap();
        assert_eq!(source, "m1");
        assert!(ls.contains("m1_alias"));
    }

    #[test]
    fn register_with_explicit_id_does_not_require_last() {
        let mut ls = LinkState::new();
        ls.mark_installed("m1".to_string());
        let source = ls.register("alias", Some("m1")).unwrap();
        assert_eq!(source, "m1");
        assert!(ls.contains("alias"));
    }
}
