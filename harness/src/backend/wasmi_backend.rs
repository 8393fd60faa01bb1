//! The concrete backend (§6, §10.1): wires the harness core to a real
//! `wasmi` interpreter/compiler/validator/linker and a real `wast` parser.
//!
//! Grounded directly on the teacher's own spec-test driver
//! (`crates/wast/src/lib.rs`'s `WastRunner`): one shared [`wasmi::Store`]
//! and [`wasmi::Linker`] for the lifetime of a run, a side-table of
//! *defined-but-not-yet-instantiated* modules for the two-phase
//! `ModuleDefinition`/`ModuleInstance` directives, and a `spectest` host
//! module wired up the same way.

use std::collections::HashMap;

use wasmi::{
    Config, Engine, Global, Memory, MemoryType, Module, Mutability, Store, Table, TableType,
    Val, ValType, F32, F64,
};
use wasmi::Linker;
use wast::{lexer::Lexer, parser::ParseBuffer, QuoteWat, Wast, WastDirective, WastExecute, Wat};

use crate::{
    action::{self, Action},
    backend::convert,
    error::ErrKind,
    link_state::LinkState,
    value::{ConstLit, HostBrand, V},
};

/// Runs one script against a fresh `wasmi` store and linker.
///
/// Holds exactly the state the teacher's `WastRunner` holds: the shared
/// store/linker, a table of named-but-not-instantiated module definitions
/// (for `ModuleDefinition`/`ModuleInstance`), and the §4.5 bookkeeping
/// (`curr_module`, `no_exhaustion`). Unlike the teacher, there is no
/// separate `current: Option<Instance>` field: every instantiated module,
/// named or not, is registered into the linker under a name (synthesizing
/// one for anonymous modules), so [`LinkState::last_name`] alone is enough
/// to recover "the last instantiated module" without a parallel handle.
pub struct Driver {
    linker: Linker<()>,
    store: Store<()>,
    module_defs: HashMap<String, Module>,
    ls: LinkState,
    host_brand: HostBrand,
    curr_module: u64,
    no_exhaustion: bool,
}

impl Driver {
    /// Creates a driver with a fresh engine/store/linker, per `config`.
    pub fn new(config: &Config, no_exhaustion: bool) -> Self {
        let engine = Engine::new(config);
        let mut linker = Linker::new(&engine);
        linker.allow_shadowing(true);
        let store = Store::new(&engine, ());
        Driver {
            linker,
            store,
            module_defs: HashMap::new(),
            ls: LinkState::new(),
            host_brand: HostBrand::fresh(),
            curr_module: 0,
            no_exhaustion,
        }
    }

    /// Installs the standard `spectest` host fixture (§4.5 initialization,
    /// step b) under `module_name`. Called once for `"spectest"` and once
    /// for `"spectest_extern"`: the source script distinguishes the two
    /// names, but this harness has no grounded evidence of a host surface
    /// beyond the one standard fixture, so both names are backed by the
    /// same definitions (see `DESIGN.md`).
    ///
    /// Grounded on the teacher's `WastRunner::register_spectest`.
    pub fn register_spectest(&mut self, module_name: &str) -> Result<(), ErrKind> {
        let store = &mut self.store;
        let memory = Memory::new(&mut *store, MemoryType::new(1, Some(2)))
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        let table = Table::new(
            &mut *store,
            TableType::new(ValType::FuncRef, 10, Some(20)),
            Val::default(ValType::FuncRef),
        )
        .map_err(|e| ErrKind::Msg(e.to_string()))?;
        let table64 = Table::new(
            &mut *store,
            TableType::new64(ValType::FuncRef, 0, None),
            Val::default(ValType::FuncRef),
        )
        .map_err(|e| ErrKind::Msg(e.to_string()))?;
        let global_i32 = Global::new(&mut *store, Val::I32(666), Mutability::Const);
        let global_i64 = Global::new(&mut *store, Val::I64(666), Mutability::Const);
        let global_f32 = Global::new(
            &mut *store,
            Val::F32(F32::from_bits(0x4426_a666)),
            Mutability::Const,
        );
        let global_f64 = Global::new(
            &mut *store,
            Val::F64(F64::from_bits(0x4084_d4cc_cccc_cccd)),
            Mutability::Const,
        );

        self.linker
            .define(module_name, "memory", memory)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .define(module_name, "table", table)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .define(module_name, "table64", table64)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .define(module_name, "global_i32", global_i32)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .define(module_name, "global_i64", global_i64)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .define(module_name, "global_f32", global_f32)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .define(module_name, "global_f64", global_f64)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;

        self.linker
            .func_wrap(module_name, "print", || {
                log::info!("spectest print");
            })
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .func_wrap(module_name, "print_i32", |value: i32| {
                log::info!("spectest print: {value}");
            })
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .func_wrap(module_name, "print_i64", |value: i64| {
                log::info!("spectest print: {value}");
            })
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .func_wrap(module_name, "print_f32", |value: F32| {
                log::info!("spectest print: {value:?}");
            })
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .func_wrap(module_name, "print_f64", |value: F64| {
                log::info!("spectest print: {value:?}");
            })
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .func_wrap(module_name, "print_i32_f32", |v0: i32, v1: F32| {
                log::info!("spectest print: {v0:?} {v1:?}");
            })
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.linker
            .func_wrap(module_name, "print_f64_f64", |v0: F64, v1: F64| {
                log::info!("spectest print: {v0:?} {v1:?}");
            })
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.ls.mark_installed(module_name.to_string());
        Ok(())
    }

    /// The current link state, for callers assembling a final report.
    pub fn link_state(&self) -> &LinkState {
        &self.ls
    }

    /// Processes every directive of `wast`, per §4.5.
    ///
    /// §4.5's initialization step (a), installing `spectest_extern`, and
    /// step (b), registering `spectest` before the user script runs, are
    /// the caller's responsibility (see [`crate::run`]/[`crate::exec`]):
    /// this method only folds the given directives over the current state.
    pub fn process_script(&mut self, filename: &str, wast: &str) -> Result<(), ErrKind> {
        let mut lexer = Lexer::new(wast);
        lexer.allow_confusing_unicode(true);
        let enhance = |mut err: wast::Error| -> ErrKind {
            err.set_path(filename.as_ref());
            err.set_text(wast);
            ErrKind::ParseFail(err.to_string())
        };
        let buffer = ParseBuffer::new_with_lexer(lexer).map_err(enhance)?;
        let directives = wast::parser::parse::<Wast>(&buffer)
            .map_err(enhance)?
            .directives;
        for directive in directives {
            self.process_directive(directive)?;
        }
        Ok(())
    }

    fn process_directive(&mut self, directive: WastDirective) -> Result<(), ErrKind> {
        match directive {
            #[rustfmt::skip]
            WastDirective::Module(
                | module @ QuoteWat::Wat(Wat::Module(_))
                | module @ QuoteWat::QuoteModule { .. },
            ) => {
                let (name, module) = self.module_definition(module)?;
                self.module(name.as_deref(), &module)?;
            }
            #[rustfmt::skip]
            WastDirective::ModuleDefinition(
                | module @ QuoteWat::Wat(Wat::Module(_))
                | module @ QuoteWat::QuoteModule { .. },
            ) => {
                let (name, module) = self.module_definition(module)?;
                if let Some(name) = name {
                    self.module_defs.insert(name, module);
                }
            }
            WastDirective::ModuleInstance {
                instance, module, ..
            } => {
                let module = module
                    .and_then(|id| self.module_defs.get(id.name()))
                    .cloned()
                    .ok_or_else(|| ErrKind::Msg("missing module definition".to_string()))?;
                self.module(instance.map(|id| id.name()), &module)?;
            }
            WastDirective::Register { name, module, .. } => {
                self.register(name, module.map(|id| id.name().to_string()))?;
            }
            WastDirective::Invoke(invoke) => {
                let action = self.invoke_action(&invoke)?;
                action::execute(&mut self.store, &self.linker, self.host_brand, &self.ls, &action)?;
            }
            #[rustfmt::skip]
            WastDirective::AssertInvalid {
                module:
                    | module @ QuoteWat::Wat(Wat::Module(_))
                    | module @ QuoteWat::QuoteModule { .. },
                message,
                ..
            } => {
                crate::error::check_error_result(message, self.module_definition(module).map(|_| ()))?;
            }
            WastDirective::AssertMalformed {
                module: module @ QuoteWat::Wat(Wat::Module(_)),
                message,
                ..
            } => {
                crate::error::check_error_result(message, self.module_definition(module).map(|_| ()))?;
            }
            WastDirective::AssertMalformed {
                module: QuoteWat::QuoteModule { .. },
                ..
            } => {
                // A quoted module can be malformed as raw text in ways the
                // encoder never reaches (e.g. bad UTF-8 in a `(module
                // quote ...)` literal). The teacher's own runner treats
                // this case as already covered by the parser that produced
                // the directive itself and skips it.
            }
            WastDirective::AssertUnlinkable {
                module: module @ Wat::Module(_),
                message,
                ..
            } => {
                let (name, module) = self.module_definition(QuoteWat::Wat(module))?;
                crate::error::check_error_result(message, self.module(name.as_deref(), &module))?;
            }
            WastDirective::AssertTrap { exec, message, .. } => {
                match self.execute_wast_execute(exec) {
                    Ok(_) => return Err(ErrKind::DidNotFailButExpected(message.to_string())),
                    Err(error) => {
                        crate::error::check_error_result(message, Err::<(), _>(error))?;
                    }
                }
            }
            WastDirective::AssertReturn {
                exec, results, ..
            } => {
                let produced = self.execute_wast_execute(exec)?;
                self.assert_results(&produced, &results)?;
            }
            WastDirective::AssertExhaustion { call, message, .. } => {
                if self.no_exhaustion {
                    return Ok(());
                }
                let action = self.invoke_action(&call)?;
                let result = action::execute(
                    &mut self.store,
                    &self.linker,
                    self.host_brand,
                    &self.ls,
                    &action,
                );
                match result {
                    Ok(_) => return Err(ErrKind::DidNotFailButExpected(message.to_string())),
                    Err(error) => {
                        crate::error::check_error_result(message, Err::<(), _>(error))?;
                    }
                }
            }
            unsupported => {
                return Err(ErrKind::Msg(format!(
                    "encountered unsupported Wast directive: {unsupported:?}"
                )))
            }
        }
        Ok(())
    }

    /// Instantiates `module`, binding it into the linker under `name`
    /// (synthesizing one if absent), and marks it installed in the link
    /// state. §4.5's `curr_module` counts every attempt, successful or not.
    fn module(&mut self, name: Option<&str>, module: &Module) -> Result<(), ErrKind> {
        self.curr_module += 1;
        let instance = self
            .linker
            .instantiate_and_start(&mut self.store, module)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        let bound_name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("__anon_module_{}", self.curr_module));
        self.linker
            .instance(&mut self.store, &bound_name, instance)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        self.ls.mark_installed(bound_name);
        Ok(())
    }

    /// Compiles `wat` to a [`Module`], per the `Parser`/`Compiler`
    /// capability contracts (§6). Returns the module's declared name, if
    /// any.
    fn module_definition(&mut self, mut wat: QuoteWat<'_>) -> Result<(Option<String>, Module), ErrKind> {
        let name = wat.name().map(|id| id.name().to_string());
        let bytes = wat
            .encode()
            .map_err(|e| ErrKind::ParseFail(e.to_string()))?;
        let module = Module::new(self.store.engine(), &bytes[..])
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        Ok((name, module))
    }

    /// Implements `Register` (§4.3/§4.5): aliases an existing module under
    /// a new name without creating a new environment.
    fn register(&mut self, as_name: &str, mod_id: Option<String>) -> Result<(), ErrKind> {
        let source = self.ls.register(as_name, mod_id.as_deref())?;
        self.linker
            .alias_module(&source, as_name)
            .map_err(|e| ErrKind::Msg(e.to_string()))?;
        Ok(())
    }

    fn execute_wast_execute(&mut self, exec: WastExecute<'_>) -> Result<Vec<V>, ErrKind> {
        match exec {
            WastExecute::Invoke(invoke) => {
                let action = self.invoke_action(&invoke)?;
                action::execute(&mut self.store, &self.linker, self.host_brand, &self.ls, &action)
            }
            WastExecute::Wat(Wat::Module(module)) => {
                let (_name, module) = self.module_definition(QuoteWat::Wat(Wat::Module(module)))?;
                self.module(None, &module)?;
                Ok(Vec::new())
            }
            WastExecute::Get { module, global, .. } => {
                let action = Action::Get {
                    mod_id: module.map(|id| id.name().to_string()),
                    name: global.to_string(),
                };
                action::execute(&mut self.store, &self.linker, self.host_brand, &self.ls, &action)
            }
            other => Err(ErrKind::Msg(format!(
                "encountered unsupported execution directive: {other:?}"
            ))),
        }
    }

    fn invoke_action(&self, invoke: &wast::WastInvoke<'_>) -> Result<Action, ErrKind> {
        let args = invoke
            .args
            .iter()
            .map(|arg| match arg {
                wast::WastArg::Core(core) => Ok(convert::arg_to_const(core)),
                other => Err(ErrKind::Msg(format!(
                    "encountered unsupported Wast argument: {other:?}"
                ))),
            })
            .collect::<Result<Vec<ConstLit>, ErrKind>>()?;
        Ok(Action::Invoke {
            mod_id: invoke.module.map(|id| id.name().to_string()),
            name: invoke.name.to_string(),
            args,
        })
    }

    fn assert_results(&self, produced: &[V], expected: &[wast::WastRet<'_>]) -> Result<(), ErrKind> {
        if produced.len() != expected.len() {
            return Err(ErrKind::BadResult);
        }
        for (value, expected) in produced.iter().zip(expected) {
            let wast::WastRet::Core(expected) = expected else {
                return Err(ErrKind::Msg(format!(
                    "encountered unsupported Wast result: {expected:?}"
                )));
            };
            if !convert::result_matches(self.host_brand, value, expected) {
                return Err(ErrKind::BadResult);
            }
        }
        Ok(())
    }
}
