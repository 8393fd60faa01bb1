//! Concrete backends implementing the §6 capability contracts.
//!
//! The harness core (`error`, `oracle`, `link_state`, `action`) never
//! depends on a concrete Wasm toolkit. This module is where that
//! abstraction is discharged: [`wasmi_backend`] wires the core up to the
//! real `wasmi` interpreter and the real `wast` parser, the same pairing
//! the teacher codebase uses for its own spec-test driver.

pub mod convert;
pub mod wasmi_backend;

pub use wasmi_backend::Driver;
