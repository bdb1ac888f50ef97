#![deny(unsafe_code)]
#![warn(unsafe_op_in_unsafe_fn)]

//! Component-selection SAT core.
//!
//! Given a root requirement, a catalogue of candidate implementations per
//! interface (obtained through an external [`provider::ImplementationProvider`]),
//! and a scope already baked into that provider, [`driver::solve_for`] selects
//! a mutually consistent set of implementations -- one per participating
//! interface -- and renders the result as a selections document
//! (`selections::SelectionsDocument`).
//!
//! Feed parsing, ranking policy, and distribution integration are external
//! collaborators; this crate only consumes them through
//! [`provider::ImplementationProvider`] and the plain data in
//! [`model`]/[`provider::Requirements`].

pub mod assembly;
pub mod builder;
pub mod cache;
pub mod decider;
pub mod driver;
pub mod error;
pub mod model;
pub mod provider;
pub mod sat;
pub mod selections;

pub use driver::{solve_for, SolveResult};
pub use error::Error;
pub use provider::{derive_root, ImplementationProvider, Requirements, RootRequirement, Scope};

#[cfg(test)]
mod tests;
