//! Reusable observers for trajopt solvers.
//!
//! This crate provides [`Observer`] implementations and capability traits that
//! work across solvers whose events expose the values an observer needs.
//!
//! # Modules
//!
//! - [`traits`] — Capability traits for cross-solver observers
//!   ([`HasIteration`], [`HasObjective`], [`HasConstraintViolation`],
//!   [`CanStopEarly`])
//!
//! # Observers
//!
//! - [`TracingObserver`] — logs iterates as `tracing` events
//! - [`Recorder`] — keeps the convergence history of a solve
//! - [`Deadline`] — cancels a solve after a wall-clock budget
//!
//! [`Observer`]: trajopt_core::Observer
//! [`HasIteration`]: traits::HasIteration
//! [`HasObjective`]: traits::HasObjective
//! [`HasConstraintViolation`]: traits::HasConstraintViolation
//! [`CanStopEarly`]: traits::CanStopEarly

pub mod traits;

mod deadline;
mod logging;
mod recorder;

pub use deadline::Deadline;
pub use logging::TracingObserver;
pub use recorder::{Record, Recorder};
