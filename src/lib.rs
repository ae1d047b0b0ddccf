//! # retrobasic
//!
//! A retro line-numbered BASIC: a single-pass compiler to stack-machine
//! bytecode and the VM that runs it.
//! ```text
//! RETRO BASIC
//! READY.
//! █
//! ```
//!
//! Programs are entered one numbered line at a time (or loaded from disk),
//! compiled as a whole on `RUN`, and executed against slot-addressed
//! variable stores. Graphics statements call out to a pluggable host; the
//! bundled driver runs headless.

#[macro_use]
pub mod lang;
pub mod host;
pub mod mach;
pub mod term;
