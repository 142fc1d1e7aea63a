//! Crucible execution engine.
//!
//! Accepts untrusted source code, runs it outside this process with a
//! wall-clock budget, and optionally scores it against test cases. The
//! layering mirrors the responsibility split it enforces:
//!
//! - [`process`] spawns toolchain processes and captures output
//! - [`languages`] knows how each language becomes a runnable artifact
//! - [`harness`] synthesizes per-test wrapper programs and scores them
//! - [`executor`] is the single public entry point and owns cleanup
//!
//! The engine never touches a database or the network; the temp filesystem,
//! partitioned per attempt, is its only shared resource.

pub mod config;
pub mod executor;
pub mod harness;
pub mod languages;
pub mod process;
mod scratch;

pub use config::ExecLimits;
pub use executor::Executor;
pub use languages::LanguageRegistry;
