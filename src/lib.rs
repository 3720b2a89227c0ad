//! # Piecework
//!
//! A durable-queue worker-pool scheduler that executes untrusted, per-task
//! logic in isolated OS processes.
//!
//! A single-threaded dispatcher (the boss) owns a fixed array of worker
//! slots. Every tick it reaps finished worker processes without blocking,
//! finalizes their queue entries, claims new work for empty slots with a
//! compare-and-swap state transition, and spawns a sandboxed worker process
//! per claimed entry. Workers apply hard resource ceilings to themselves
//! before running any task code, so a runaway task dies with a typed exit
//! code instead of taking the host down.
//!
//! ## Core Problem Solved
//!
//! Task logic here is untrusted: group rule scripts and external delivery
//! transports can loop, over-allocate, or crash. The scheduler must:
//!
//! - **Claim exactly once**: concurrent dispatchers race on the same table;
//!   a conditional update decides the winner, never a held lock
//! - **Stay fair**: one busy work-group must not monopolize the pool
//!   (anti-affinity selection over a bounded lookahead window)
//! - **Contain damage**: CPU, memory, file-size, file-count, process-count,
//!   and core-dump ceilings are enforced by the OS, and each violation maps
//!   to a distinct exit code
//! - **Never leak state**: a worker that segfaults or is killed still drives
//!   its queue entry to DONE on the next reap tick
//!
//! ## Queue state machine
//!
//! `JUSTIN (1) → PROCESSING (2) → DONE (3)`, monotonic. Entries are created
//! by external producers, claimed by exactly one dispatcher, and finalized
//! DONE on every worker outcome: success and failure are both terminal.
//!
//! ## Example
//!
//! ```rust,ignore
//! use piecework::builders::build_daemon;
//! use piecework::config::DaemonConfig;
//!
//! // The launcher re-invokes the current executable in worker mode; the
//! // worker process connects its own store, enters the sandbox, runs the
//! // delivery function, and exits with a typed code.
//! let mut dispatcher = build_daemon(DaemonConfig::delivery_defaults())?;
//! dispatcher.run(); // never returns
//! ```
//!
//! For complete examples, see:
//! - `tests/dispatcher_test.rs` - Full dispatcher loop integration tests
//! - `src/bin/rulerunnerd.rs`, `src/bin/deliveryd.rs` - Daemon binaries

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: entries, outcomes, the dispatcher loop.
pub mod core;
/// Configuration models for daemons, stores, transports, and privileges.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// Infrastructure adapters for queue stores and work-item sources.
pub mod infra;
/// Process-level runtime: worker spawning and exit polling.
pub mod runtime;
/// Resource sandbox: ceilings, fault-signal mapping, privilege drop.
pub mod sandbox;
/// Concrete worker functions: rule execution and outbound delivery.
pub mod workers;
/// Shared utilities.
pub mod util;
