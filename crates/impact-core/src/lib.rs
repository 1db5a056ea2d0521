//! # impactmd Core Library
//!
//! Configuration and command orchestration for C60-on-silicon sputtering simulations.
//! Every physical computation runs inside an external molecular-dynamics engine (LAMMPS);
//! this library decides what to tell it, in which order, and what to read back.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Typed engine commands and their rendering, the cluster
//!   digest, and file I/O (dump reading, script and report writing).
//!
//! - **[`engine`]: The Session Layer.** The `Engine` contract, the scoped `Session` that
//!   enforces defined-before-referenced ordering, the LAMMPS subprocess and the recording
//!   engine, backend selection, configuration, and progress reporting.
//!
//! - **[`workflows`]: The Public API.** The impact procedure that ties it all together.

pub mod core;
pub mod engine;
pub mod workflows;
