//! # Engine Module
//!
//! Everything between the orchestration procedure and the external simulation engine.
//!
//! ## Overview
//!
//! The engine itself is opaque: it accepts text commands, advances the simulation, and
//! hands back computed quantities on request. This module defines that contract and wraps
//! it in a scoped session that validates command ordering locally.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated run parameters and their builder
//! - **Engine contract** ([`driver`]) - The [`driver::Engine`] trait and extraction selectors
//! - **Session** ([`session`]) - Exclusive, scoped ownership of one engine plus the registry
//!   of names defined so far
//! - **Backends** ([`backend`]) - GPU / threaded CPU selection
//! - **Implementations** ([`process`], [`recorder`]) - A LAMMPS subprocess, and an in-memory
//!   recorder for script export and tests
//! - **Progress Monitoring** ([`progress`]) - Stage-level progress callbacks
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod backend;
pub mod config;
pub mod driver;
pub mod error;
pub mod process;
pub mod progress;
pub mod recorder;
pub mod session;
