//! # Core Module
//!
//! Stateless building blocks shared by the engine and workflow layers.
//!
//! - **Commands** ([`command`], [`value`]) - The closed set of typed engine directives and
//!   the argument values they carry. Rendering a command is the only place engine grammar
//!   is produced.
//! - **Cluster analysis** ([`cluster`]) - Local digest of per-atom cluster ids extracted
//!   from the engine.
//! - **I/O** ([`io`]) - Text dump reader, input-script writer, and run report writers.

pub mod cluster;
pub mod command;
pub mod io;
pub mod value;
