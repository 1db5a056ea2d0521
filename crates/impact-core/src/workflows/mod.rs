//! # Workflows Module
//!
//! Top-level procedures that drive a complete simulation through an engine session.
//!
//! - **Impact Workflow** ([`impact`]) - Fires a C60 projectile into a silicon slab, runs
//!   the dynamics, clusters the sputtered atoms, and pulls the cluster ids back.

pub mod impact;
