//! Reading and writing of engine-side files: text dumps produced by the engine, input
//! scripts for offline inspection, and the run report left next to the dumps.

pub mod dump;
pub mod report;
pub mod script;
