use crate::core::cluster::ClusterSummary;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Writes one `cluster_id,size` row per cluster, largest first.
pub fn write_cluster_table(
    summary: &ClusterSummary,
    writer: impl Write,
) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["cluster_id", "size"])?;
    for cluster in &summary.clusters {
        wtr.write_record([cluster.id.to_string(), cluster.size.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_cluster_table_to_path(
    summary: &ClusterSummary,
    path: &Path,
) -> Result<(), ReportError> {
    write_cluster_table(summary, File::create(path)?)
}

pub fn write_summary<T: Serialize>(report: &T, writer: &mut impl Write) -> Result<(), ReportError> {
    let text = toml::to_string_pretty(report)?;
    writer.write_all(text.as_bytes())?;
    Ok(())
}

pub fn write_summary_to_path<T: Serialize>(report: &T, path: &Path) -> Result<(), ReportError> {
    write_summary(report, &mut File::create(path)?)
}
