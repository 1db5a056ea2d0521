use serde::Serialize;
use std::collections::BTreeMap;

/// One connected component of sputtered atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub id: u64,
    pub size: usize,
}

/// Local digest of a per-atom cluster-id vector pulled back from the engine.
///
/// Atoms outside the clustered group carry id 0 and are not counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub total_atoms: usize,
    pub sputtered_atoms: usize,
    /// Largest first, ties broken by ascending id.
    pub clusters: Vec<Cluster>,
}

impl ClusterSummary {
    pub fn from_ids(ids: &[f64]) -> Self {
        let mut sizes: BTreeMap<u64, usize> = BTreeMap::new();
        for &raw in ids {
            if raw > 0.0 {
                *sizes.entry(raw.round() as u64).or_default() += 1;
            }
        }

        let mut clusters: Vec<Cluster> = sizes
            .into_iter()
            .map(|(id, size)| Cluster { id, size })
            .collect();
        clusters.sort_by(|a, b| b.size.cmp(&a.size).then(a.id.cmp(&b.id)));

        Self {
            total_atoms: ids.len(),
            sputtered_atoms: clusters.iter().map(|c| c.size).sum(),
            clusters,
        }
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn largest(&self) -> Option<&Cluster> {
        self.clusters.first()
    }
}
