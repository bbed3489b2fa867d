use serde::Serialize;

/// Fixed topology over the resource index space: each node neighbors the
/// slots one step sideways and one row (six slots) up or down.
pub const NEIGHBOR_OFFSETS: [i64; 4] = [-6, -1, 1, 6];

/// Indices of a node's topological neighbors within a space of `len` nodes.
pub fn neighbor_indices(index: usize, len: usize) -> Vec<usize> {
    NEIGHBOR_OFFSETS
        .iter()
        .filter_map(|&offset| {
            let candidate = index as i64 + offset;
            if candidate >= 0 && (candidate as usize) < len {
                Some(candidate as usize)
            } else {
                None
            }
        })
        .collect()
}

/// Result of one energy distribution attempt. Failures carry no partial
/// effect: either every neighbor received its share or nothing moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyOutcome {
    Distributed {
        per_neighbor: f64,
        neighbors: Vec<String>,
    },
    InsufficientEnergy {
        available: f64,
        requested: f64,
    },
    NoNeighbors,
}
