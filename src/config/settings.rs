// src/config/settings.rs - Solver settings for standalone and service use

use crate::cuckoo::SolverMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Main configuration settings for the solver
pub struct Settings {
    /// log2 of nodes per graph partition side
    pub edge_bits: u32,
    /// Required cycle length for a valid proof
    pub proof_size: usize,
    /// Partitioning bits for the trim passes (0 = no partitioning)
    pub part_bits: u32,
    /// Number of worker threads per solve
    pub nthreads: usize,
    /// Number of trim rounds; None picks the default for `part_bits`
    pub ntrims: Option<u32>,
    /// Maximum solutions recorded per solve
    pub maxsols: usize,
    /// Trimming solver or the direct-map variant
    pub mode: SolverMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            edge_bits: 27,
            proof_size: 42,
            part_bits: 0,    // fastest; raising it halves node memory per pass
            nthreads: 4,
            ntrims: None,    // 7 rounds at part_bits = 0
            maxsols: 8,
            mode: SolverMode::Trimming,
        }
    }
}

impl Settings {
    /// Trim rounds to run: the configured count, or the default formula
    pub fn trim_rounds(&self) -> u32 {
        self.ntrims
            .unwrap_or(1 + (self.part_bits + 3) * (self.part_bits + 4) / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trim_rounds() {
        let settings = Settings::default();
        assert_eq!(settings.trim_rounds(), 7);

        let partitioned = Settings {
            part_bits: 1,
            ..Settings::default()
        };
        assert_eq!(partitioned.trim_rounds(), 11);
    }

    #[test]
    fn explicit_trim_rounds_win() {
        let settings = Settings {
            ntrims: Some(3),
            ..Settings::default()
        };
        assert_eq!(settings.trim_rounds(), 3);
    }
}
