use crate::core::errors::StateError;
use crate::core::{BlochState, QuantumChannel, sample_pole};
use crate::types::Pole;
use rand::Rng;
use std::collections::HashMap;

/// Measures many fresh copies of a Bloch state.
///
/// Each shot prepares the same state, optionally passes it through a channel,
/// and reads it in the pole basis. The original state is never touched, so
/// this is the statistical view of a register a host would get from planting
/// and harvesting the same crop many times.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    /// Optional single-register channel applied before each readout.
    pub channel: Option<QuantumChannel>,
}

impl Sampler {
    /// Creates a noise-free `Sampler`.
    pub fn new() -> Self {
        Self { channel: None }
    }

    /// Sets the channel applied before readout.
    pub fn with_channel(mut self, channel: QuantumChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Runs `num_shots` readouts of `state`.
    ///
    /// # Returns
    ///
    /// Counts per pole; poles that never came up are absent.
    pub fn run<R: Rng + ?Sized>(
        &self,
        state: &BlochState,
        num_shots: usize,
        rng: &mut R,
    ) -> Result<HashMap<Pole, usize>, StateError> {
        let mut prepared = *state;
        if let Some(chan) = &self.channel {
            prepared.apply_channel(chan)?;
        }

        // Every shot sees the same distribution, so draw against it directly
        let p_north = prepared.probability(Pole::North);
        let mut raw_counts = [0usize; 2];
        for _ in 0..num_shots {
            raw_counts[sample_pole(rng, p_north).index()] += 1;
        }

        let mut counts = HashMap::new();
        for (idx, &count) in raw_counts.iter().enumerate() {
            if count > 0 {
                counts.insert(Pole::from_index(idx), count);
            }
        }
        Ok(counts)
    }
}
