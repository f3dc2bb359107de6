//! Configuration types deserialized from `tempo.toml`.

use serde::Deserialize;

/// The top-level scheduler configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SchedConfig {
    /// Settings for the one-shot schedule build.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Settings for the per-cycle tick driver.
    #[serde(default)]
    pub sim: SimConfig,
}

/// Settings for the schedule build pipeline.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Upper bound on traced trial orders per candidate cycle.
    ///
    /// `0` means one trial per block in the cycle, i.e. every rotation of
    /// the registration order.
    #[serde(default)]
    pub max_trials: usize,
    /// How a combinational block that reads its own output is reported.
    #[serde(default)]
    pub self_loop: SelfLoopPolicy,
}

impl ScheduleConfig {
    /// Returns the number of trials to run for a cycle of `scc_len` blocks.
    pub fn trials_for(&self, scc_len: usize) -> usize {
        if self.max_trials == 0 {
            scc_len
        } else {
            self.max_trials.min(scc_len)
        }
    }
}

/// Reporting policy for combinational self-dependencies.
///
/// Self-edges are always dropped before cycle analysis; this only controls
/// whether a warning is emitted.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelfLoopPolicy {
    /// Drop the self-edge silently.
    Allow,
    /// Drop the self-edge and emit a warning (default).
    #[default]
    Warn,
}

/// Settings for the tick driver.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// When staged sequential writes become visible.
    #[serde(default)]
    pub commit: CommitPolicy,
    /// Cycle budget for `run_until`.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u64,
    /// Number of cycles the reset variable is held high by `sim_reset`.
    #[serde(default = "default_reset_cycles")]
    pub reset_cycles: u64,
}

fn default_max_cycles() -> u64 {
    5000
}

fn default_reset_cycles() -> u64 {
    2
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            commit: CommitPolicy::default(),
            max_cycles: default_max_cycles(),
            reset_cycles: default_reset_cycles(),
        }
    }
}

/// Commit point for staged sequential writes.
///
/// Whichever policy is chosen applies to every sequential block in the
/// schedule.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPolicy {
    /// All staged writes are committed together after the last block of the
    /// cycle has run (default).
    #[default]
    EndOfCycle,
    /// Each sequential block commits its own staged writes immediately after
    /// it finishes executing.
    PerBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SchedConfig::default();
        assert_eq!(config.schedule.max_trials, 0);
        assert_eq!(config.schedule.self_loop, SelfLoopPolicy::Warn);
        assert_eq!(config.sim.commit, CommitPolicy::EndOfCycle);
        assert_eq!(config.sim.max_cycles, 5000);
        assert_eq!(config.sim.reset_cycles, 2);
    }

    #[test]
    fn trials_default_to_scc_size() {
        let config = ScheduleConfig::default();
        assert_eq!(config.trials_for(4), 4);
    }

    #[test]
    fn trials_are_capped() {
        let config = ScheduleConfig {
            max_trials: 2,
            ..ScheduleConfig::default()
        };
        assert_eq!(config.trials_for(5), 2);
        assert_eq!(config.trials_for(1), 1);
    }
}
