use std::path::PathBuf;

use serde::Serialize;
use storesweep_env::{EnvironmentFactory as _, GasStorageEnv, RewardWeights};
use storesweep_stats::descriptive::DescriptiveStats;
use storesweep_sweep::evaluate::evaluate;
use storesweep_training::policy::FixedDummyPolicy;
use tracing::info;

use super::inspect::EpisodeSummary;
use crate::{config::AppConfig, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct BaselineArg {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write the evaluation summary as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Evaluation of the fixed baseline policy, outside of any sweep grid.
#[derive(Debug, Clone, Serialize)]
struct BaselineSummary {
    policy: &'static str,
    reward_weights: RewardWeights,
    #[serde(flatten)]
    episode: EpisodeSummary,
}

/// Full inflow, idle, then half of the maximum outflow, repeated.
fn baseline_policy() -> FixedDummyPolicy {
    FixedDummyPolicy::new(vec![
        GasStorageEnv::MAX_STORAGE_MDOT_KG_PER_S,
        0.0,
        GasStorageEnv::MIN_STORAGE_MDOT_KG_PER_S / 2.0,
    ])
}

pub(crate) fn run(arg: &BaselineArg) -> anyhow::Result<()> {
    let config = AppConfig::load(arg.config.as_deref())?;
    let weights = RewardWeights::equal();
    let mut env = config.environment.build(weights);
    let result = evaluate(&mut env, &baseline_policy());

    if let Some(stats) = DescriptiveStats::new(result.rewards.iter().copied()) {
        info!(
            steps = stats.count,
            total = stats.total,
            mean = stats.mean,
            min = stats.min,
            max = stats.max,
            "baseline rewards"
        );
    }
    if arg.output.is_some() {
        let summary = BaselineSummary {
            policy: "fixed_dummy",
            reward_weights: weights,
            episode: EpisodeSummary::new(&result),
        };
        Output::save_json(&summary, arg.output.as_deref())?;
    }
    Ok(())
}
