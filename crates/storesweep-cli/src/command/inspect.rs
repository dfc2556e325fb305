use std::path::PathBuf;

use anyhow::Context as _;
use serde::Serialize;
use storesweep_stats::descriptive::DescriptiveStats;
use storesweep_sweep::{
    aggregate::AggregatedResults, archive::read_archive, evaluate::EvaluationResult,
    grid::WeightKey,
};
use storesweep_training::algorithm::Algorithm;

use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    /// Archive written by `run` (`<algorithm>_prepared_plot_data.json.gz`)
    archive: PathBuf,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Compact view of an archive, without frames and diagnostic series.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ArchiveSummary {
    pub(crate) algorithm: Algorithm,
    pub(crate) points: Vec<PointSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PointSummary {
    pub(crate) weights: WeightKey,
    #[serde(flatten)]
    pub(crate) episode: EpisodeSummary,
}

/// Figures of one evaluated episode.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EpisodeSummary {
    pub(crate) steps: usize,
    pub(crate) total_reward: f64,
    pub(crate) reward_stats: Option<DescriptiveStats>,
    pub(crate) frames: usize,
    pub(crate) value_estimates: usize,
}

impl ArchiveSummary {
    pub(crate) fn new(results: &AggregatedResults) -> Self {
        let points = results
            .iter()
            .map(|(&weights, result)| PointSummary {
                weights,
                episode: EpisodeSummary::new(result),
            })
            .collect();
        Self {
            algorithm: results.algorithm,
            points,
        }
    }

    /// The point with the highest episode return.
    pub(crate) fn best(&self) -> Option<&PointSummary> {
        self.points
            .iter()
            .max_by(|a, b| a.episode.total_reward.total_cmp(&b.episode.total_reward))
    }
}

impl EpisodeSummary {
    pub(crate) fn new(result: &EvaluationResult) -> Self {
        Self {
            steps: result.steps(),
            total_reward: result.total_reward(),
            reward_stats: DescriptiveStats::new(result.rewards.iter().copied()),
            frames: result.frames.len(),
            value_estimates: result.value_estimates.len(),
        }
    }
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let InspectArg { archive, output } = arg;
    let results = read_archive(archive)
        .with_context(|| format!("Failed to read result archive: {}", archive.display()))?;
    Output::save_json(&ArchiveSummary::new(&results), output.as_deref())
}
