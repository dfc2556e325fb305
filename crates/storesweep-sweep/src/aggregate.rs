use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use storesweep_training::algorithm::Algorithm;
use tracing::warn;

use crate::{evaluate::EvaluationResult, grid::WeightKey};

pub const RESULTS_SCHEMA_VERSION: u32 = 1;

/// Evaluation results of one algorithm, keyed by rounded raw weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResults {
    pub schema_version: u32,
    pub algorithm: Algorithm,
    /// Serialized as a list of `[key, result]` pairs in key order.
    #[serde(with = "entries")]
    pub points: BTreeMap<WeightKey, EvaluationResult>,
}

impl AggregatedResults {
    #[must_use]
    pub fn get(&self, key: &WeightKey) -> Option<&EvaluationResult> {
        self.points.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WeightKey, &EvaluationResult)> {
        self.points.iter()
    }
}

/// Collects evaluation results as the sweep produces them.
#[derive(Debug)]
pub struct ResultAggregator {
    algorithm: Algorithm,
    points: BTreeMap<WeightKey, EvaluationResult>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            points: BTreeMap::new(),
        }
    }

    /// Stores `result` under `key`; a second record for the same key replaces the first.
    pub fn record(&mut self, key: WeightKey, result: EvaluationResult) {
        if self.points.insert(key, result).is_some() {
            warn!(%key, algorithm = %self.algorithm, "replacing earlier result for weight key");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn export(self) -> AggregatedResults {
        AggregatedResults {
            schema_version: RESULTS_SCHEMA_VERSION,
            algorithm: self.algorithm,
            points: self.points,
        }
    }
}

mod entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize as _, Deserializer, Serializer};

    use crate::{evaluate::EvaluationResult, grid::WeightKey};

    pub(super) fn serialize<S>(
        points: &BTreeMap<WeightKey, EvaluationResult>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(points)
    }

    pub(super) fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<WeightKey, EvaluationResult>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<(WeightKey, EvaluationResult)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(reward: f64) -> EvaluationResult {
        EvaluationResult {
            rewards: vec![reward, reward / 2.0],
            frames: vec![],
            value_estimates: vec![],
            diagnostics: BTreeMap::from([("reward".to_owned(), vec![reward, reward / 2.0])]),
        }
    }

    #[test]
    fn test_record_and_export() {
        let mut aggregator = ResultAggregator::new(Algorithm::Genetic);
        assert!(aggregator.is_empty());
        aggregator.record(WeightKey([10, 1, 1]), result(1.0));
        aggregator.record(WeightKey([1, 1, 1]), result(2.0));
        assert_eq!(aggregator.len(), 2);

        let results = aggregator.export();
        assert_eq!(results.schema_version, RESULTS_SCHEMA_VERSION);
        assert_eq!(results.algorithm, Algorithm::Genetic);
        let keys = results.iter().map(|(k, _)| *k).collect::<Vec<_>>();
        assert_eq!(keys, vec![WeightKey([1, 1, 1]), WeightKey([10, 1, 1])]);
        assert_eq!(results.get(&WeightKey([1, 1, 1])), Some(&result(2.0)));
    }

    #[test]
    fn test_duplicate_key_is_last_write_wins() {
        let mut aggregator = ResultAggregator::new(Algorithm::CrossEntropy);
        aggregator.record(WeightKey([1, 2, 3]), result(1.0));
        aggregator.record(WeightKey([1, 2, 3]), result(5.0));
        let results = aggregator.export();
        assert_eq!(results.len(), 1);
        assert_eq!(results.get(&WeightKey([1, 2, 3])), Some(&result(5.0)));
    }

    #[test]
    fn test_points_serialize_as_pairs() {
        let mut aggregator = ResultAggregator::new(Algorithm::Genetic);
        aggregator.record(WeightKey([1, 10, 100]), result(0.25));
        let results = aggregator.export();

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["algorithm"], "Genetic");
        assert_eq!(json["points"][0][0], serde_json::json!([1, 10, 100]));
        assert_eq!(json["points"][0][1]["rewards"][0], 0.25);

        let back: AggregatedResults = serde_json::from_value(json).unwrap();
        assert_eq!(back, results);
    }
}
