//! Gzip-compressed JSON archives of aggregated results.

use std::{
    fs,
    io::{self, Read as _, Write as _},
    path::{Path, PathBuf},
};

use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use serde::ser::Error as _;
use storesweep_training::algorithm::Algorithm;
use tracing::info;

use crate::{
    aggregate::{AggregatedResults, RESULTS_SCHEMA_VERSION},
    atomic::atomic_write,
    error::ArchiveError,
};

/// `<cache_dir>/<algorithm>_prepared_plot_data.json.gz`
#[must_use]
pub fn archive_path(cache_dir: &Path, algorithm: Algorithm) -> PathBuf {
    cache_dir.join(format!("{}_prepared_plot_data.json.gz", algorithm.name()))
}

/// Serializes, compresses and atomically writes `results` to `path`.
///
/// JSON has no representation for NaN or infinity, so results holding such a
/// value are rejected before anything is written.
pub fn write_archive(path: &Path, results: &AggregatedResults) -> Result<(), ArchiveError> {
    let non_finite = results
        .iter()
        .find_map(|(key, result)| Some((key, result.non_finite_series()?)));
    if let Some((key, series)) = non_finite {
        return Err(ArchiveError::Serialization {
            path: path.to_owned(),
            source: serde_json::Error::custom(format!(
                "non-finite value in `{series}` of point {key}"
            )),
        });
    }
    let json = serde_json::to_vec(results).map_err(|source| ArchiveError::Serialization {
        path: path.to_owned(),
        source,
    })?;
    let io_error = |source: io::Error| ArchiveError::Io {
        path: path.to_owned(),
        source,
    };

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(io_error)?;
    let compressed = encoder.finish().map_err(io_error)?;
    atomic_write(path, &compressed).map_err(io_error)?;

    info!(
        path = %path.display(),
        points = results.len(),
        bytes = compressed.len(),
        "wrote result archive"
    );
    Ok(())
}

pub fn read_archive(path: &Path) -> Result<AggregatedResults, ArchiveError> {
    let compressed = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ArchiveError::NotFound {
            path: path.to_owned(),
        },
        _ => ArchiveError::Io {
            path: path.to_owned(),
            source,
        },
    })?;
    let invalid = |reason: String| ArchiveError::Deserialization {
        path: path.to_owned(),
        reason,
    };

    let mut json = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(|err| invalid(format!("decompression failed: {err}")))?;
    let results: AggregatedResults =
        serde_json::from_slice(&json).map_err(|err| invalid(format!("malformed content: {err}")))?;
    if results.schema_version != RESULTS_SCHEMA_VERSION {
        return Err(invalid(format!(
            "unsupported schema version {}",
            results.schema_version
        )));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use storesweep_env::Frame;

    use super::*;
    use crate::{aggregate::ResultAggregator, evaluate::EvaluationResult, grid::WeightKey};

    fn results() -> AggregatedResults {
        let mut aggregator = ResultAggregator::new(Algorithm::CrossEntropy);
        for (i, key) in [[1, 1, 1], [1, 10, 1], [100, 1, 10]].into_iter().enumerate() {
            let x = f64::from(u32::try_from(i).unwrap()) / 3.0;
            aggregator.record(
                WeightKey(key),
                EvaluationResult {
                    rewards: vec![x, -x, 0.1],
                    frames: vec![Frame::blank(4, 2)],
                    value_estimates: vec![x * 7.0],
                    diagnostics: BTreeMap::from([("fill_level".to_owned(), vec![0.5, x])]),
                },
            );
        }
        aggregator.export()
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(
            archive_path(Path::new("cached_models"), Algorithm::Genetic),
            Path::new("cached_models/Genetic_prepared_plot_data.json.gz")
        );
    }

    #[test]
    fn test_write_then_read_is_equal() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_path(dir.path(), Algorithm::CrossEntropy);
        let original = results();
        write_archive(&path, &original).unwrap();
        let loaded = read_archive(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_archive_is_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json.gz");
        write_archive(&path, &results()).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_empty_results_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json.gz");
        let empty = ResultAggregator::new(Algorithm::Genetic).export();
        write_archive(&path, &empty).unwrap();
        let loaded = read_archive(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.algorithm, Algorithm::Genetic);
    }

    #[test]
    fn test_non_finite_values_are_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nan.json.gz");

        let mut aggregator = ResultAggregator::new(Algorithm::Genetic);
        aggregator.record(
            WeightKey([1, 1, 1]),
            EvaluationResult {
                rewards: vec![f64::NAN, f64::NEG_INFINITY],
                frames: vec![],
                value_estimates: vec![],
                diagnostics: BTreeMap::new(),
            },
        );
        let err = write_archive(&path, &aggregator.export()).unwrap_err();
        assert!(matches!(err, ArchiveError::Serialization { .. }));
        assert!(!path.exists());

        let mut with_bad_diagnostic = results();
        with_bad_diagnostic
            .points
            .values_mut()
            .next()
            .unwrap()
            .diagnostics
            .insert("mdot_kg_per_s".to_owned(), vec![f64::INFINITY]);
        let err = write_archive(&path, &with_bad_diagnostic).unwrap_err();
        assert!(matches!(err, ArchiveError::Serialization { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_archive(&dir.path().join("missing.json.gz")).unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound { .. }));
    }

    #[test]
    fn test_truncated_archive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.json.gz");
        write_archive(&path, &results()).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let err = read_archive(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::Deserialization { .. }));
    }

    #[test]
    fn test_plain_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.json.gz");
        fs::write(&path, serde_json::to_vec(&results()).unwrap()).unwrap();
        let err = read_archive(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::Deserialization { .. }));
    }
}
