//! Summary statistics for reward traces and training populations.
//!
//! ```
//! use storesweep_stats::descriptive::DescriptiveStats;
//!
//! let rewards = [-0.5, 0.25, 1.0];
//! let stats = DescriptiveStats::new(rewards).unwrap();
//! assert_eq!(stats.count, 3);
//! assert_eq!(stats.total, 0.75);
//! ```

pub mod descriptive;
