use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Interval between progress lines when none is configured.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

pub struct PipelineConfig {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub concurrency: usize,
    pub progress_interval: Duration,
}

impl PipelineConfig {
    pub fn new(input_directory: impl Into<PathBuf>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            input_directory: input_directory.into(),
            output_directory: output_directory.into(),
            concurrency: clamp_concurrency(None),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn from_config(
        config: &Config,
        input_directory: impl Into<PathBuf>,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_directory: input_directory.into(),
            output_directory: output_directory.into(),
            concurrency: clamp_concurrency(config.max_concurrency),
            progress_interval: Duration::from_millis(config.progress_interval_ms),
        }
    }

    pub fn with_concurrency(mut self, requested: Option<usize>) -> Self {
        self.concurrency = clamp_concurrency(requested);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Worker count for a requested value: defaults to the CPU count and is
/// clamped to `[1, 2 × cpus]`.
pub fn clamp_concurrency(requested: Option<usize>) -> usize {
    let cpus = num_cpus::get().max(1);
    requested.unwrap_or(cpus).clamp(1, cpus * 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_defaults_to_cpus() {
        assert_eq!(clamp_concurrency(None), num_cpus::get().max(1));
    }

    #[test]
    fn test_clamp_bounds() {
        let cpus = num_cpus::get().max(1);
        assert_eq!(clamp_concurrency(Some(0)), 1);
        assert_eq!(clamp_concurrency(Some(1)), 1);
        assert_eq!(clamp_concurrency(Some(cpus * 2)), cpus * 2);
        assert_eq!(clamp_concurrency(Some(cpus * 10)), cpus * 2);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            max_concurrency: Some(1),
            progress_interval_ms: 500,
            ..Config::default()
        };
        let pipeline = PipelineConfig::from_config(&config, "/in", "/out");
        assert_eq!(pipeline.concurrency, 1);
        assert_eq!(pipeline.progress_interval, Duration::from_millis(500));
    }
}
