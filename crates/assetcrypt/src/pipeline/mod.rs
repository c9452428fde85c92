pub mod config;
pub mod progress;
pub mod runner;
pub mod state;

pub use config::{clamp_concurrency, PipelineConfig};
pub use progress::{LogProgress, NoopProgress, PipelineStats, ProgressReporter, ProgressSampler};
pub use runner::DecryptionPipeline;
pub use state::RunState;
