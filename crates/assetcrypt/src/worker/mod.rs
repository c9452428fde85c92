pub mod job;
pub mod pool;
pub mod scanner;

pub use job::{FileOutcome, FileTask};
pub use pool::{FileProcessor, WorkerPool};
pub use scanner::DirectoryScanner;
