pub mod filesystem;

pub use filesystem::{copy_tree, ensure_directory, summarize_tree, CopyOutcome, CopyReport, TreeSummary};
