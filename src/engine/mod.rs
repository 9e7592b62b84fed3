//! The external backup engine.
//!
//! The coordination layer only needs three things from the engine: report
//! its current configuration, apply a list of configuration commands, and
//! run a backup script. [`RmanEngine`] does this by driving the `rman`
//! command-line client with generated command files.

mod output;
mod rman;
mod script;


pub use output::ErrorScanner;
pub use rman::{ChildSlot, RmanEngine, RmanSettings};
pub use script::expand_placeholders;

use crate::error::Result;
use std::path::Path;

/// Operations the job runner performs through the backup engine.
pub trait Engine: Send + Sync {
    /// Every line the engine prints for `show all`.
    fn capture_config(&self) -> Result<Vec<String>>;

    /// Run the given configuration commands, one per line.
    fn apply_config(&self, settings: &[String]) -> Result<()>;

    /// Run a backup script file.
    fn run_script(&self, script: &Path) -> Result<()>;
}
