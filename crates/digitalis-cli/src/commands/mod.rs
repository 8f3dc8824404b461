pub mod schema;

use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub db: PathBuf,
    pub config: Option<PathBuf>,
}
