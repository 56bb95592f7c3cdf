use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory along with:
/// - an initial `config.json` file holding the default settings
/// - an empty SQLite database with the current schema
///
/// # Arguments
/// - `finman_home` - The directory that will be the root of data directory, e.g. `$HOME/finman`
///
/// # Errors
/// - `Config` if the directory is already initialized or any file operation fails.
pub async fn init(finman_home: &Path) -> Result<Out<()>> {
    let config = Config::create(finman_home).await?;
    Ok(format!(
        "Successfully created the finman directory at {}",
        config.root().display()
    )
    .into())
}
