//! Storage Config

use std::path::PathBuf;

use clap::Args;

/// Local cart storage settings.
#[derive(Debug, Args)]
pub(crate) struct StorageConfig {
    /// Directory the anonymous cart is kept in
    #[arg(long, env = "CART_STORAGE_DIR", default_value = ".storefront-cart")]
    pub storage_dir: PathBuf,
}
