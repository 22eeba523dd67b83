//! Catalog command handler

use anyhow::Result;

use folio_core::Config;

use crate::output::Output;

/// List the readable documents
pub fn list(config: &Config, output: &Output) -> Result<()> {
    let catalog = config.catalog();
    output.print_catalog(catalog.entries());
    Ok(())
}
