//! # kiln-loaders
//!
//! Concrete [`kiln_core::DataSourceLoader`] implementations: CSV and Excel
//! files read synchronously from local disk, and a Snowflake SQL-API client
//! for the `SQLDataSet` catalog entry kind. Projects compose whichever
//! loaders they need into a [`StandardLoader`], or implement
//! `DataSourceLoader` directly for anything else.

pub mod csv_loader;
pub mod excel_loader;
pub mod sql_loader;

use std::path::Path;

use async_trait::async_trait;
use kiln_core::catalog::CatalogEntry;
use kiln_core::error::LoadError;
use kiln_core::{DataSourceLoader, TabularValue};
use tokio_util::sync::CancellationToken;

/// Dispatches to the CSV, Excel, or Snowflake loader based on the catalog
/// entry's discriminant. This is the loader most projects pass to
/// `run_pipeline`; it does not consult `cancel` itself since none of the
/// three backing implementations perform long-running streaming I/O, but it
/// is threaded through so future loaders (e.g. a streaming database source)
/// can observe it.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardLoader;

#[async_trait]
impl DataSourceLoader for StandardLoader {
    async fn load(
        &self,
        entry: &CatalogEntry,
        credentials_path: &Path,
        _cancel: &CancellationToken,
    ) -> Result<TabularValue, LoadError> {
        match entry {
            CatalogEntry::Csv(_) => csv_loader::load(entry),
            CatalogEntry::Excel(_) => excel_loader::load(entry),
            CatalogEntry::Sql(_) => sql_loader::load(entry, credentials_path).await,
        }
    }
}
