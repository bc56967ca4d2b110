pub mod memory;

use std::future::Future;

use crate::error::StoreError;
use crate::models::server::ServerRecord;

/// Source of the configured fleet.
pub trait ServerStore: Send + Sync + 'static {
    /// Every enabled, non-deleted server. An empty fleet is reported as
    /// [`StoreError::NoRows`].
    fn list_enabled_servers(&self) -> impl Future<Output = Result<Vec<ServerRecord>, StoreError>> + Send;
}
