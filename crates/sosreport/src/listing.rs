//! Report listing.

use tracing::{debug, error};

use crate::backend::DocumentStore;
use crate::report::Report;

/// Fetch every report in `collection`, newest first.
///
/// A failed read is logged and yields an empty list; the list view has no
/// error state of its own.
pub async fn fetch_reports(store: &dyn DocumentStore, collection: &str) -> Vec<Report> {
    match store.list_newest_first(collection).await {
        Ok(reports) => {
            debug!(
                "Fetched {} reports from {} ({})",
                reports.len(),
                collection,
                store.name()
            );
            reports
        }
        Err(err) => {
            error!("Error fetching SOS messages: {}", err);
            Vec::new()
        }
    }
}
