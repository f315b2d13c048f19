//! Cloud Firestore document store.

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::codec::{self, CodecError};
use super::{json_or_message, FirebaseClient};
use crate::backend::DocumentStore;
use crate::error::{Error, Result};
use crate::report::Report;

/// Field the listing is ordered by.
const ORDER_FIELD: &str = "callTime";

/// Reports stored as Firestore documents.
#[derive(Debug, Clone)]
pub struct FirestoreDocuments {
    client: FirebaseClient,
}

impl FirestoreDocuments {
    /// Create a document store on top of `client`.
    #[must_use]
    pub fn new(client: FirebaseClient) -> Self {
        Self { client }
    }

    /// `.../projects/{p}/databases/{db}/documents`
    fn documents_url(&self) -> String {
        let config = self.client.config();
        format!(
            "{}/projects/{}/databases/{}/documents",
            config.firestore_endpoint.trim_end_matches('/'),
            config.project_id,
            config.database
        )
    }

    fn create_url(&self, collection: &str) -> String {
        self.client.with_key(format!(
            "{}/{}",
            self.documents_url(),
            urlencoding::encode(collection)
        ))
    }

    fn query_url(&self) -> String {
        self.client
            .with_key(format!("{}:runQuery", self.documents_url()))
    }
}

/// Request body for a descending scan of one collection.
fn newest_first_query(collection: &str) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "orderBy": [{
                "field": { "fieldPath": ORDER_FIELD },
                "direction": "DESCENDING"
            }]
        }
    })
}

/// Turn a `runQuery` response into reports, skipping entries that carry
/// no document and documents that do not parse as reports.
fn reports_from_query(response: &Value) -> std::result::Result<Vec<Report>, CodecError> {
    let Some(entries) = response.as_array() else {
        return Ok(Vec::new());
    };

    let mut reports = Vec::with_capacity(entries.len());
    for document in entries.iter().filter_map(|entry| entry.get("document")) {
        let (id, body) = codec::decode_document(document)?;
        match serde_json::from_value::<Report>(body) {
            Ok(report) => reports.push(report.with_id(id)),
            Err(err) => warn!("Skipping malformed report {}: {}", id, err),
        }
    }
    Ok(reports)
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreDocuments {
    fn name(&self) -> &'static str {
        "firestore"
    }

    async fn create(&self, collection: &str, report: &Report) -> Result<String> {
        let body = serde_json::to_value(report)?;
        let fields = codec::encode_fields(&body).map_err(|e| Error::write(collection, e.to_string()))?;

        let response = self
            .client
            .http()
            .post(self.create_url(collection))
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| Error::write(collection, e.to_string()))?;

        let created = json_or_message(response)
            .await
            .map_err(|message| Error::write(collection, message))?;
        let name = created
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::write(collection, "response has no document name"))?;

        let id = codec::document_id(name).to_string();
        debug!("Created Firestore document {}/{}", collection, id);
        Ok(id)
    }

    async fn list_newest_first(&self, collection: &str) -> Result<Vec<Report>> {
        let response = self
            .client
            .http()
            .post(self.query_url())
            .json(&newest_first_query(collection))
            .send()
            .await
            .map_err(|e| Error::read(collection, e.to_string()))?;

        let body = json_or_message(response)
            .await
            .map_err(|message| Error::read(collection, message))?;
        let reports =
            reports_from_query(&body).map_err(|e| Error::read(collection, e.to_string()))?;
        debug!("Fetched {} reports from {}", reports.len(), collection);
        Ok(reports)
    }
}
