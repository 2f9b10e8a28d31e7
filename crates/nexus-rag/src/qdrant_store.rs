//! Qdrant-backed vector store

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter,
    GetPointsBuilder, PointId, PointStruct, PointsIdsList, Range, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder, VectorsOutput,
    point_id::PointIdOptions, value::Kind, vector_output, vectors_config,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use nexus_core::{
    Error, IndexEntry, Metadata, MetadataFilter, MetadataValue, Result, ScoredEntry,
    ServiceHealth, VectorStore,
};

/// Payload key holding the caller-assigned entry id
const ID_KEY: &str = "entry_id";
/// Payload key holding the entry text
const TEXT_KEY: &str = "text";
/// Payload key holding the metadata object
const METADATA_KEY: &str = "metadata";

const SCROLL_PAGE: u32 = 256;

fn unavailable(err: impl std::fmt::Display) -> Error {
    Error::IndexUnavailable(err.to_string())
}

/// Vector store over a remote Qdrant collection.
///
/// Qdrant only accepts integer or UUID point ids, so caller ids are mapped to
/// UUIDv5 values and the original id is kept in the payload. Search results
/// are returned without vectors. The collection dimension is re-read from the
/// server until it is known, so a collection created by another process is
/// picked up.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: RwLock<Option<usize>>,
}

impl QdrantVectorStore {
    /// Connect to Qdrant. The collection is created on the first upsert if missing.
    pub async fn connect(url: &str, collection: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(unavailable)?;
        let store = Self {
            client,
            collection: collection.to_string(),
            dimension: RwLock::new(None),
        };

        let dimension = store.existing_dimension().await?;
        info!(url, collection, ?dimension, "connected to qdrant");
        *store.dimension.write().await = dimension;
        Ok(store)
    }

    /// Point id used for a caller id
    pub fn point_id(id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
    }

    /// Known dimension, asking the server again while none is cached
    async fn current_dimension(&self) -> Result<Option<usize>> {
        if let Some(dimension) = *self.dimension.read().await {
            return Ok(Some(dimension));
        }

        let dimension = self.existing_dimension().await?;
        if dimension.is_some() {
            debug!(collection = %self.collection, ?dimension, "found qdrant collection");
            *self.dimension.write().await = dimension;
        }
        Ok(dimension)
    }

    async fn existing_dimension(&self) -> Result<Option<usize>> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(unavailable)?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(self.collection.as_str())
            .await
            .map_err(unavailable)?;
        let size = info
            .result
            .and_then(|i| i.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|config| match config {
                vectors_config::Config::Params(params) => Some(params.size as usize),
                _ => None,
            });
        Ok(size)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(unavailable)?;
        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(self.collection.as_str())
                        .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
                )
                .await
                .map_err(unavailable)?;
            info!(collection = %self.collection, dimension, "created qdrant collection");
        }
        Ok(())
    }

    fn to_point(entry: IndexEntry) -> Result<PointStruct> {
        let payload: Payload = json!({
            ID_KEY: entry.id,
            TEXT_KEY: entry.text,
            METADATA_KEY: entry.metadata,
        })
        .try_into()
        .map_err(|e| Error::Serialization(format!("invalid payload: {}", e)))?;

        Ok(PointStruct::new(Self::point_id(&entry.id), entry.vector, payload))
    }

    fn to_filter(filter: &MetadataFilter) -> Filter {
        let conditions: Vec<Condition> = filter
            .conditions
            .iter()
            .map(|(key, value)| {
                let field = format!("{}.{}", METADATA_KEY, key);
                match value {
                    MetadataValue::Bool(b) => Condition::matches(field, *b),
                    MetadataValue::Integer(n) => Condition::matches(field, *n),
                    MetadataValue::Float(x) => Condition::range(
                        field,
                        Range {
                            gte: Some(*x),
                            lte: Some(*x),
                            ..Default::default()
                        },
                    ),
                    MetadataValue::Text(s) => Condition::matches(field, s.clone()),
                }
            })
            .collect();
        Filter::must(conditions)
    }

    async fn check_dimension(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut expected = self.current_dimension().await?;
        for entry in entries {
            let actual = entry.vector.len();
            match expected {
                Some(dim) if dim != actual => {
                    return Err(Error::DimensionMismatch {
                        expected: dim,
                        actual,
                    });
                }
                Some(_) => {}
                None => expected = Some(actual),
            }
        }
        expected.ok_or_else(|| Error::Validation("empty batch".to_string()))
    }
}

/// Convert a Qdrant payload value into JSON.
fn value_to_json(value: Value) -> serde_json::Value {
    match value.kind {
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(n)) => json!(n),
        Some(Kind::DoubleValue(x)) => json!(x),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(object)) => serde_json::Value::Object(
            object
                .fields
                .into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
        Some(Kind::NullValue(_)) | None => serde_json::Value::Null,
    }
}

fn string_field(payload: &mut HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.remove(key)?.kind {
        Some(Kind::StringValue(s)) => Some(s),
        _ => None,
    }
}

/// Dense vector of a point, empty when vectors were not requested
fn dense_vector(vectors: Option<VectorsOutput>) -> Vec<f32> {
    match vectors.and_then(|v| v.get_vector()) {
        Some(vector_output::Vector::Dense(dense)) => dense.data,
        _ => Vec::new(),
    }
}

/// Rebuild an entry from a point payload and its vector
fn entry_from_point(
    mut payload: HashMap<String, Value>,
    point_id: Option<PointId>,
    vector: Vec<f32>,
) -> IndexEntry {
    let id = string_field(&mut payload, ID_KEY).unwrap_or_else(|| match point_id
        .and_then(|p| p.point_id_options)
    {
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    });
    let text = string_field(&mut payload, TEXT_KEY).unwrap_or_default();
    let metadata: Metadata = payload
        .remove(METADATA_KEY)
        .map(value_to_json)
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    IndexEntry {
        id,
        vector,
        text,
        metadata,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let dimension = self.check_dimension(&entries).await?;
        self.ensure_collection(dimension).await?;

        let count = entries.len();
        let points = entries
            .into_iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points).wait(true))
            .await
            .map_err(unavailable)?;

        *self.dimension.write().await = Some(dimension);
        debug!(count, collection = %self.collection, "upserted points");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        let Some(dimension) = self.current_dimension().await? else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        if dimension != vector.len() {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let mut request =
            SearchPointsBuilder::new(self.collection.as_str(), vector.to_vec(), k as u64).with_payload(true);
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            request = request.filter(Self::to_filter(filter));
        }

        let response = self.client.search_points(request).await.map_err(unavailable)?;
        Ok(response
            .result
            .into_iter()
            .map(|point| ScoredEntry {
                // Qdrant reports cosine similarity as the score.
                distance: 1.0 - point.score,
                entry: entry_from_point(point.payload, point.id, Vec::new()),
            })
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<IndexEntry>> {
        if self.current_dimension().await?.is_none() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut request = ScrollPointsBuilder::new(self.collection.as_str())
                .limit(SCROLL_PAGE)
                .with_payload(true)
                .with_vectors(true);
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }

            let response = self.client.scroll(request).await.map_err(unavailable)?;
            entries.extend(
                response
                    .result
                    .into_iter()
                    .map(|point| entry_from_point(point.payload, point.id, dense_vector(point.vectors))),
            );

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        Ok(entries)
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() || self.current_dimension().await?.is_none() {
            return Ok(0);
        }

        let point_ids: Vec<PointId> = ids.iter().map(|id| Self::point_id(id).into()).collect();
        let existing = self
            .client
            .get_points(GetPointsBuilder::new(self.collection.as_str(), point_ids.clone()))
            .await
            .map_err(unavailable)?
            .result
            .len();
        if existing == 0 {
            return Ok(0);
        }

        self.client
            .delete_points(
                DeletePointsBuilder::new(self.collection.as_str())
                    .points(PointsIdsList { ids: point_ids })
                    .wait(true),
            )
            .await
            .map_err(unavailable)?;
        debug!(removed = existing, collection = %self.collection, "deleted points");
        Ok(existing)
    }

    async fn count(&self) -> Result<usize> {
        if self.current_dimension().await?.is_none() {
            return Ok(0);
        }
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection.as_str()).exact(true))
            .await
            .map_err(unavailable)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn health(&self) -> ServiceHealth {
        match self.client.health_check().await {
            Ok(_) => ServiceHealth::Ready,
            Err(e) => {
                warn!(error = %e, "qdrant health check failed");
                ServiceHealth::Unavailable(e.to_string())
            }
        }
    }
}
