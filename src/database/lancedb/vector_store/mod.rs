
use super::{ChunkMetadata, ChunkRecord};
use crate::{ProfileRagError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

const TABLE_NAME: &str = "chunks";

/// Vector store for profile chunks using LanceDB for similarity search.
///
/// All methods take `&self` so a single store handle can be shared across
/// concurrent requests; the only mutable state is the cached vector
/// dimension, which is read-mostly.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: AtomicUsize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub metadata: ChunkMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the chunk store under the configured data directory.
    ///
    /// The table is created with the configured embedding dimension; if a
    /// later insert carries vectors of a different dimension the table is
    /// dropped and recreated, because mixing dimensions would poison
    /// similarity search.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, ProfileRagError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ProfileRagError::Store(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: AtomicUsize::new(config.ollama.embedding_dimension as usize),
        };

        store.initialize_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Create the chunks table if it doesn't exist, or adopt the vector
    /// dimension of an existing one.
    async fn initialize_table(&self) -> Result<(), ProfileRagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            if let Some(dim) = self.detect_existing_vector_dimension().await? {
                debug!("Adopting existing vector dimension: {}", dim);
                self.vector_dimension.store(dim, Ordering::Release);
            }
            return Ok(());
        }

        let dim = self.vector_dimension.load(Ordering::Acquire);
        let schema = create_schema(dim);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to create table: {}", e)))?;

        info!("Chunks table created with {} dimensions", dim);
        Ok(())
    }

    /// Read the vector dimension from an existing table schema
    async fn detect_existing_vector_dimension(&self) -> Result<Option<usize>, ProfileRagError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to open existing table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector"
                && let DataType::FixedSizeList(_, size) = field.data_type()
            {
                return Ok(Some(*size as usize));
            }
        }

        Ok(None)
    }

    /// Store a batch of chunks with their embeddings
    #[inline]
    pub async fn store_chunks_batch(
        &self,
        records: Vec<ChunkRecord>,
    ) -> Result<(), ProfileRagError> {
        if records.is_empty() {
            debug!("No chunks to store");
            return Ok(());
        }

        debug!("Storing batch of {} chunks", records.len());

        let vector_dim = records[0].vector.len();
        if self.vector_dimension.load(Ordering::Acquire) != vector_dim {
            info!(
                "Vector dimension changed from {} to {}, recreating table",
                self.vector_dimension.load(Ordering::Acquire),
                vector_dim
            );
            self.recreate_table_with_dimension(vector_dim).await?;
            self.vector_dimension.store(vector_dim, Ordering::Release);
        }

        let record_batch = create_record_batch(&records, vector_dim)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to insert chunks: {}", e)))?;

        info!("Successfully stored {} chunks", records.len());
        Ok(())
    }

    async fn recreate_table_with_dimension(
        &self,
        vector_dim: usize,
    ) -> Result<(), ProfileRagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| ProfileRagError::Store(format!("Failed to drop table: {}", e)))?;
        }

        let schema = create_schema(vector_dim);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| {
                ProfileRagError::Store(format!("Failed to create table with new dimensions: {}", e))
            })?;

        Ok(())
    }

    /// Search for the chunks most similar to a query vector.
    ///
    /// Results are relevance-ranked, most similar first. When `user_filter`
    /// is given, only chunks whose `user_name` metadata matches are
    /// considered.
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
        user_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>, ProfileRagError> {
        debug!(
            "Searching for similar chunks with limit: {}, user filter: {:?}",
            limit, user_filter
        );

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to open table: {}", e)))?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| ProfileRagError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        if let Some(user_name) = user_filter {
            query = query.only_if(format!("user_name = {}", sql_quote(user_name)));
        }

        let mut stream = query
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        debug!("Found {} similar chunks", search_results.len());
        Ok(search_results)
    }

    /// List the ids of every stored chunk
    #[inline]
    pub async fn list_ids(&self) -> Result<Vec<String>, ProfileRagError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to open table: {}", e)))?;

        let mut stream = table
            .query()
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to scan table: {}", e)))?;

        let mut ids = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to read scan stream: {}", e)))?
        {
            let id_column = string_column(&batch, "id")?;
            for row in 0..batch.num_rows() {
                ids.push(id_column.value(row).to_string());
            }
        }

        debug!("Listed {} chunk ids", ids.len());
        Ok(ids)
    }

    /// Delete the chunks with the given ids
    #[inline]
    pub async fn delete_ids(&self, ids: &[String]) -> Result<(), ProfileRagError> {
        if ids.is_empty() {
            return Ok(());
        }

        debug!("Deleting {} chunks", ids.len());

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to open table: {}", e)))?;

        let quoted: Vec<String> = ids.iter().map(|id| sql_quote(id)).collect();
        let predicate = format!("id IN ({})", quoted.join(", "));
        table
            .delete(&predicate)
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to delete chunks: {}", e)))?;

        info!("Deleted {} chunks", ids.len());
        Ok(())
    }

    /// Get the total number of chunks stored
    #[inline]
    pub async fn count_chunks(&self) -> Result<u64, ProfileRagError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| ProfileRagError::Store(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }
}

fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("user_name", DataType::Utf8, true),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(
    records: &[ChunkRecord],
    vector_dim: usize,
) -> Result<RecordBatch, ProfileRagError> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut vectors = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut user_names = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        if record.vector.len() != vector_dim {
            return Err(ProfileRagError::Store(format!(
                "Inconsistent vector dimensions within batch: expected {}, got {}",
                vector_dim,
                record.vector.len()
            )));
        }

        ids.push(record.id.as_str());
        vectors.push(&record.vector);
        contents.push(record.metadata.content.as_str());
        sources.push(record.metadata.source.as_str());
        user_names.push(record.metadata.user_name.as_deref());
        chunk_indices.push(record.metadata.chunk_index);
        created_ats.push(record.metadata.created_at.as_str());
    }

    let schema = create_schema(vector_dim);

    let mut flat_values = Vec::with_capacity(len * vector_dim);
    for vector in &vectors {
        flat_values.extend_from_slice(vector);
    }
    let values_array = Float32Array::from(flat_values);
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
            .map_err(|e| ProfileRagError::Store(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(sources)),
        Arc::new(StringArray::from(user_names)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| ProfileRagError::Store(format!("Failed to create record batch: {}", e)))
}

/// Quote a string literal for use in a LanceDB SQL predicate
fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a StringArray, ProfileRagError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ProfileRagError::Store(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ProfileRagError::Store(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, ProfileRagError> {
    let num_rows = batch.num_rows();
    let mut search_results = Vec::with_capacity(num_rows);

    let ids = string_column(batch, "id")?;
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;
    let user_names = string_column(batch, "user_name")?;
    let created_ats = string_column(batch, "created_at")?;

    let chunk_indices = batch
        .column_by_name("chunk_index")
        .ok_or_else(|| ProfileRagError::Store("Missing chunk_index column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| ProfileRagError::Store("Invalid chunk_index column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let metadata = ChunkMetadata {
            content: contents.value(row).to_string(),
            source: sources.value(row).to_string(),
            user_name: if user_names.is_null(row) {
                None
            } else {
                Some(user_names.value(row).to_string())
            },
            chunk_index: chunk_indices.value(row),
            created_at: created_ats.value(row).to_string(),
        };

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        // Convert distance to similarity score (higher is better)
        let similarity_score = 1.0 - distance;

        search_results.push(SearchResult {
            id: ids.value(row).to_string(),
            metadata,
            similarity_score,
            distance,
        });
    }

    Ok(search_results)
}
