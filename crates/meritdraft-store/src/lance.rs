//! LanceDB vector store for the legal knowledge base.
//!
//! One table, `legal_chunks`, holding regulation text, precedent cases and
//! appeal decisions with 768-dim embeddings. Searches are cosine nearest
//! neighbour with the partition filters pushed down as a SQL predicate.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, ListArray, ListBuilder,
    RecordBatchIterator, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::DistanceType;
use lancedb::query::{ExecutableQuery, QueryBase};
use meritdraft_core::legal::{LEGAL_CHUNKS_TABLE, legal_chunks_schema};
use meritdraft_core::{Criterion, EMBEDDING_DIM, LegalChunk, SourceType};
use tracing::{debug, info};
use uuid::Uuid;

use crate::StoreError;
use crate::traits::{ChunkQuery, LegalChunkStore, PurityFilter};

pub struct LanceChunkStore {
    db: lancedb::Connection,
}

impl LanceChunkStore {
    /// Connect to a LanceDB database at the given path, creating the
    /// directory if it doesn't exist.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let uri = path
            .to_str()
            .ok_or_else(|| StoreError::Other("non-UTF8 database path".into()))?;
        let db = lancedb::connect(uri).execute().await?;
        Ok(Self { db })
    }

    pub async fn table(&self) -> Result<lancedb::Table, StoreError> {
        let table = self.db.open_table(LEGAL_CHUNKS_TABLE).execute().await?;
        Ok(table)
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        let table = self.table().await?;
        Ok(table.count_rows(None).await?)
    }

    /// Create (or replace) the chunk table from chunks and their embeddings.
    pub async fn replace_chunks(
        &self,
        chunks: &[(LegalChunk, Vec<f32>)],
    ) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Err(StoreError::Other("no chunks provided".into()));
        }
        let batch = chunks_to_batch(chunks)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let existing = self.db.table_names().execute().await?;
        if existing.iter().any(|n| n == LEGAL_CHUNKS_TABLE) {
            self.db.drop_table(LEGAL_CHUNKS_TABLE, &[]).await?;
        }

        self.db
            .create_table(LEGAL_CHUNKS_TABLE, Box::new(reader))
            .execute()
            .await?;

        info!(rows = chunks.len(), "created legal chunk table");
        Ok(())
    }
}

#[async_trait]
impl LegalChunkStore for LanceChunkStore {
    async fn search_by_criterion(
        &self,
        query: &ChunkQuery<'_>,
    ) -> Result<Vec<LegalChunk>, StoreError> {
        query.check_dimension()?;
        let filter = filter_clause(query);
        debug!(%filter, limit = query.limit, "legal chunk search");

        let table = self.table().await?;
        let batches: Vec<RecordBatch> = table
            .vector_search(query.embedding)?
            .column("embedding")
            .distance_type(DistanceType::Cosine)
            .only_if(filter)
            .limit(query.limit)
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut chunks = Vec::new();
        for batch in &batches {
            chunks.extend(batch_to_chunks(batch)?);
        }
        chunks.sort_by(|a, b| {
            a.distance
                .unwrap_or(f32::MAX)
                .total_cmp(&b.distance.unwrap_or(f32::MAX))
        });
        chunks.truncate(query.limit);
        Ok(chunks)
    }
}

/// SQL predicate for a query's partition, criterion and purity filters.
///
/// Only enum-derived strings are interpolated.
pub fn filter_clause(query: &ChunkQuery<'_>) -> String {
    let mut clauses = vec![format!("source_type = '{}'", query.source_type.as_str())];
    match query.criterion {
        Some(c) => clauses.push(format!("criterion_tag = '{}'", c.as_str())),
        None => clauses.push("criterion_tag IS NULL".to_string()),
    }
    if query.purity == PurityFilter::Enforced {
        match query.source_type {
            SourceType::AppealDecision => clauses.push("is_winning_argument = true".into()),
            SourceType::PrecedentCase => clauses.push("is_holding = true".into()),
            SourceType::Regulation => {}
        }
    }
    clauses.join(" AND ")
}

fn chunks_to_batch(chunks: &[(LegalChunk, Vec<f32>)]) -> Result<RecordBatch, StoreError> {
    let mut flat = Vec::with_capacity(chunks.len() * EMBEDDING_DIM);
    for (_, embedding) in chunks {
        if embedding.len() != EMBEDDING_DIM {
            return Err(StoreError::Dimension {
                expected: EMBEDDING_DIM,
                got: embedding.len(),
            });
        }
        flat.extend_from_slice(embedding);
    }

    let strings = |f: fn(&LegalChunk) -> Option<&str>| -> StringArray {
        chunks.iter().map(|(c, _)| f(c)).collect()
    };

    let mut citations = ListBuilder::new(StringBuilder::new());
    for (c, _) in chunks {
        for cite in &c.regulatory_citation {
            citations.values().append_value(cite);
        }
        citations.append(true);
    }

    let embeddings = FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        EMBEDDING_DIM as i32,
        Arc::new(Float32Array::from(flat)),
        None,
    )?;

    let batch = RecordBatch::try_new(
        Arc::new(legal_chunks_schema()),
        vec![
            Arc::new(
                chunks
                    .iter()
                    .map(|(c, _)| Some(c.id.to_string()))
                    .collect::<StringArray>(),
            ),
            Arc::new(strings(|c| Some(c.text.as_str()))),
            Arc::new(strings(|c| Some(c.source_type.as_str()))),
            Arc::new(strings(|c| Some(c.source_document.as_str()))),
            Arc::new(citations.finish()),
            Arc::new(strings(|c| c.case_citation.as_deref())),
            Arc::new(strings(|c| c.appeal_citation.as_deref())),
            Arc::new(strings(|c| c.criterion_tag.map(|t| t.as_str()))),
            Arc::new(strings(|c| c.legal_standard.as_deref())),
            Arc::new(strings(|c| c.legal_test.as_deref())),
            Arc::new(
                chunks
                    .iter()
                    .map(|(c, _)| Some(c.is_winning_argument))
                    .collect::<BooleanArray>(),
            ),
            Arc::new(
                chunks
                    .iter()
                    .map(|(c, _)| Some(c.is_holding))
                    .collect::<BooleanArray>(),
            ),
            Arc::new(embeddings),
        ],
    )?;
    Ok(batch)
}

fn batch_to_chunks(batch: &RecordBatch) -> Result<Vec<LegalChunk>, StoreError> {
    let ids = string_col(batch, "id")?;
    let texts = string_col(batch, "chunk_text")?;
    let source_types = string_col(batch, "source_type")?;
    let documents = string_col(batch, "source_document")?;
    let case_citations = string_col(batch, "case_citation")?;
    let appeal_citations = string_col(batch, "appeal_citation")?;
    let tags = string_col(batch, "criterion_tag")?;
    let standards = string_col(batch, "legal_standard")?;
    let tests = string_col(batch, "legal_test")?;
    let winning = bool_col(batch, "is_winning_argument")?;
    let holding = bool_col(batch, "is_holding")?;
    let citations = batch
        .column_by_name("regulatory_citation")
        .and_then(|c| c.as_any().downcast_ref::<ListArray>());
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let id = Uuid::parse_str(ids.value(i))
            .map_err(|e| StoreError::Other(format!("bad chunk id: {e}")))?;
        let source_type: SourceType = source_types.value(i).parse().map_err(StoreError::Other)?;
        let criterion_tag = opt_str(tags, i)
            .map(|t| t.parse::<Criterion>())
            .transpose()
            .map_err(|e| StoreError::Other(e.to_string()))?;

        let regulatory_citation = match citations {
            Some(list) if !list.is_null(i) => {
                let values = list.value(i);
                values
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .map(|s| s.iter().flatten().map(str::to_string).collect())
                    .unwrap_or_default()
            }
            _ => Vec::new(),
        };

        out.push(LegalChunk {
            id,
            text: texts.value(i).to_string(),
            source_type,
            source_document: opt_str(documents, i).unwrap_or_default().to_string(),
            regulatory_citation,
            case_citation: opt_str(case_citations, i).map(str::to_string),
            appeal_citation: opt_str(appeal_citations, i).map(str::to_string),
            criterion_tag,
            legal_standard: opt_str(standards, i).map(str::to_string),
            legal_test: opt_str(tests, i).map(str::to_string),
            is_winning_argument: !winning.is_null(i) && winning.value(i),
            is_holding: !holding.is_null(i) && holding.value(i),
            distance: distances.filter(|d| !d.is_null(i)).map(|d| d.value(i)),
        });
    }
    Ok(out)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::Other(format!("missing or non-string column: {name}")))
}

fn bool_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
        .ok_or_else(|| StoreError::Other(format!("missing or non-boolean column: {name}")))
}

fn opt_str(array: &StringArray, i: usize) -> Option<&str> {
    if array.is_null(i) {
        None
    } else {
        Some(array.value(i))
    }
}
