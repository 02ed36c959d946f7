//! Knowledge-base loading: reads pre-embedded legal chunks from JSON and
//! writes them to LanceDB.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, bail};
use meritdraft_core::{EMBEDDING_DIM, LegalChunk};
use meritdraft_store::LanceChunkStore;
use serde::Deserialize;

/// One chunk as produced by the ingestion tool.
#[derive(Debug, Deserialize)]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: LegalChunk,
    pub embedding: Vec<f32>,
}

pub struct LoadStats {
    pub total_rows: usize,
    pub elapsed_secs: f64,
}

/// Parse a JSON array of [`EmbeddedChunk`], checking every vector's width.
pub fn parse_chunks(raw: &str) -> anyhow::Result<Vec<(LegalChunk, Vec<f32>)>> {
    let records: Vec<EmbeddedChunk> = serde_json::from_str(raw).context("parsing chunk file")?;
    let mut out = Vec::with_capacity(records.len());
    for r in records {
        if r.embedding.len() != EMBEDDING_DIM {
            bail!(
                "chunk {} has a {}-dimension embedding, expected {EMBEDDING_DIM}",
                r.chunk.id,
                r.embedding.len()
            );
        }
        out.push((r.chunk, r.embedding));
    }
    Ok(out)
}

/// Replace the legal chunk table with the contents of `path`.
pub async fn load_chunks(lance: &LanceChunkStore, path: &Path) -> anyhow::Result<LoadStats> {
    let start = Instant::now();

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let chunks = parse_chunks(&raw)?;
    eprintln!("  Read {} chunks from {}", chunks.len(), path.display());

    if chunks.is_empty() {
        return Ok(LoadStats {
            total_rows: 0,
            elapsed_secs: 0.0,
        });
    }

    eprintln!("  Writing to LanceDB...");
    lance
        .replace_chunks(&chunks)
        .await
        .context("writing legal chunks to LanceDB")?;

    Ok(LoadStats {
        total_rows: chunks.len(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}
