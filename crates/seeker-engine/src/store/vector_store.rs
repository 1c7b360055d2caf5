use crate::types::{DocumentMetadata, EmbeddedDocument, Partition};
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const STORE_FILE: &str = "store.db";

#[derive(Debug, Clone)]
struct Entry {
    doc: EmbeddedDocument,
    vector: Vec<f32>,
}

/// In-memory vector collection with brute-force cosine similarity search.
///
/// Documents are keyed by id; inserting an existing id replaces it in place, which makes
/// `merge_from` order-independent with respect to the resulting document set.
/// Persisted as a SQLite file with embeddings stored as little-endian f32 BLOBs.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimensions: usize,
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
}

impl VectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &EmbeddedDocument> {
        self.entries.iter().map(|e| &e.doc)
    }

    pub fn get(&self, id: &str) -> Option<&EmbeddedDocument> {
        self.positions.get(id).map(|&i| &self.entries[i].doc)
    }

    /// Distinct file paths present in the store.
    pub fn paths(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.doc.metadata.path.as_str()).collect()
    }

    /// Add documents with their vectors. Existing ids are replaced in place.
    pub fn add(&mut self, docs: Vec<EmbeddedDocument>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if docs.len() != vectors.len() {
            bail!("{} documents but {} vectors", docs.len(), vectors.len());
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            bail!(
                "Dimension mismatch: store has {} dims, vector has {}",
                self.dimensions,
                bad.len()
            );
        }
        for (doc, vector) in docs.into_iter().zip(vectors) {
            self.upsert(Entry { doc, vector });
        }
        Ok(())
    }

    fn upsert(&mut self, entry: Entry) {
        match self.positions.get(&entry.doc.id) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.positions.insert(entry.doc.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Fold another store into this one.
    pub fn merge_from(&mut self, other: VectorStore) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if other.dimensions != self.dimensions {
            bail!(
                "Cannot merge store with {} dims into store with {} dims",
                other.dimensions,
                self.dimensions
            );
        }
        for entry in other.entries {
            self.upsert(entry);
        }
        Ok(())
    }

    /// Drop every document belonging to `path`. Returns how many were removed.
    pub fn remove_path(&mut self, path: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.doc.metadata.path != path);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.reindex_positions();
        }
        removed
    }

    fn reindex_positions(&mut self) {
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.doc.id.clone(), i))
            .collect();
    }

    /// Cosine similarity search. Returns up to `k` (document, score) pairs sorted descending;
    /// equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&EmbeddedDocument, f32)> {
        self.search_partition(query, k, None)
    }

    /// Like [`search`](Self::search), restricted to one partition when given.
    pub fn search_partition(
        &self,
        query: &[f32],
        k: usize,
        partition: Option<Partition>,
    ) -> Vec<(&EmbeddedDocument, f32)> {
        let mut scored: Vec<(&EmbeddedDocument, f32)> = self
            .entries
            .iter()
            .filter(|e| partition.map_or(true, |p| e.doc.partition == p))
            .map(|e| (&e.doc, cosine_similarity(query, &e.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Persist to `<dir>/store.db`, replacing any previous file atomically.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index dir {:?}", dir))?;
        let tmp = dir.join(format!(".{}.{}.tmp", STORE_FILE, uuid::Uuid::new_v4()));

        let result = self.write_db(&tmp);
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }

        let target = dir.join(STORE_FILE);
        if let Err(e) = std::fs::rename(&tmp, &target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to replace {:?}", target));
        }
        Ok(())
    }

    fn write_db(&self, path: &Path) -> Result<()> {
        let mut conn = Connection::open(path).context("Failed to create vector database")?;
        conn.execute_batch(
            "CREATE TABLE store_info (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE documents (
                seq INTEGER PRIMARY KEY,
                id TEXT NOT NULL UNIQUE,
                partition TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL
            );",
        )
        .context("Failed to initialize vector tables")?;

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO store_info (key, value) VALUES ('dimensions', ?1)",
            params![self.dimensions.to_string()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO documents (seq, id, partition, text, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (seq, entry) in self.entries.iter().enumerate() {
                let metadata = serde_json::to_string(&entry.doc.metadata)?;
                stmt.execute(params![
                    seq as i64,
                    entry.doc.id,
                    entry.doc.partition.as_str(),
                    entry.doc.text,
                    metadata,
                    embedding_to_bytes(&entry.vector),
                ])
                .context("Failed to write document")?;
            }
        }
        tx.commit().context("Failed to commit vector database")?;
        Ok(())
    }

    /// Restore from `<dir>/store.db`. Fails if the file is missing or unreadable.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(STORE_FILE);
        if !path.is_file() {
            bail!("No vector store at {:?}", path);
        }
        let conn = Connection::open(&path).context("Failed to open vector database")?;

        let dims: String = conn
            .query_row(
                "SELECT value FROM store_info WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .context("Vector database has no dimensions record")?;
        let dimensions: usize = dims.parse().context("Invalid dimensions record")?;

        let mut stmt = conn
            .prepare("SELECT id, partition, text, metadata, embedding FROM documents ORDER BY seq")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read documents")?;

        let mut store = Self::new(dimensions);
        for (id, partition, text, metadata, blob) in rows {
            let partition = Partition::parse(&partition)
                .ok_or_else(|| anyhow!("Unknown partition '{}' for {}", partition, id))?;
            let metadata: DocumentMetadata = serde_json::from_str(&metadata)
                .with_context(|| format!("Corrupt metadata for {}", id))?;
            let vector = bytes_to_embedding(&blob, dimensions)
                .with_context(|| format!("Corrupt embedding for {}", id))?;
            store.upsert(Entry {
                doc: EmbeddedDocument {
                    id,
                    text,
                    partition,
                    metadata,
                },
                vector,
            });
        }
        Ok(store)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm_a.is_finite() || !norm_b.is_finite() || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let sim = dot / (norm_a * norm_b);
    if sim.is_finite() { sim } else { 0.0 }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8], dimensions: usize) -> Result<Vec<f32>> {
    let expected_len = dimensions * 4;
    if bytes.len() != expected_len {
        bail!(
            "Dimension mismatch: expected {} bytes ({} dims), got {} bytes",
            expected_len,
            dimensions,
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
