//! Persistent cache for null-model tables
//!
//! Null-model construction is O(N³) in the strain count, so the finished
//! tables are memoized in memory and optionally persisted as a
//! version-tagged bincode blob. The file name carries a blake3 fingerprint
//! of the `(dataset signature, weight tuple)` key, letting several datasets
//! share one cache directory.
//!
//! The read path never fails the caller: a missing, truncated, corrupt or
//! stale file is logged and treated as a cache miss.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::DatasetSignature;
use crate::scoring::metcalf::MetcalfWeights;
use crate::scoring::null_model::NullModel;
use crate::scoring::ScoringError;

/// Bump when the on-disk layout changes; readers discard other versions.
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    signature: DatasetSignature,
    model: NullModel,
}

type MemoKey = (DatasetSignature, [u64; 4]);

/// Memoized (and optionally persisted) null-model tables, keyed by dataset
/// signature and weight tuple.
#[derive(Debug, Default)]
pub struct NullModelCache {
    dir: Option<PathBuf>,
    memo: HashMap<MemoKey, Arc<NullModel>>,
}

impl NullModelCache {
    /// Purely in-memory cache.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache backed by a directory of binary blobs.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            memo: HashMap::new(),
        }
    }

    /// Fetch the tables for `(signature, weights)`, building them on a miss.
    pub fn get_or_build(
        &mut self,
        signature: DatasetSignature,
        weights: MetcalfWeights,
    ) -> Result<Arc<NullModel>, ScoringError> {
        let key = (signature, weights.key_bits());
        if let Some(model) = self.memo.get(&key) {
            return Ok(Arc::clone(model));
        }

        if let Some(path) = self.blob_path(signature, weights) {
            if let Some(model) = load_blob(&path, signature, weights) {
                info!(path = %path.display(), "loaded null model from cache");
                let model = Arc::new(model);
                self.memo.insert(key, Arc::clone(&model));
                return Ok(model);
            }
        }

        let model = NullModel::build(signature.n_strains, weights).map_err(|source| {
            ScoringError::NullModelConstruction { signature, source }
        })?;
        info!(%signature, "computed null-model tables");

        if let Some(path) = self.blob_path(signature, weights) {
            if let Err(err) = store_blob(&path, signature, &model) {
                // Persistence is an optimization; the computed tables stand.
                warn!(path = %path.display(), error = %err, "failed to persist null model");
            }
        }

        let model = Arc::new(model);
        self.memo.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Drop every memoized table (e.g. after entity counts change).
    pub fn invalidate(&mut self) {
        self.memo.clear();
    }

    fn blob_path(&self, signature: DatasetSignature, weights: MetcalfWeights) -> Option<PathBuf> {
        let dir = self.dir.as_deref()?;
        Some(dir.join(blob_name(signature, weights)))
    }
}

fn blob_name(signature: DatasetSignature, weights: MetcalfWeights) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&bincode::serialize(&signature).unwrap_or_default());
    for bits in weights.key_bits() {
        hasher.update(&bits.to_le_bytes());
    }
    let hex = hasher.finalize().to_hex();
    format!("metcalf-{}.bin", &hex.as_str()[..16])
}

fn load_blob(
    path: &Path,
    signature: DatasetSignature,
    weights: MetcalfWeights,
) -> Option<NullModel> {
    if !path.exists() {
        return None;
    }
    let cached = match read_blob(path) {
        Ok(cached) => cached,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "discarding unreadable null-model cache");
            return None;
        }
    };
    if cached.version != CACHE_VERSION {
        warn!(
            path = %path.display(),
            found = cached.version,
            expected = CACHE_VERSION,
            "discarding null-model cache with wrong version"
        );
        return None;
    }
    if cached.signature != signature
        || cached.model.n_strains() != signature.n_strains
        || cached.model.weights().key_bits() != weights.key_bits()
    {
        warn!(path = %path.display(), "discarding stale null-model cache");
        return None;
    }
    Some(cached.model)
}

fn read_blob(path: &Path) -> anyhow::Result<CacheFile> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    bincode::deserialize_from(reader).with_context(|| format!("decoding {}", path.display()))
}

fn store_blob(path: &Path, signature: DatasetSignature, model: &NullModel) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating cache directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let writer = BufWriter::new(file);
    let blob = CacheFile {
        version: CACHE_VERSION,
        signature,
        model: model.clone(),
    };
    bincode::serialize_into(writer, &blob)
        .with_context(|| format!("encoding {}", path.display()))
}
