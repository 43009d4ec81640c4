pub mod bands;
pub mod domain;
mod normalizer;
mod parser;
pub mod schema;
pub mod summaries;
pub mod taxonomy;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info};

use domain::{ProgramId, ProgramRecord};
use schema::{Column, SchemaCapabilities};

#[derive(Debug, thiserror::Error)]
pub enum CatalogImportError {
    #[error("failed to read program catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid program catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("program catalog is missing required column '{0}'")]
    MissingColumn(Column),
}

/// Immutable snapshot of the program dataset.
///
/// Records are reference counted so tier partitions and shortlists can hold
/// on to them without copying rows; nothing in the screening engine mutates
/// a catalog once it is built.
#[derive(Debug, Clone)]
pub struct ProgramCatalog {
    records: Vec<Arc<ProgramRecord>>,
    capabilities: SchemaCapabilities,
    fingerprint: u64,
}

impl ProgramCatalog {
    /// Build a catalog from records assembled in memory. Ids are reassigned
    /// to row ordinals so lookups stay consistent.
    pub fn from_records(records: Vec<ProgramRecord>, capabilities: SchemaCapabilities) -> Self {
        let records: Vec<Arc<ProgramRecord>> = records
            .into_iter()
            .enumerate()
            .map(|(index, mut record)| {
                record.id = ProgramId(index as u32);
                Arc::new(record)
            })
            .collect();

        let mut hasher = DefaultHasher::new();
        for record in &records {
            record.university.hash(&mut hasher);
            record.track.hash(&mut hasher);
            record.unit.hash(&mut hasher);
        }

        Self {
            records,
            capabilities,
            fingerprint: hasher.finish(),
        }
    }

    pub fn records(&self) -> &[Arc<ProgramRecord>] {
        &self.records
    }

    pub fn get(&self, id: ProgramId) -> Option<&Arc<ProgramRecord>> {
        self.records.get(id.0 as usize)
    }

    pub fn capabilities(&self) -> &SchemaCapabilities {
        &self.capabilities
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct CatalogImporter;

impl CatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ProgramCatalog, CatalogImportError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<ProgramCatalog, CatalogImportError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<ProgramCatalog, CatalogImportError> {
        let parsed = parser::parse_catalog(bytes)?;
        if let Some(column) = parsed.capabilities.first_missing(&Column::REQUIRED) {
            return Err(CatalogImportError::MissingColumn(column));
        }

        if parsed.skipped_rows > 0 {
            debug!(
                skipped = parsed.skipped_rows,
                "skipped catalog rows without university or unit"
            );
        }

        let fingerprint = fingerprint(bytes);
        let catalog = ProgramCatalog {
            records: parsed.records.into_iter().map(Arc::new).collect(),
            capabilities: parsed.capabilities,
            fingerprint,
        };

        info!(
            programs = catalog.len(),
            columns = catalog.capabilities.columns().count(),
            fingerprint = format_args!("{fingerprint:016x}"),
            "loaded program catalog"
        );

        Ok(catalog)
    }
}

fn fingerprint(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

static SHARED_CACHE: OnceLock<CatalogCache> = OnceLock::new();

/// Memoizes the parsed catalog by the fingerprint of its source bytes.
///
/// Re-reading an unchanged export returns the shared handle instead of
/// parsing again. A changed file replaces the held snapshot, so the cache
/// never keeps more than one catalog alive.
#[derive(Debug, Default)]
pub struct CatalogCache {
    current: Mutex<Option<(u64, Arc<ProgramCatalog>)>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by dataset loading.
    pub fn shared() -> &'static CatalogCache {
        SHARED_CACHE.get_or_init(CatalogCache::new)
    }

    pub fn load_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Arc<ProgramCatalog>, CatalogImportError> {
        let bytes = std::fs::read(path)?;
        self.load_bytes(&bytes)
    }

    pub fn load_bytes(&self, bytes: &[u8]) -> Result<Arc<ProgramCatalog>, CatalogImportError> {
        let key = fingerprint(bytes);
        if let Some((cached, catalog)) = self.lock().as_ref() {
            if *cached == key {
                debug!(fingerprint = format_args!("{key:016x}"), "catalog cache hit");
                return Ok(Arc::clone(catalog));
            }
        }

        let catalog = Arc::new(CatalogImporter::from_bytes(bytes)?);
        if let Some((evicted, _)) = self.lock().replace((key, Arc::clone(&catalog))) {
            if evicted != key {
                debug!(
                    evicted = format_args!("{evicted:016x}"),
                    "replaced cached catalog"
                );
            }
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        usize::from(self.lock().is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(u64, Arc<ProgramCatalog>)>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "대학명,전형구분,모집단위,2024년_입결70%\n\
서강대학교,교과,경제학과,1.6\n\
국민대학교,교과,경영학부,2.4\n";

    #[test]
    fn importer_rejects_catalog_without_unit_column() {
        let csv = "대학명,전형구분,2024년_입결70%\n서강대학교,교과,1.6\n";
        let error = CatalogImporter::from_reader(Cursor::new(csv)).expect_err("unit required");
        assert!(matches!(
            error,
            CatalogImportError::MissingColumn(Column::Unit)
        ));
        assert!(error.to_string().contains("모집단위"));
    }

    #[test]
    fn importer_assigns_row_ordinals() {
        let catalog = CatalogImporter::from_reader(Cursor::new(SAMPLE)).expect("catalog loads");
        assert_eq!(catalog.len(), 2);
        let second = catalog.get(ProgramId(1)).expect("second row");
        assert_eq!(second.university, "국민대학교");
        assert!(catalog.capabilities().has(Column::EntryScore70));
        assert!(!catalog.capabilities().has(Column::FillRate2024));
    }

    #[test]
    fn cache_reuses_catalog_for_identical_bytes() {
        let cache = CatalogCache::new();
        let first = cache.load_bytes(SAMPLE.as_bytes()).expect("first load");
        let second = cache.load_bytes(SAMPLE.as_bytes()).expect("second load");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let changed = SAMPLE.replace("1.6", "1.7");
        let third = cache.load_bytes(changed.as_bytes()).expect("changed load");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_ne!(first.fingerprint(), third.fingerprint());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_holds_only_the_latest_snapshot() {
        let cache = CatalogCache::new();
        assert!(cache.is_empty());

        let first = cache.load_bytes(SAMPLE.as_bytes()).expect("first load");
        let changed = SAMPLE.replace("1.6", "1.7");
        cache.load_bytes(changed.as_bytes()).expect("changed load");
        assert_eq!(cache.len(), 1);
        // the evicted snapshot is now only held by this test
        assert_eq!(Arc::strong_count(&first), 1);

        let reloaded = cache.load_bytes(SAMPLE.as_bytes()).expect("reload");
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.fingerprint(), first.fingerprint());
    }

    #[test]
    fn import_errors_carry_their_source() {
        let io = CatalogImportError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "programs.csv",
        ));
        assert!(matches!(io, CatalogImportError::Io(_)));
        assert_eq!(io.to_string(), "failed to read program catalog: programs.csv");
        assert!(std::error::Error::source(&io).is_some());

        let missing = CatalogImportError::MissingColumn(Column::University);
        assert!(std::error::Error::source(&missing).is_none());
    }
}
