//! Persisted catalog: a light identity index and a heavy fingerprint store.
//!
//! Both files are JSON arrays describing the same entries in the same id
//! order. The index exists so metadata lookups can skip the hash payload.
//!
//! # Layout
//!
//! ```text
//! <catalog_dir>/
//!   catalog.current            name of the live generation
//!   generation-XXXXXX/
//!     catalog_index.json
//!     catalog_fingerprints.json
//! ```
//!
//! A save writes both files into a fresh generation directory and then
//! replaces `catalog.current` with a single rename. Readers resolve the
//! pointer once and read both files from the same generation, so they see
//! either the old pair or the new pair, never a mix. The previous generation
//! is kept until the next save so a reader that resolved the pointer just
//! before a switch can finish.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{CardId, CardRecord, Catalog, CatalogEntry};
use crate::config::CatalogConfig;
use crate::error::{CardsightError, Result};
use crate::fingerprint::{Fingerprint, OrientedFingerprints, Orientation, PerceptualHash};

/// Name of the pointer file naming the live generation.
pub const CURRENT_POINTER: &str = "catalog.current";

/// Prefix of generation directory names.
pub const GENERATION_PREFIX: &str = "generation-";

/// Reads retried when a generation disappears mid-read (two saves raced it).
const READ_ATTEMPTS: usize = 5;

/// One row of the fingerprint store.
///
/// Field names are the family prefix (`avg`, `w`, `p`, `d`) followed by the
/// orientation suffix (none, `mir`, `ud`, `udmir`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub id: CardId,
    pub set_name: String,
    pub number_in_set: String,
    pub avg: PerceptualHash,
    pub avgmir: PerceptualHash,
    pub avgud: PerceptualHash,
    pub avgudmir: PerceptualHash,
    pub w: PerceptualHash,
    pub wmir: PerceptualHash,
    pub wud: PerceptualHash,
    pub wudmir: PerceptualHash,
    pub p: PerceptualHash,
    pub pmir: PerceptualHash,
    pub pud: PerceptualHash,
    pub pudmir: PerceptualHash,
    pub d: PerceptualHash,
    pub dmir: PerceptualHash,
    pub dud: PerceptualHash,
    pub dudmir: PerceptualHash,
}

impl FingerprintRecord {
    fn from_entry(entry: &CatalogEntry) -> Self {
        let [id, mir, ud, udmir] = Orientation::ALL.map(|o| *entry.fingerprints.get(o));
        Self {
            id: entry.record.id,
            set_name: entry.record.set_name.clone(),
            number_in_set: entry.record.number_in_set.clone(),
            avg: id.average,
            avgmir: mir.average,
            avgud: ud.average,
            avgudmir: udmir.average,
            w: id.wavelet,
            wmir: mir.wavelet,
            wud: ud.wavelet,
            wudmir: udmir.wavelet,
            p: id.perceptual,
            pmir: mir.perceptual,
            pud: ud.perceptual,
            pudmir: udmir.perceptual,
            d: id.difference,
            dmir: mir.difference,
            dud: ud.difference,
            dudmir: udmir.difference,
        }
    }

    fn record(&self) -> CardRecord {
        CardRecord {
            id: self.id,
            set_name: self.set_name.clone(),
            number_in_set: self.number_in_set.clone(),
        }
    }

    fn into_entry(self) -> CatalogEntry {
        let record = self.record();
        let fingerprint = |average, wavelet, perceptual, difference| Fingerprint {
            average,
            wavelet,
            perceptual,
            difference,
        };
        CatalogEntry {
            record,
            fingerprints: OrientedFingerprints::new([
                fingerprint(self.avg, self.w, self.p, self.d),
                fingerprint(self.avgmir, self.wmir, self.pmir, self.dmir),
                fingerprint(self.avgud, self.wud, self.pud, self.dud),
                fingerprint(self.avgudmir, self.wudmir, self.pudmir, self.dudmir),
            ]),
        }
    }
}

/// One complete, immutable pair of catalog files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogGeneration {
    dir: PathBuf,
    index_path: PathBuf,
    store_path: PathBuf,
}

impl CatalogGeneration {
    fn new(dir: PathBuf, index_file: &str, store_file: &str) -> Self {
        Self {
            index_path: dir.join(index_file),
            store_path: dir.join(store_file),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    fn is_complete(&self) -> bool {
        self.index_path.is_file() && self.store_path.is_file()
    }

    fn load(&self) -> Result<Catalog> {
        let index: Vec<CardRecord> = read_json(&self.index_path)?;
        let rows: Vec<FingerprintRecord> = read_json(&self.store_path)?;

        if index.len() != rows.len() {
            return Err(CardsightError::CatalogCorrupt(format!(
                "identity index has {} entries, fingerprint store has {}",
                index.len(),
                rows.len()
            )));
        }
        for (record, row) in index.iter().zip(rows.iter()) {
            if *record != row.record() {
                return Err(CardsightError::CatalogCorrupt(format!(
                    "identity index entry {} ({}/{}) disagrees with \
                     fingerprint store entry {} ({}/{})",
                    record.id,
                    record.set_name,
                    record.number_in_set,
                    row.id,
                    row.set_name,
                    row.number_in_set
                )));
            }
        }

        Catalog::from_entries(rows.into_iter().map(FingerprintRecord::into_entry).collect())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = File::open(path)
        .map(BufReader::new)
        .map_err(|e| CardsightError::io(path, e))?;
    serde_json::from_reader(reader)
        .map_err(|e| CardsightError::CatalogCorrupt(format!("{}: {e}", path.display())))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| CardsightError::io(path, e))?;
    let mut writer = BufWriter::new(&file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| CardsightError::io(path, e))?;
    drop(writer);
    file.sync_all().map_err(|e| CardsightError::io(path, e))
}

fn is_not_found(err: &CardsightError) -> bool {
    matches!(err, CardsightError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
}

/// The persisted catalog of one catalog directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStore {
    dir: PathBuf,
    index_file: String,
    store_file: String,
}

impl CatalogStore {
    pub fn new(dir: impl Into<PathBuf>, index_file: &str, store_file: &str) -> Self {
        Self {
            dir: dir.into(),
            index_file: index_file.to_string(),
            store_file: store_file.to_string(),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(&config.catalog_dir, &config.index_file, &config.store_file)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pointer_path(&self) -> PathBuf {
        self.dir.join(CURRENT_POINTER)
    }

    fn generation(&self, name: &str) -> CatalogGeneration {
        CatalogGeneration::new(self.dir.join(name), &self.index_file, &self.store_file)
    }

    fn current_name(&self) -> Result<Option<String>> {
        let pointer = self.pointer_path();
        let name = match fs::read_to_string(&pointer) {
            Ok(name) => name.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CardsightError::io(&pointer, e)),
        };
        let plain = Path::new(&name).file_name().is_some_and(|n| n == name.as_str());
        if !plain || !name.starts_with(GENERATION_PREFIX) {
            return Err(CardsightError::CatalogCorrupt(format!(
                "{} names {name:?}, not a generation directory",
                pointer.display()
            )));
        }
        Ok(Some(name))
    }

    /// The live generation, if a catalog has ever been saved here.
    pub fn current(&self) -> Result<Option<CatalogGeneration>> {
        Ok(self.current_name()?.map(|name| self.generation(&name)))
    }

    /// Whether a live generation with both files is present.
    pub fn exists(&self) -> bool {
        matches!(self.current(), Ok(Some(generation)) if generation.is_complete())
    }

    /// Run `read` against the live generation, re-resolving the pointer if
    /// the generation vanished underneath it.
    fn read_current<T>(&self, read: impl Fn(&CatalogGeneration) -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            let generation = self
                .current()?
                .ok_or_else(|| CardsightError::CatalogNotInitialized(self.dir.clone()))?;
            match read(&generation) {
                Err(e) if is_not_found(&e) && attempt < READ_ATTEMPTS => {
                    debug!(
                        generation = %generation.dir.display(),
                        "Generation replaced mid-read; retrying"
                    );
                    attempt += 1;
                }
                Err(e) if is_not_found(&e) => {
                    return Err(CardsightError::CatalogCorrupt(format!(
                        "{} names an incomplete generation: {e}",
                        self.pointer_path().display()
                    )));
                }
                result => return result,
            }
        }
    }

    /// Modification time of the live fingerprint store.
    pub fn store_modified(&self) -> Result<SystemTime> {
        self.read_current(|generation| {
            fs::metadata(&generation.store_path)
                .and_then(|m| m.modified())
                .map_err(|e| CardsightError::io(&generation.store_path, e))
        })
    }

    /// Number of entries in the fingerprint store, without decoding hashes.
    pub fn persisted_len(&self) -> Result<usize> {
        self.read_current(|generation| {
            let rows: Vec<IgnoredAny> = read_json(&generation.store_path)?;
            Ok(rows.len())
        })
    }

    /// Load only the identity index.
    pub fn load_index(&self) -> Result<Vec<CardRecord>> {
        self.read_current(|generation| read_json(&generation.index_path))
    }

    /// Load and cross-check both files of the live generation.
    pub fn load(&self) -> Result<Catalog> {
        let catalog = self.read_current(CatalogGeneration::load)?;
        debug!(entries = catalog.len(), dir = %self.dir.display(), "Loaded catalog");
        Ok(catalog)
    }

    /// Replace the persisted catalog.
    ///
    /// Both files are fully written and synced into a new generation before
    /// the pointer is switched, so a failure at any point leaves the previous
    /// catalog live and intact.
    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CardsightError::io(&self.dir, e))?;
        let previous = self.current_name().ok().flatten();

        let index: Vec<&CardRecord> = catalog.records().collect();
        let rows: Vec<FingerprintRecord> =
            catalog.entries().map(FingerprintRecord::from_entry).collect();

        let staging = tempfile::Builder::new()
            .prefix(GENERATION_PREFIX)
            .tempdir_in(&self.dir)
            .map_err(|e| CardsightError::io(&self.dir, e))?;
        let name = staging.path().file_name().map_or_else(String::new, |n| {
            n.to_string_lossy().into_owned()
        });
        let generation = self.generation(&name);
        write_json(&generation.index_path, &index)?;
        write_json(&generation.store_path, &rows)?;

        let kept = staging.keep();
        if let Err(e) = self.switch_to(&name) {
            let _ = fs::remove_dir_all(&kept);
            return Err(e);
        }
        self.prune(&name, previous.as_deref());

        info!(
            entries = catalog.len(),
            generation = %generation.dir.display(),
            "Catalog saved"
        );
        Ok(())
    }

    /// Atomically point `catalog.current` at generation `name`.
    fn switch_to(&self, name: &str) -> Result<()> {
        let pointer = self.pointer_path();
        let tmp = NamedTempFile::new_in(&self.dir).map_err(|e| CardsightError::io(&self.dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            writeln!(writer, "{name}")
                .and_then(|_| writer.flush())
                .map_err(|e| CardsightError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| CardsightError::io(tmp.path(), e))?;
        tmp.persist(&pointer)
            .map_err(|e| CardsightError::io(&pointer, e.error))?;
        Ok(())
    }

    /// Remove generations other than the live one and its predecessor,
    /// including any left behind by an interrupted save.
    fn prune(&self, current: &str, previous: Option<&str>) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot list catalog directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(GENERATION_PREFIX) || name == current || Some(name) == previous {
                continue;
            }
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match fs::remove_dir_all(&path) {
                Ok(()) => debug!(generation = %path.display(), "Removed old generation"),
                Err(e) => {
                    warn!(generation = %path.display(), error = %e, "Cannot remove old generation")
                }
            }
        }
    }
}
