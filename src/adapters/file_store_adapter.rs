//! File-backed persistence: one JSON snapshot plus one CSV per candle window.

use crate::domain::candle::Candle;
use crate::domain::error::SpotsimError;
use crate::domain::snapshot::Snapshot;
use crate::domain::symbol::file_stem;
use crate::ports::store_port::SnapshotStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "data.json";
const CANDLE_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    fn candles_path(&self, symbol: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}_candles.csv", file_stem(symbol)))
    }

    fn ensure_dir(&self) -> Result<(), SpotsimError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            SpotsimError::persistence(format!(
                "failed to create {}: {}",
                self.data_dir.display(),
                e
            ))
        })
    }

    /// Write to a sibling temp file and rename, so a crash mid-write never
    /// leaves a truncated document behind.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), SpotsimError> {
        self.ensure_dir()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| {
            SpotsimError::persistence(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            SpotsimError::persistence(format!("failed to replace {}: {}", path.display(), e))
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, SpotsimError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SpotsimError::persistence(format!(
            "failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
) -> Result<T, SpotsimError>
where
    T::Err: std::fmt::Display,
{
    let name = CANDLE_HEADER[index];
    record
        .get(index)
        .ok_or_else(|| SpotsimError::persistence(format!("missing {name} column")))?
        .trim()
        .parse()
        .map_err(|e| SpotsimError::persistence(format!("invalid {name} value: {e}")))
}

/// Timestamps may have been written as floats by older versions.
fn parse_timestamp(record: &csv::StringRecord) -> Result<i64, SpotsimError> {
    match parse_field::<i64>(record, 0) {
        Ok(ts) => Ok(ts),
        Err(_) => parse_field::<f64>(record, 0).map(|ts| ts as i64),
    }
}

impl SnapshotStore for FileStore {
    fn load_snapshot(&self) -> Result<Option<Snapshot>, SpotsimError> {
        let path = self.snapshot_path();
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_str(&content).map_err(|e| {
            SpotsimError::persistence(format!("invalid {}: {}", path.display(), e))
        })?;
        Ok(Some(snapshot))
    }

    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), SpotsimError> {
        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SpotsimError::persistence(format!("failed to encode snapshot: {e}")))?;
        self.write_atomic(&self.snapshot_path(), &json)
    }

    fn load_candles(&self, symbol: &str) -> Result<Option<Vec<Candle>>, SpotsimError> {
        let path = self.candles_path(symbol);
        let Some(content) = read_optional(&path)? else {
            return Ok(None);
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result
                .map_err(|e| SpotsimError::persistence(format!("CSV parse error: {e}")))?;
            candles.push(Candle {
                timestamp: parse_timestamp(&record)?,
                open: parse_field(&record, 1)?,
                high: parse_field(&record, 2)?,
                low: parse_field(&record, 3)?,
                close: parse_field(&record, 4)?,
                volume: parse_field(&record, 5)?,
            });
        }

        candles.sort_by_key(|c| c.timestamp);
        Ok(Some(candles))
    }

    fn save_candles(&self, symbol: &str, candles: &[Candle]) -> Result<(), SpotsimError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        let encode = |e: csv::Error| SpotsimError::persistence(format!("CSV write error: {e}"));
        wtr.write_record(CANDLE_HEADER).map_err(encode)?;
        for c in candles {
            wtr.write_record([
                c.timestamp.to_string(),
                c.open.to_string(),
                c.high.to_string(),
                c.low.to_string(),
                c.close.to_string(),
                c.volume.to_string(),
            ])
            .map_err(encode)?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| SpotsimError::persistence(format!("CSV flush error: {e}")))?;
        self.write_atomic(&self.candles_path(symbol), &bytes)
    }
}
