//! Persistence port trait: whole-document load and save.

use crate::domain::candle::Candle;
use crate::domain::error::SpotsimError;
use crate::domain::snapshot::Snapshot;

pub trait SnapshotStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_snapshot(&self) -> Result<Option<Snapshot>, SpotsimError>;

    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), SpotsimError>;

    /// `Ok(None)` when no window has been saved for the symbol.
    fn load_candles(&self, symbol: &str) -> Result<Option<Vec<Candle>>, SpotsimError>;

    fn save_candles(&self, symbol: &str, candles: &[Candle]) -> Result<(), SpotsimError>;
}
