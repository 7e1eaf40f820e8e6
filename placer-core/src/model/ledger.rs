//! Placed flags of a job
//!
//! Records which placements are already on the board so a resumed run
//! skips them. The ledger can be persisted by the host using postcard.

use core::fmt;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Magic number to identify a valid ledger
pub const LEDGER_MAGIC: u32 = 0x504C4344; // "PLCD"

/// Current ledger format version
pub const LEDGER_VERSION: u8 = 1;

/// Ledger decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlacedLedgerError {
    /// Serialization failed
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Magic number did not match
    InvalidMagic,
    /// Format version is not supported
    VersionMismatch,
}

impl fmt::Display for PlacedLedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PlacedLedgerError::Serialize => "ledger serialization failed",
            PlacedLedgerError::Deserialize => "ledger deserialization failed",
            PlacedLedgerError::InvalidMagic => "ledger magic mismatch",
            PlacedLedgerError::VersionMismatch => "ledger version mismatch",
        };
        f.write_str(msg)
    }
}

/// Placed flags keyed by (board location id, placement id)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlacedLedger {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    placed: BTreeSet<(String, String)>,
}

impl Default for PlacedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PlacedLedger {
    pub const fn new() -> Self {
        Self {
            magic: LEDGER_MAGIC,
            version: LEDGER_VERSION,
            placed: BTreeSet::new(),
        }
    }

    /// Check if the header is valid
    pub fn is_valid(&self) -> bool {
        self.magic == LEDGER_MAGIC && self.version == LEDGER_VERSION
    }

    pub fn is_placed(&self, board: &str, placement: &str) -> bool {
        self.placed.contains(&(board.to_owned(), placement.to_owned()))
    }

    pub fn set_placed(&mut self, board: &str, placement: &str, placed: bool) {
        let key = (board.to_owned(), placement.to_owned());
        if placed {
            self.placed.insert(key);
        } else {
            self.placed.remove(&key);
        }
    }

    /// Forget every placed flag
    pub fn clear(&mut self) {
        self.placed.clear();
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.placed.iter().map(|(b, p)| (b.as_str(), p.as_str()))
    }

    /// Encode to postcard bytes
    #[cfg(feature = "serde")]
    pub fn to_bytes(&self) -> Result<Vec<u8>, PlacedLedgerError> {
        postcard::to_allocvec(self).map_err(|_| PlacedLedgerError::Serialize)
    }

    /// Decode from postcard bytes, validating the header
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PlacedLedgerError> {
        let ledger: PlacedLedger =
            postcard::from_bytes(bytes).map_err(|_| PlacedLedgerError::Deserialize)?;
        if ledger.magic != LEDGER_MAGIC {
            return Err(PlacedLedgerError::InvalidMagic);
        }
        if ledger.version != LEDGER_VERSION {
            return Err(PlacedLedgerError::VersionMismatch);
        }
        Ok(ledger)
    }
}
