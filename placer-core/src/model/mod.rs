//! Job data model
//!
//! Boards, panels, parts and the run-scoped placement records the engine
//! works on.

pub mod board;
pub mod job;
pub mod ledger;
pub mod location;
pub mod part;
pub mod placement;

pub use board::{
    Board, BoardLocation, ErrorHandling, HolderLocation, PanelLocation, Placement, PlacementType,
    Side,
};
pub use job::Job;
pub use ledger::{PlacedLedger, PlacedLedgerError, LEDGER_MAGIC, LEDGER_VERSION};
pub use location::Location;
pub use part::{Package, Part};
pub use placement::{AlignmentOffsets, JobPlacement, JobPlacementId, PlannedPlacement, Status};
