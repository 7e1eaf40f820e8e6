//! Head and nozzle traits

use crate::error::MachineResult;
use crate::model::Location;

/// Points in a pick-and-place cycle where vacuum sensing may be checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensingCheckpoint {
    BeforePick,
    AfterPick,
    Align,
    BeforePlace,
    AfterPlace,
}

/// Snapshot of a nozzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NozzleInfo {
    pub id: String,
    pub loaded_tip: Option<String>,
    pub compatible_tips: Vec<String>,
    /// The loaded tip has been calibrated
    pub calibrated: bool,
}

impl NozzleInfo {
    pub fn accepts(&self, tip: &str) -> bool {
        self.compatible_tips.iter().any(|t| t == tip)
    }
}

/// Trait for the placement head
///
/// Nozzles are addressed by id. Motion calls block until the move is done.
pub trait Head {
    /// Nozzles in head order
    fn nozzles(&self) -> Vec<NozzleInfo>;

    /// Every nozzle tip known to the machine, in machine order
    fn nozzle_tips(&self) -> Vec<String>;

    /// Current head location, if known
    fn location(&self) -> Option<Location>;

    /// Head location that puts `nozzle` at `location`
    fn to_head_location(&self, nozzle: &str, location: &Location) -> Option<Location>;

    fn move_to_safe_z(&mut self) -> MachineResult<()>;

    fn move_nozzle_to_safe_z(&mut self, nozzle: &str) -> MachineResult<()>;

    /// Drop whatever part `nozzle` holds
    fn discard(&mut self, nozzle: &str) -> MachineResult<()>;

    /// Discard on every nozzle that holds a part
    fn discard_all(&mut self) -> MachineResult<()> {
        for nozzle in self.nozzles() {
            if self.part_on_nozzle(&nozzle.id).is_some() {
                self.discard(&nozzle.id)?;
            }
        }
        Ok(())
    }

    fn park(&mut self) -> MachineResult<()>;

    fn load_nozzle_tip(&mut self, nozzle: &str, tip: &str, allow_calibration: bool) -> MachineResult<()>;

    fn calibrate_nozzle_tip(&mut self, nozzle: &str) -> MachineResult<()>;

    /// Prepare `nozzle` for a pick at `from` followed by a place at `to`
    fn prepare_for_articulation(&mut self, nozzle: &str, from: &Location, to: &Location) -> MachineResult<()>;

    fn move_to_pick_location(&mut self, nozzle: &str, location: &Location) -> MachineResult<()>;

    fn pick(&mut self, nozzle: &str, part: &str) -> MachineResult<()>;

    fn move_to_placement_location(&mut self, nozzle: &str, location: &Location, part: &str) -> MachineResult<()>;

    fn place(&mut self, nozzle: &str) -> MachineResult<()>;

    /// Part the head believes `nozzle` is holding
    fn part_on_nozzle(&self, nozzle: &str) -> Option<String>;

    /// Check if vacuum sensing is enabled for `nozzle` at `checkpoint`
    fn sensing_enabled(&self, nozzle: &str, checkpoint: SensingCheckpoint) -> bool;

    /// Vacuum sensing reports a part on the nozzle
    fn is_part_on(&mut self, nozzle: &str) -> MachineResult<bool>;

    /// Vacuum sensing reports no part on the nozzle
    fn is_part_off(&mut self, nozzle: &str) -> MachineResult<bool>;
}
