//! Simulated machine
//!
//! Every motion and hardware call is appended to an action log and advances
//! a simulated clock. Faults are injected per part, feeder or nozzle.

use std::collections::BTreeMap;

use log::debug;

use placer_core::error::MachineResult;
use placer_core::model::{AlignmentOffsets, Location};
use placer_core::traits::{
    AlignmentRequest, FeederInfo, Feeders, FiducialLocator, FiducialTarget, Head, Machine,
    NozzleInfo, PartAlignment, SensingCheckpoint,
};
use placer_core::MachineFault;

/// Aligner id reported for every aligned part
pub const BOTTOM_VISION: &str = "bottom-vision";

/// Simulated time taken by one recorded action
pub const ACTION_MS: u64 = 250;

/// A recorded machine call
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SafeZ,
    NozzleSafeZ(String),
    Discard(String),
    Park,
    LoadTip { nozzle: String, tip: String },
    Calibrate(String),
    Articulate(String),
    MoveToPick { nozzle: String, location: Location },
    Pick { nozzle: String, part: String },
    MoveToPlace { nozzle: String, location: Location },
    Place { nozzle: String, part: String },
    Feed { feeder: String, nozzle: String },
    PostPick(String),
    PrepareFeeder { feeder: String, visited: bool },
    Align { part: String, nozzle: String },
    LocateFiducials(Vec<String>),
}

/// How often an injected fault fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failures {
    /// Fail the next `n` calls, then succeed
    Times(u32),
    Always,
    /// Raise an interrupting fault on every call
    Interrupt,
}

impl Failures {
    /// Consume one failure, returning the fault to raise
    fn take(&mut self, message: String) -> Option<MachineFault> {
        match self {
            Failures::Always => Some(MachineFault::new(message)),
            Failures::Interrupt => Some(MachineFault::interrupting(message)),
            Failures::Times(0) => None,
            Failures::Times(n) => {
                *n -= 1;
                Some(MachineFault::new(message))
            }
        }
    }
}

/// A nozzle on the simulated head
#[derive(Debug, Clone, PartialEq)]
pub struct SimNozzle {
    pub id: String,
    pub loaded_tip: Option<String>,
    pub compatible_tips: Vec<String>,
    pub calibrated: bool,
    /// Nozzle position relative to the head
    pub offset: Location,
    pub part: Option<String>,
}

impl SimNozzle {
    pub fn new<I, T>(id: impl Into<String>, compatible_tips: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            id: id.into(),
            loaded_tip: None,
            compatible_tips: compatible_tips.into_iter().map(Into::into).collect(),
            calibrated: false,
            offset: Location::ORIGIN,
            part: None,
        }
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.loaded_tip = Some(tip.into());
        self
    }

    pub fn with_offset(mut self, offset: Location) -> Self {
        self.offset = offset;
        self
    }
}

#[derive(Debug, Clone, Default)]
struct Faults {
    pick: BTreeMap<String, Failures>,
    feed: BTreeMap<String, Failures>,
    align: BTreeMap<String, Failures>,
    /// Vacuum reading per nozzle, overriding the held part
    vacuum: BTreeMap<String, bool>,
    fiducials: Option<Failures>,
    safe_z: Option<Failures>,
    park: Option<Failures>,
}

/// In-memory pick-and-place machine
#[derive(Debug, Clone)]
pub struct SimMachine {
    nozzles: Vec<SimNozzle>,
    tips: Vec<String>,
    feeders: Vec<FeederInfo>,
    head: Option<Location>,
    park_location: Location,
    camera: Option<Location>,
    alignment_offsets: AlignmentOffsets,
    unaligned_parts: Vec<String>,
    fiducial_shift: Location,
    sensing: Vec<SensingCheckpoint>,
    faults: Faults,
    clock_ms: u64,
    actions: Vec<Action>,
}

impl Default for SimMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimMachine {
    pub fn new() -> Self {
        Self {
            nozzles: Vec::new(),
            tips: Vec::new(),
            feeders: Vec::new(),
            head: Some(Location::ORIGIN),
            park_location: Location::ORIGIN,
            camera: None,
            alignment_offsets: AlignmentOffsets {
                location: Location::ORIGIN,
                pre_rotated: false,
            },
            unaligned_parts: Vec::new(),
            fiducial_shift: Location::ORIGIN,
            sensing: Vec::new(),
            faults: Faults::default(),
            clock_ms: 0,
            actions: Vec::new(),
        }
    }

    pub fn with_nozzle(mut self, nozzle: SimNozzle) -> Self {
        self.nozzles.push(nozzle);
        self
    }

    /// Machine nozzle tips, in the order the planner scans them
    pub fn with_tips<I, T>(mut self, tips: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tips = tips.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_feeder(mut self, feeder: FeederInfo) -> Self {
        self.feeders.push(feeder);
        self
    }

    pub fn with_park_location(mut self, location: Location) -> Self {
        self.park_location = location;
        self
    }

    /// Forget the head position until the next move
    pub fn with_unknown_head_location(mut self) -> Self {
        self.head = None;
        self
    }

    /// Enable bottom vision for every part, reporting `offsets`
    pub fn with_bottom_vision(mut self, camera: Location, offsets: AlignmentOffsets) -> Self {
        self.camera = Some(camera);
        self.alignment_offsets = offsets;
        self
    }

    /// Report no aligner for `part`
    pub fn without_alignment(mut self, part: impl Into<String>) -> Self {
        self.unaligned_parts.push(part.into());
        self
    }

    /// Offset added to every holder origin by the fiducial check
    pub fn with_fiducial_shift(mut self, shift: Location) -> Self {
        self.fiducial_shift = shift;
        self
    }

    /// Enable vacuum sensing at the given checkpoints
    pub fn with_sensing(mut self, checkpoints: &[SensingCheckpoint]) -> Self {
        self.sensing = checkpoints.to_vec();
        self
    }

    pub fn fail_picks(&mut self, part: impl Into<String>, failures: Failures) {
        self.faults.pick.insert(part.into(), failures);
    }

    pub fn fail_feeds(&mut self, feeder: impl Into<String>, failures: Failures) {
        self.faults.feed.insert(feeder.into(), failures);
    }

    pub fn fail_alignment(&mut self, part: impl Into<String>, failures: Failures) {
        self.faults.align.insert(part.into(), failures);
    }

    /// Make vacuum sensing on `nozzle` report `part_on` regardless of the
    /// held part
    pub fn override_vacuum(&mut self, nozzle: impl Into<String>, part_on: bool) {
        self.faults.vacuum.insert(nozzle.into(), part_on);
    }

    pub fn fail_fiducials(&mut self, failures: Failures) {
        self.faults.fiducials = Some(failures);
    }

    /// Fail head moves to safe Z
    pub fn fail_safe_z(&mut self, failures: Failures) {
        self.faults.safe_z = Some(failures);
    }

    pub fn fail_park(&mut self, failures: Failures) {
        self.faults.park = Some(failures);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn clear_actions(&mut self) {
        self.actions.clear();
    }

    pub fn nozzle(&self, id: &str) -> Option<&SimNozzle> {
        self.nozzles.iter().find(|n| n.id == id)
    }

    pub fn feeder(&self, id: &str) -> Option<&FeederInfo> {
        self.feeders.iter().find(|f| f.id == id)
    }

    /// Parts placed, in order
    pub fn placed_parts(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Place { part, .. } => Some(part.as_str()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, action: Action) {
        self.clock_ms += ACTION_MS;
        self.actions.push(action);
    }

    fn nozzle_mut(&mut self, id: &str) -> MachineResult<&mut SimNozzle> {
        self.nozzles
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| MachineFault::new(format!("Unknown nozzle {}.", id)))
    }

    fn move_nozzle(&mut self, nozzle: &str, location: &Location) {
        if let Some(head) = self.to_head_location(nozzle, location) {
            self.head = Some(head);
        }
    }
}

impl Head for SimMachine {
    fn nozzles(&self) -> Vec<NozzleInfo> {
        self.nozzles
            .iter()
            .map(|n| NozzleInfo {
                id: n.id.clone(),
                loaded_tip: n.loaded_tip.clone(),
                compatible_tips: n.compatible_tips.clone(),
                calibrated: n.calibrated,
            })
            .collect()
    }

    fn nozzle_tips(&self) -> Vec<String> {
        self.tips.clone()
    }

    fn location(&self) -> Option<Location> {
        self.head
    }

    fn to_head_location(&self, nozzle: &str, location: &Location) -> Option<Location> {
        let offset = self.nozzle(nozzle)?.offset;
        Some(Location::new(
            location.x - offset.x,
            location.y - offset.y,
            location.z,
            location.rotation,
        ))
    }

    fn move_to_safe_z(&mut self) -> MachineResult<()> {
        if let Some(fault) = self.faults.safe_z.as_mut().and_then(|f| f.take("Safe Z move failed.".into())) {
            debug!("Injected safe Z fault");
            return Err(fault);
        }
        self.record(Action::SafeZ);
        Ok(())
    }

    fn move_nozzle_to_safe_z(&mut self, nozzle: &str) -> MachineResult<()> {
        self.nozzle_mut(nozzle)?;
        self.record(Action::NozzleSafeZ(nozzle.to_owned()));
        Ok(())
    }

    fn discard(&mut self, nozzle: &str) -> MachineResult<()> {
        self.nozzle_mut(nozzle)?.part = None;
        self.record(Action::Discard(nozzle.to_owned()));
        Ok(())
    }

    fn park(&mut self) -> MachineResult<()> {
        if let Some(fault) = self.faults.park.as_mut().and_then(|f| f.take("Park failed.".into())) {
            debug!("Injected park fault");
            return Err(fault);
        }
        self.head = Some(self.park_location);
        self.record(Action::Park);
        Ok(())
    }

    fn load_nozzle_tip(&mut self, nozzle: &str, tip: &str, allow_calibration: bool) -> MachineResult<()> {
        let sim = self.nozzle_mut(nozzle)?;
        if !sim.compatible_tips.iter().any(|t| t == tip) {
            return Err(MachineFault::new(format!(
                "Nozzle tip {} does not fit nozzle {}.",
                tip, nozzle
            )));
        }
        sim.loaded_tip = Some(tip.to_owned());
        sim.calibrated = allow_calibration;
        self.record(Action::LoadTip {
            nozzle: nozzle.to_owned(),
            tip: tip.to_owned(),
        });
        Ok(())
    }

    fn calibrate_nozzle_tip(&mut self, nozzle: &str) -> MachineResult<()> {
        self.nozzle_mut(nozzle)?.calibrated = true;
        self.record(Action::Calibrate(nozzle.to_owned()));
        Ok(())
    }

    fn prepare_for_articulation(&mut self, nozzle: &str, _from: &Location, _to: &Location) -> MachineResult<()> {
        self.record(Action::Articulate(nozzle.to_owned()));
        Ok(())
    }

    fn move_to_pick_location(&mut self, nozzle: &str, location: &Location) -> MachineResult<()> {
        self.move_nozzle(nozzle, location);
        self.record(Action::MoveToPick {
            nozzle: nozzle.to_owned(),
            location: *location,
        });
        Ok(())
    }

    fn pick(&mut self, nozzle: &str, part: &str) -> MachineResult<()> {
        let message = format!("Pick of {} failed.", part);
        if let Some(fault) = self.faults.pick.get_mut(part).and_then(|f| f.take(message)) {
            debug!("Injected pick fault for {}", part);
            return Err(fault);
        }
        self.nozzle_mut(nozzle)?.part = Some(part.to_owned());
        self.record(Action::Pick {
            nozzle: nozzle.to_owned(),
            part: part.to_owned(),
        });
        Ok(())
    }

    fn move_to_placement_location(&mut self, nozzle: &str, location: &Location, _part: &str) -> MachineResult<()> {
        self.move_nozzle(nozzle, location);
        self.record(Action::MoveToPlace {
            nozzle: nozzle.to_owned(),
            location: *location,
        });
        Ok(())
    }

    fn place(&mut self, nozzle: &str) -> MachineResult<()> {
        let part = self
            .nozzle_mut(nozzle)?
            .part
            .take()
            .ok_or_else(|| MachineFault::new(format!("Nozzle {} holds no part.", nozzle)))?;
        self.record(Action::Place {
            nozzle: nozzle.to_owned(),
            part,
        });
        Ok(())
    }

    fn part_on_nozzle(&self, nozzle: &str) -> Option<String> {
        self.nozzle(nozzle)?.part.clone()
    }

    fn sensing_enabled(&self, _nozzle: &str, checkpoint: SensingCheckpoint) -> bool {
        self.sensing.contains(&checkpoint)
    }

    fn is_part_on(&mut self, nozzle: &str) -> MachineResult<bool> {
        if let Some(&on) = self.faults.vacuum.get(nozzle) {
            return Ok(on);
        }
        Ok(self.nozzle_mut(nozzle)?.part.is_some())
    }

    fn is_part_off(&mut self, nozzle: &str) -> MachineResult<bool> {
        self.is_part_on(nozzle).map(|on| !on)
    }
}

impl Feeders for SimMachine {
    fn feeders(&self) -> Vec<FeederInfo> {
        self.feeders.clone()
    }

    fn feed(&mut self, feeder: &str, nozzle: &str) -> MachineResult<()> {
        let message = format!("Feed of {} failed.", feeder);
        if let Some(fault) = self.faults.feed.get_mut(feeder).and_then(|f| f.take(message)) {
            debug!("Injected feed fault for {}", feeder);
            return Err(fault);
        }
        self.record(Action::Feed {
            feeder: feeder.to_owned(),
            nozzle: nozzle.to_owned(),
        });
        Ok(())
    }

    fn post_pick(&mut self, feeder: &str, _nozzle: &str) -> MachineResult<()> {
        self.record(Action::PostPick(feeder.to_owned()));
        Ok(())
    }

    fn prepare_for_job(&mut self, feeder: &str, visited: bool) -> MachineResult<()> {
        if visited {
            let target = self
                .feeder(feeder)
                .and_then(|f| f.preparation_location);
            if let Some(location) = target {
                self.head = Some(location);
            }
        }
        self.record(Action::PrepareFeeder {
            feeder: feeder.to_owned(),
            visited,
        });
        Ok(())
    }

    fn set_enabled(&mut self, feeder: &str, enabled: bool) {
        if let Some(f) = self.feeders.iter_mut().find(|f| f.id == feeder) {
            f.enabled = enabled;
        }
    }
}

impl PartAlignment for SimMachine {
    fn aligner_for(&self, part: &str) -> Option<String> {
        self.camera?;
        if self.unaligned_parts.iter().any(|p| p == part) {
            return None;
        }
        Some(BOTTOM_VISION.to_owned())
    }

    fn alignment_location(&self) -> Option<Location> {
        self.camera
    }

    fn find_alignment_offsets(
        &mut self,
        _aligner: &str,
        request: &AlignmentRequest<'_>,
    ) -> MachineResult<AlignmentOffsets> {
        self.record(Action::Align {
            part: request.part.to_owned(),
            nozzle: request.nozzle.to_owned(),
        });
        let message = format!("Alignment of {} failed.", request.part);
        if let Some(fault) = self.faults.align.get_mut(request.part).and_then(|f| f.take(message)) {
            return Err(fault);
        }
        Ok(self.alignment_offsets)
    }
}

impl FiducialLocator for SimMachine {
    fn locate_all(&mut self, targets: &[FiducialTarget]) -> MachineResult<Vec<Location>> {
        self.record(Action::LocateFiducials(
            targets.iter().map(|t| t.id.clone()).collect(),
        ));
        let message = "Fiducial not found.".to_owned();
        if let Some(fault) = self.faults.fiducials.as_mut().and_then(|f| f.take(message)) {
            return Err(fault);
        }
        Ok(targets.iter().map(|t| t.origin.add(&self.fiducial_shift)).collect())
    }
}

impl Machine for SimMachine {
    fn now_ms(&self) -> u64 {
        self.clock_ms
    }
}
