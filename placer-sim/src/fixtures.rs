//! Job and machine builders for tests and demos

use std::collections::BTreeSet;

use placer_core::model::{
    Board, BoardLocation, Job, JobPlacement, Location, Package, PanelLocation, Part, Placement, Status,
};
use placer_core::traits::{EventSink, FeederInfo, JobListener, Machine};
use placer_core::{JobError, JobProcessor};

use crate::machine::{SimMachine, SimNozzle};

/// Tip loaded on every standard nozzle
pub const TIP: &str = "T1";
/// Tip every standard nozzle accepts but none has loaded
pub const SPARE_TIP: &str = "T2";
pub const PACKAGE: &str = "0603";
pub const BOARD: &str = "B1";
pub const PANEL: &str = "Panel";

/// Spacing between generated placements and feeders
const PITCH: f64 = 5.0;

/// Enabled feeder with no retries
pub fn feeder(id: impl Into<String>, part: impl Into<String>, pick_location: Location) -> FeederInfo {
    FeederInfo {
        id: id.into(),
        part: Some(part.into()),
        enabled: true,
        feed_retry_count: 0,
        pick_retry_count: 0,
        pick_location,
        preparation_location: None,
    }
}

/// Board named `id` with one placement per `(placement, part)` pair
pub fn board(id: &str, placements: &[(&str, &str)]) -> Board {
    placements
        .iter()
        .enumerate()
        .fold(Board::new(id), |board, (i, (placement, part))| {
            board.with_placement(Placement::new(*placement, *part, Location::xy(i as f64 * PITCH, 0.0)))
        })
}

/// Single-board job in the standard package
pub fn single_board_job(placements: &[(&str, &str)]) -> Job {
    job_with_board(board(BOARD, placements))
}

/// Job holding `board` as [`BOARD`] at (100, 50), with a standard part for
/// every part id it references
pub fn job_with_board(board: Board) -> Job {
    let ids: BTreeSet<String> = board.placements.iter().filter_map(|p| p.part.clone()).collect();
    let location = BoardLocation::new(BOARD, board, Location::xy(100.0, 50.0));
    let root = PanelLocation::new(PANEL, Location::ORIGIN).with_board(location);
    ids.into_iter().fold(
        Job::new(root).with_package(Package::new(PACKAGE, [TIP])),
        |job, id| job.with_part(Part::new(id, PACKAGE)),
    )
}

/// `count` standard nozzles named `N1..`, each with [`TIP`] loaded
pub fn nozzles(count: usize) -> Vec<SimNozzle> {
    (1..=count)
        .map(|i| {
            SimNozzle::new(format!("N{}", i), [TIP, SPARE_TIP])
                .with_tip(TIP)
                .with_offset(Location::xy((i - 1) as f64 * 20.0, 0.0))
        })
        .collect()
}

/// Machine with `nozzle_count` standard nozzles and one feeder `F-<part>`
/// per part of `job`
pub fn machine_for(job: &Job, nozzle_count: usize) -> SimMachine {
    let machine = nozzles(nozzle_count)
        .into_iter()
        .fold(SimMachine::new().with_tips([TIP, SPARE_TIP]), SimMachine::with_nozzle);
    job.parts.keys().enumerate().fold(machine, |machine, (i, part)| {
        machine.with_feeder(feeder(
            format!("F-{}", part),
            part.as_str(),
            Location::xy(0.0, 10.0 + i as f64 * PITCH),
        ))
    })
}

/// What a run to completion produced
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// `advance` calls made
    pub steps: usize,
    pub errors: Vec<JobError>,
    /// The run ended within the step limit
    pub terminated: bool,
}

/// Advance until the run ends or `limit` calls were made
pub fn run_to_end<M, S, L>(processor: &mut JobProcessor<M, S, L>, limit: usize) -> RunReport
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    let mut report = RunReport::default();
    while report.steps < limit {
        report.steps += 1;
        match processor.advance() {
            Ok(true) => {}
            Ok(false) => {
                report.terminated = true;
                break;
            }
            Err(err) => report.errors.push(err),
        }
    }
    report
}

/// Status of the run's placement with id `placement`
pub fn placement_status<M, S, L>(processor: &JobProcessor<M, S, L>, placement: &str) -> Option<Status>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    processor
        .job_placements()
        .iter()
        .find(|p| p.placement == placement)
        .map(JobPlacement::status)
}
