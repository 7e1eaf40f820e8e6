//! Setup errors detected before the machine moves

use placer_core::config::ProcessorConfig;
use placer_core::model::{Board, Job, Location, Package, Part, Placement, Side, Status};
use placer_core::state::JobState;
use placer_core::{Entity, ErrorKind, JobError, JobProcessor, Outcome};
use placer_sim::fixtures::{self, single_board_job, machine_for, placement_status, run_to_end, PACKAGE};
use placer_sim::{Action, RecordingListener, RecordingSink, SimMachine, SimNozzle};

type Processor = JobProcessor<SimMachine, RecordingSink, RecordingListener>;

fn start(job: Job, machine: SimMachine) -> Processor {
    let mut processor = JobProcessor::new(
        machine,
        RecordingSink::new(),
        RecordingListener::new(),
        ProcessorConfig::default(),
    );
    processor.initialize(job);
    processor
}

/// First advance must fail with a fatal configuration error before any
/// motion, and the run must then clean up and end errored
fn expect_setup_error(mut processor: Processor) -> JobError {
    let err = processor.advance().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert!(err.is_fatal());
    assert!(processor.machine().actions().is_empty());
    assert_eq!(processor.job_state(), JobState::Error);
    assert_eq!(processor.sink().count("Job.Starting"), 0);

    assert!(!processor.advance().unwrap());
    assert_eq!(processor.outcome(), Some(Outcome::Error));
    assert_eq!(processor.machine().actions().last(), Some(&Action::Park));
    err
}

#[test]
fn test_duplicate_placement_id() {
    let board = Board::new("B1")
        .with_placement(Placement::new("R1", "P1", Location::ORIGIN))
        .with_placement(Placement::new("R1", "P2", Location::xy(5.0, 0.0)));
    let job = fixtures::job_with_board(board);
    let machine = machine_for(&job, 1);

    let err = expect_setup_error(start(job, machine));
    assert_eq!(err.entity, Entity::Board("B1".into()));
    assert_eq!(err.message, "Board B1 has more than one placement with id R1.");
}

#[test]
fn test_missing_part() {
    let mut job = single_board_job(&[("R1", "P1"), ("R2", "P2")]);
    let machine = machine_for(&job, 1);
    job.parts.remove("P2");

    let err = expect_setup_error(start(job, machine));
    assert_eq!(
        err.entity,
        Entity::Placement {
            board: "B1".into(),
            placement: "R2".into()
        }
    );
    assert_eq!(err.message, "Part not found for board B1, placement R2.");
}

#[test]
fn test_missing_package() {
    let mut job = single_board_job(&[("R1", "P1")]);
    let machine = machine_for(&job, 1);
    job.packages.remove(PACKAGE);

    let err = expect_setup_error(start(job, machine));
    assert_eq!(err.entity, Entity::Part("P1".into()));
    assert_eq!(err.message, "No package set for part P1.");
}

#[test]
fn test_no_compatible_tip() {
    let job = single_board_job(&[("R1", "P1"), ("R2", "P2")])
        .with_package(Package::new("QFN", ["T9"]))
        .with_part(Part::new("P2", "QFN").with_height(1.2));
    let machine = machine_for(&job, 2);

    let err = expect_setup_error(start(job, machine));
    assert_eq!(err.entity, Entity::Part("P2".into()));
    assert_eq!(err.message, "No compatible nozzle tip on any nozzle found for part P2.");
}

#[test]
fn test_no_compatible_tip_mentions_unknown_height() {
    let job = single_board_job(&[("R1", "P1")]).with_package(Package::new(PACKAGE, ["T9"]));
    let machine = machine_for(&job, 1);

    let err = expect_setup_error(start(job, machine));
    assert_eq!(
        err.message,
        "No compatible nozzle tip on any nozzle found for part P1; its part height is unknown."
    );
}

#[test]
fn test_too_many_nozzles() {
    let job = single_board_job(&[("R1", "P1")]);
    let machine = machine_for(&job, 17);

    let err = expect_setup_error(start(job, machine));
    assert_eq!(err.entity, Entity::Head);
    assert_eq!(err.message, "Head has 17 nozzles, at most 16 are supported.");
}

#[test]
fn test_tip_missing_from_machine() {
    // N1 would accept T9 but the machine has no such tip
    let job = single_board_job(&[("R1", "P1")]).with_package(Package::new(PACKAGE, ["T9"]));
    let machine = SimMachine::new()
        .with_tips([fixtures::TIP])
        .with_nozzle(SimNozzle::new("N1", [fixtures::TIP, "T9"]).with_tip(fixtures::TIP))
        .with_feeder(fixtures::feeder("F-P1", "P1", Location::xy(0.0, 10.0)));

    let err = expect_setup_error(start(job, machine));
    assert_eq!(err.entity, Entity::Part("P1".into()));
    assert_eq!(
        err.message,
        "No compatible nozzle tip on any nozzle found for part P1; its part height is unknown."
    );
}

#[test]
fn test_missing_feeder() {
    let job = single_board_job(&[("R1", "P1"), ("R2", "P2")]);
    let machine = fixtures::nozzles(1)
        .into_iter()
        .fold(SimMachine::new().with_tips([fixtures::TIP]), SimMachine::with_nozzle)
        .with_feeder(fixtures::feeder("F-P1", "P1", Location::xy(0.0, 10.0)));

    let err = expect_setup_error(start(job, machine));
    assert_eq!(err.message, "No compatible, enabled feeder found for part P2.");
}

#[test]
fn test_disabled_feeder_does_not_count() {
    let job = single_board_job(&[("R1", "P1")]);
    let mut disabled = fixtures::feeder("F-P1", "P1", Location::xy(0.0, 10.0));
    disabled.enabled = false;
    let machine = SimMachine::new()
        .with_tips([fixtures::TIP])
        .with_nozzle(SimNozzle::new("N1", [fixtures::TIP]).with_tip(fixtures::TIP))
        .with_feeder(disabled);

    let err = expect_setup_error(start(job, machine));
    assert_eq!(err.message, "No compatible, enabled feeder found for part P1.");
}

#[test]
fn test_skipped_placements_are_not_checked() {
    // Neither the disabled nor the bottom-side placement has a part in the
    // catalogue; both must be skipped rather than rejected
    let board = Board::new("B1")
        .with_placement(Placement::new("R1", "P1", Location::ORIGIN))
        .with_placement(Placement::new("R2", "GHOST", Location::xy(5.0, 0.0)).disabled())
        .with_placement(Placement::new("R3", "GHOST", Location::xy(10.0, 0.0)).with_side(Side::Bottom))
        .with_placement(Placement::fiducial("FID1", Location::xy(-1.0, -1.0)));
    let mut job = fixtures::job_with_board(board);
    job.parts.remove("GHOST");
    let machine = machine_for(&job, 1);

    let mut processor = start(job, machine);
    let report = run_to_end(&mut processor, 100);
    assert!(report.errors.is_empty());
    assert_eq!(processor.job_placements().len(), 1);
    assert_eq!(placement_status(&processor, "R1"), Some(Status::Complete));
    assert_eq!(placement_status(&processor, "R2"), None);
}

#[test]
fn test_disabled_board_is_ignored() {
    let mut job = single_board_job(&[("R1", "P1")]);
    let ghost = fixtures::board("B2", &[("R1", "MISSING")]);
    job.root = job
        .root
        .with_board(placer_core::model::BoardLocation::new("B2", ghost, Location::ORIGIN).disabled());
    let machine = machine_for(&job, 1);

    let mut processor = start(job, machine);
    let report = run_to_end(&mut processor, 100);
    assert!(report.errors.is_empty());
    assert_eq!(processor.outcome(), Some(Outcome::Finished));
    assert_eq!(processor.job_placements().len(), 1);
}

#[test]
fn test_feeders_prepared_in_travel_order() {
    let job = single_board_job(&[("R1", "P1"), ("R2", "P2"), ("R3", "P3")]);
    let mut far = fixtures::feeder("F-P1", "P1", Location::xy(0.0, 10.0));
    far.preparation_location = Some(Location::xy(300.0, 0.0));
    let mut near = fixtures::feeder("F-P2", "P2", Location::xy(0.0, 15.0));
    near.preparation_location = Some(Location::xy(10.0, 0.0));
    let plain = fixtures::feeder("F-P3", "P3", Location::xy(0.0, 20.0));
    let unused = fixtures::feeder("F-X", "X", Location::xy(0.0, 25.0));
    let machine = fixtures::nozzles(1)
        .into_iter()
        .fold(SimMachine::new().with_tips([fixtures::TIP]), SimMachine::with_nozzle)
        .with_feeder(far)
        .with_feeder(near)
        .with_feeder(plain)
        .with_feeder(unused);

    let mut processor = start(job, machine);
    assert!(processor.advance().unwrap());

    let prepared: Vec<(String, bool)> = processor
        .machine()
        .actions()
        .iter()
        .filter_map(|a| match a {
            Action::PrepareFeeder { feeder, visited } => Some((feeder.clone(), *visited)),
            _ => None,
        })
        .collect();
    assert_eq!(
        prepared,
        vec![
            ("F-P2".into(), true),
            ("F-P1".into(), true),
            ("F-P1".into(), false),
            ("F-P2".into(), false),
            ("F-P3".into(), false),
        ]
    );
    assert_eq!(processor.sink().count("Job.Starting"), 1);
    assert!(processor.listener().saw_text("Preparing feeders."));
}
