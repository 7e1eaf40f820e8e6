//! Run lifecycle: state reporting, abort, cleanup and shared access

use std::sync::Arc;
use std::thread;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};

use placer_core::config::ProcessorConfig;
use placer_core::model::ErrorHandling;
use placer_core::state::JobState;
use placer_core::{ErrorKind, JobProcessor, Outcome, SharedJobProcessor};
use placer_sim::fixtures::{machine_for, run_to_end, single_board_job};
use placer_sim::{Action, Failures, RecordingListener, RecordingSink, SimMachine};

type Processor = JobProcessor<SimMachine, RecordingSink, RecordingListener>;

fn processor_for(placements: &[(&str, &str)], nozzles: usize) -> Processor {
    let job = single_board_job(placements);
    let machine = machine_for(&job, nozzles);
    let mut processor = JobProcessor::new(
        machine,
        RecordingSink::new(),
        RecordingListener::new(),
        ProcessorConfig::default(),
    );
    processor.initialize(job);
    processor
}

#[test]
fn test_successful_run_reports_states() {
    let mut processor = processor_for(&[("R1", "P1"), ("R2", "P2")], 2);
    assert_eq!(processor.job_state(), JobState::Stopped);
    assert_eq!(processor.phase_name(), Some("Preflight"));

    let report = run_to_end(&mut processor, 100);
    assert!(report.terminated);
    assert_eq!(processor.outcome(), Some(Outcome::Finished));
    assert_eq!(
        processor.listener().states,
        vec![JobState::Stopped, JobState::Running, JobState::Finished]
    );

    // Events in run order
    let names = processor.sink().names();
    assert_eq!(names.first(), Some(&"Job.Starting"));
    assert_eq!(names.last(), Some(&"Job.Finished"));
    assert_eq!(processor.sink().count("Job.Placement.Complete"), 2);

    // Cleanup after finishing ends at the park position
    assert_eq!(processor.machine().actions().last(), Some(&Action::Park));

    // A finished run stays finished
    assert!(!processor.advance().unwrap());
    assert_eq!(processor.outcome(), Some(Outcome::Finished));
}

#[test]
fn test_phases_in_cycle_order() {
    let mut processor = processor_for(&[("R1", "P1")], 1);
    let mut phases = vec![processor.phase_name().unwrap()];
    while processor.advance().unwrap() {
        let name = processor.phase_name().unwrap();
        if phases.last() != Some(&name) {
            phases.push(name);
        }
    }
    let name = processor.phase_name().unwrap();
    if phases.last() != Some(&name) {
        phases.push(name);
    }

    assert_eq!(
        phases,
        vec![
            "Preflight",
            "FiducialCheck",
            "Plan",
            "ChangeNozzleTips",
            "CalibrateNozzleTips",
            "OptimizeForPick",
            "Pick",
            "OptimizeForAlign",
            "Align",
            "OptimizeForPlace",
            "Place",
            "FinishCycle",
            "Plan",
            "Finish",
            "Done",
        ]
    );
}

#[test]
fn test_abort_mid_pick_cleans_up() {
    let mut processor = processor_for(&[("R1", "P1"), ("R2", "P2")], 2);
    while processor.phase_name() != Some("Pick") {
        processor.advance().unwrap();
    }
    // Pick one part so a nozzle holds something
    processor.advance().unwrap();
    let holding: Vec<String> = ["N1", "N2"]
        .iter()
        .filter(|n| processor.machine().nozzle(n).unwrap().part.is_some())
        .map(|n| n.to_string())
        .collect();
    assert_eq!(holding.len(), 1);

    processor.abort();
    assert_eq!(processor.outcome(), Some(Outcome::Aborted));
    assert_eq!(processor.job_state(), JobState::Stopped);
    assert_eq!(processor.listener().last_state(), Some(JobState::Stopped));
    assert!(processor.listener().saw_text("Aborted."));

    let actions = processor.machine().actions();
    assert_eq!(actions.last(), Some(&Action::Park));
    assert!(actions.contains(&Action::Discard(holding[0].clone())));
    assert!(processor.machine().nozzle(&holding[0]).unwrap().part.is_none());
    assert!(processor.machine().placed_parts().is_empty());
    assert_eq!(processor.sink().count("Job.Finished"), 0);

    // Further calls do nothing
    assert!(!processor.advance().unwrap());
    let before = processor.machine().actions().len();
    processor.abort();
    assert_eq!(processor.machine().actions().len(), before);
}

#[test]
fn test_abort_after_error_keeps_error_outcome() {
    let job = single_board_job(&[("R1", "P1")]);
    let mut machine = machine_for(&job, 1);
    machine.fail_picks("P1", Failures::Always);
    let mut processor = JobProcessor::new(machine, RecordingSink::new(), RecordingListener::new(), ProcessorConfig::default());
    processor.initialize(job);

    let err = loop {
        match processor.advance() {
            Ok(true) => {}
            Ok(false) => panic!("run ended without an error"),
            Err(err) => break err,
        }
    };
    assert_eq!(err.kind, ErrorKind::Motion);
    assert_eq!(processor.phase_name(), Some("Cleanup"));

    processor.abort();
    assert_eq!(processor.outcome(), Some(Outcome::Error));
    assert_eq!(processor.listener().last_state(), Some(JobState::Stopped));
}

#[test]
fn test_abort_before_initialize_is_noop() {
    let job = single_board_job(&[("R1", "P1")]);
    let machine = machine_for(&job, 1);
    let mut processor = JobProcessor::new(machine, RecordingSink::new(), RecordingListener::new(), ProcessorConfig::default());

    processor.abort();
    assert!(processor.machine().actions().is_empty());
    assert!(processor.listener().states.is_empty());
    assert_eq!(processor.outcome(), None);
    assert!(!processor.advance().unwrap());
}

#[test]
fn test_park_failure_does_not_fail_run() {
    let mut processor = processor_for(&[("R1", "P1")], 1);
    processor.machine_mut().fail_park(Failures::Always);

    let report = run_to_end(&mut processor, 100);
    assert!(report.errors.is_empty());
    assert_eq!(processor.outcome(), Some(Outcome::Finished));
    assert!(!processor.machine().actions().contains(&Action::Park));
}

#[test]
fn test_cleanup_skips_park_when_head_cannot_clear() {
    let mut processor = processor_for(&[("R1", "P1")], 1);
    while processor.phase_name() != Some("Finish") {
        processor.advance().unwrap();
    }
    processor.machine_mut().fail_safe_z(Failures::Always);
    processor.machine_mut().clear_actions();

    let report = run_to_end(&mut processor, 100);
    assert!(report.errors.is_empty());
    assert_eq!(processor.outcome(), Some(Outcome::Finished));
    assert!(processor.listener().saw_text("Cleaning up."));
    assert!(!processor.listener().saw_text("Park head."));
    assert!(!processor.machine().actions().contains(&Action::Park));
}

#[test]
fn test_failed_preparation_skips_park() {
    let mut processor = processor_for(&[("R1", "P1")], 1);
    processor.machine_mut().fail_safe_z(Failures::Times(2));

    let err = processor.advance().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Motion);
    assert!(!processor.advance().unwrap());
    assert_eq!(processor.outcome(), Some(Outcome::Error));
    assert!(processor.machine().actions().is_empty());
}

#[test]
fn test_hook_failure_stops_run() {
    let job = single_board_job(&[("R1", "P1")]).with_error_handling(ErrorHandling::Defer);
    let machine = machine_for(&job, 1);
    let mut processor = JobProcessor::new(
        machine,
        RecordingSink::failing_on("Job.Placement.Starting"),
        RecordingListener::new(),
        ProcessorConfig::default(),
    );
    processor.initialize(job);

    let report = run_to_end(&mut processor, 100);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ErrorKind::Hook);
    assert_eq!(
        report.errors[0].message,
        "Job.Placement.Starting hook failed: script raised an error"
    );
    assert_eq!(processor.outcome(), Some(Outcome::Error));
    assert!(processor.machine().placed_parts().is_empty());
}

#[test]
fn test_job_starting_hook_failure_stops_before_planning() {
    let job = single_board_job(&[("R1", "P1")]);
    let machine = machine_for(&job, 1);
    let mut processor = JobProcessor::new(
        machine,
        RecordingSink::failing_on("Job.Starting"),
        RecordingListener::new(),
        ProcessorConfig::default(),
    );
    processor.initialize(job);

    assert!(processor.advance().is_err());
    assert_eq!(processor.job_state(), JobState::Error);
    assert!(!processor.advance().unwrap());
    assert_eq!(processor.outcome(), Some(Outcome::Error));
}

#[test]
fn test_reinitialize_starts_fresh_run() {
    let second = single_board_job(&[("R1", "P1"), ("R2", "P2")]);
    let machine = machine_for(&second, 1);
    let mut processor = JobProcessor::new(machine, RecordingSink::new(), RecordingListener::new(), ProcessorConfig::default());
    processor.initialize(single_board_job(&[("R1", "P1")]));

    let report = run_to_end(&mut processor, 100);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(processor.summary().unwrap().parts_placed, 1);

    processor.initialize(second);
    assert_eq!(processor.job_state(), JobState::Stopped);
    assert!(processor.summary().is_none());
    assert!(processor.job_placements().is_empty());

    let report = run_to_end(&mut processor, 100);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(processor.summary().unwrap().parts_placed, 2);
}

#[test]
fn test_config_change_applies_to_next_run() {
    let mut processor = processor_for(&[("R1", "P1")], 1);
    processor.advance().unwrap();
    processor.set_config(ProcessorConfig::default().with_fiducial_level(4));
    assert_eq!(processor.config().fiducial_level, 4);

    // The running job keeps its snapshot and still finishes
    let report = run_to_end(&mut processor, 100);
    assert!(report.errors.is_empty());
}

#[test]
fn test_shared_processor_single_thread() {
    let processor = processor_for(&[("R1", "P1")], 1);
    let shared: SharedJobProcessor<NoopRawMutex, _, _, _> = SharedJobProcessor::new(processor);

    let mut steps = 0;
    while shared.advance().unwrap() {
        steps += 1;
        assert!(steps < 100);
    }
    assert_eq!(shared.with(|p| p.outcome()), Some(Outcome::Finished));

    let processor = shared.into_inner();
    assert_eq!(processor.machine().placed_parts(), vec!["P1"]);
}

#[test]
fn test_shared_processor_abort_from_other_thread() {
    let processor = processor_for(&[("R1", "P1"), ("R2", "P2"), ("R3", "P3")], 1);
    let shared: Arc<SharedJobProcessor<CriticalSectionRawMutex, _, _, _>> =
        Arc::new(SharedJobProcessor::new(processor));

    let runner = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            let mut steps = 0;
            while let Ok(true) = shared.advance() {
                steps += 1;
                if steps > 500 {
                    break;
                }
            }
        })
    };
    shared.abort();
    runner.join().unwrap();

    let outcome = shared.with(|p| p.outcome());
    assert!(matches!(outcome, Some(Outcome::Finished) | Some(Outcome::Aborted)));
    let last = shared.with(|p| p.machine().actions().last().cloned());
    assert_eq!(last, Some(Action::Park));
}
