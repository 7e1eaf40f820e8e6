//! Fiducial check stage
//!
//! Holders flagged for fiducial checking are measured shallowest depth
//! first, one depth per call, until the configured level is reached. The
//! rest are then measured together.

use std::collections::BTreeSet;

use log::debug;

use super::context::RunContext;
use crate::error::{Entity, JobError, MachineFault};
use crate::model::{HolderLocation, PanelLocation};
use crate::traits::{EventSink, FiducialTarget, JobListener, Machine};

/// Fiducial stage state carried between calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiducialProgress {
    completed: BTreeSet<String>,
    level: u32,
}

impl FiducialProgress {
    /// Holders whose fiducials were already measured
    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    /// Passes run so far
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Run one fiducial pass
    ///
    /// Returns `Ok(true)` once nothing is left to measure.
    pub(crate) fn check<M, S, L>(&mut self, ctx: &mut RunContext<'_, M, S, L>) -> Result<bool, JobError>
    where
        M: Machine,
        S: EventSink,
        L: JobListener,
    {
        let mut targets = Vec::new();
        collect_targets(&ctx.job.root, 0, &mut targets);
        targets.retain(|t| !self.completed.contains(&t.id));
        if targets.is_empty() {
            return Ok(true);
        }

        let threshold = ctx.config.fiducial_level;
        if self.level < threshold {
            let shallowest = targets.iter().map(|t| t.depth).min().unwrap_or(0);
            targets.retain(|t| t.depth == shallowest);
            ctx.status_text(&format!("Checking fiducials at level {}.", self.level));
        } else if threshold == 0 {
            ctx.status_text("Checking all fiducials.");
        } else {
            ctx.status_text("Checking remaining fiducials.");
        }

        let ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();
        let fatal = |fault: MachineFault| JobError::motion(Entity::Fiducials(ids.clone()), fault).into_fatal();
        let origins = ctx.machine.locate_all(&targets).map_err(fatal)?;
        if origins.len() != targets.len() {
            return Err(fatal(MachineFault::new(format!(
                "Fiducial check returned {} locations for {} holders.",
                origins.len(),
                targets.len()
            ))));
        }

        for (target, origin) in targets.iter().zip(origins) {
            debug!("Fiducial check moved {} to {:?}", target.id, origin);
            ctx.job.set_holder_origin(&target.id, origin);
            self.completed.insert(target.id.clone());
        }
        self.level += 1;
        Ok(false)
    }
}

/// Enabled holders flagged for fiducial checks, tagged with their depth
///
/// Children of disabled panels are skipped.
fn collect_targets(panel: &PanelLocation, depth: u32, out: &mut Vec<FiducialTarget>) {
    if !panel.enabled {
        return;
    }
    if panel.check_fiducials {
        out.push(FiducialTarget {
            id: panel.id.clone(),
            depth,
            origin: panel.origin,
            fiducials: panel.fiducial_locations(),
        });
    }
    for child in &panel.children {
        match child {
            HolderLocation::Panel(p) => collect_targets(p, depth + 1, out),
            HolderLocation::Board(b) if b.enabled && b.check_fiducials => out.push(FiducialTarget {
                id: b.id.clone(),
                depth: depth + 1,
                origin: b.origin,
                fiducials: b.fiducial_locations(),
            }),
            HolderLocation::Board(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Board, BoardLocation, Location};

    fn board(id: &str) -> BoardLocation {
        BoardLocation::new(id, Board::new(id), Location::ORIGIN).with_fiducial_check(true)
    }

    #[test]
    fn test_collect_depths() {
        let root = PanelLocation::new("P0", Location::ORIGIN)
            .with_fiducials(vec![Location::xy(1.0, 1.0)])
            .with_board(board("B1"))
            .with_panel(PanelLocation::new("P1", Location::ORIGIN).with_board(board("B2")))
            .with_board(BoardLocation::new("B3", Board::new("B3"), Location::ORIGIN));

        let mut targets = Vec::new();
        collect_targets(&root, 0, &mut targets);
        let tagged: Vec<(&str, u32)> = targets.iter().map(|t| (t.id.as_str(), t.depth)).collect();
        assert_eq!(tagged, vec![("P0", 0), ("B1", 1), ("B2", 2)]);
    }

    #[test]
    fn test_disabled_panel_hides_children() {
        let root = PanelLocation::new("P0", Location::ORIGIN)
            .with_panel(PanelLocation::new("P1", Location::ORIGIN).with_board(board("B2")).disabled())
            .with_board(board("B1").disabled());

        let mut targets = Vec::new();
        collect_targets(&root, 0, &mut targets);
        assert!(targets.is_empty());
    }
}
