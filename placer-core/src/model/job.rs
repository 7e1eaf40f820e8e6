//! Job definition
//!
//! A job is a panel tree of board locations plus the part and package
//! catalogue it refers to.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::board::{BoardLocation, ErrorHandling, HolderLocation, PanelLocation, Placement};
use super::ledger::PlacedLedger;
use super::location::Location;
use super::part::{Package, Part};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Job {
    pub root: PanelLocation,
    pub parts: BTreeMap<String, Part>,
    pub packages: BTreeMap<String, Package>,
    /// Job-wide error handling used by placements set to `Default`
    pub error_handling: ErrorHandling,
    pub placed: PlacedLedger,
}

impl Job {
    pub fn new(root: PanelLocation) -> Self {
        Self {
            root,
            parts: BTreeMap::new(),
            packages: BTreeMap::new(),
            error_handling: ErrorHandling::Default,
            placed: PlacedLedger::new(),
        }
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.insert(part.id.clone(), part);
        self
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.packages.insert(package.id.clone(), package);
        self
    }

    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.get(id)
    }

    /// Every board location in tree order
    pub fn board_locations(&self) -> Vec<&BoardLocation> {
        let mut boards = Vec::new();
        collect_boards(&self.root, false, &mut boards);
        boards
    }

    /// Board locations that are enabled along with all their parent panels
    pub fn enabled_board_locations(&self) -> Vec<&BoardLocation> {
        let mut boards = Vec::new();
        if self.root.enabled {
            collect_boards(&self.root, true, &mut boards);
        }
        boards
    }

    pub fn board_location(&self, id: &str) -> Option<&BoardLocation> {
        self.board_locations().into_iter().find(|b| b.id == id)
    }

    /// Global location of a placement
    pub fn placement_location(&self, board: &str, placement: &str) -> Option<Location> {
        self.board_location(board)
            .and_then(|b| b.placement_location(placement))
    }

    /// Replace the origin of the holder with the given id
    pub fn set_holder_origin(&mut self, id: &str, origin: Location) -> bool {
        if self.root.id == id {
            self.root.origin = origin;
            return true;
        }
        set_origin(&mut self.root, id, origin)
    }

    pub fn effective_error_handling(&self, placement: &Placement) -> ErrorHandling {
        placement.error_handling.resolve(self.error_handling)
    }

    pub fn is_placed(&self, board: &str, placement: &str) -> bool {
        self.placed.is_placed(board, placement)
    }
}

fn collect_boards<'a>(panel: &'a PanelLocation, enabled_only: bool, out: &mut Vec<&'a BoardLocation>) {
    for child in &panel.children {
        if enabled_only && !child.enabled() {
            continue;
        }
        match child {
            HolderLocation::Board(board) => out.push(board),
            HolderLocation::Panel(inner) => collect_boards(inner, enabled_only, out),
        }
    }
}

fn set_origin(panel: &mut PanelLocation, id: &str, origin: Location) -> bool {
    for child in panel.children.iter_mut() {
        match child {
            HolderLocation::Board(board) if board.id == id => {
                board.origin = origin;
                return true;
            }
            HolderLocation::Panel(inner) if inner.id == id => {
                inner.origin = origin;
                return true;
            }
            HolderLocation::Panel(inner) => {
                if set_origin(inner, id, origin) {
                    return true;
                }
            }
            HolderLocation::Board(_) => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::board::Board;

    fn job() -> Job {
        let inner = PanelLocation::new("P2", Location::ORIGIN)
            .with_board(BoardLocation::new("B2", Board::new("b"), Location::xy(50.0, 0.0)))
            .with_board(
                BoardLocation::new("B3", Board::new("b"), Location::xy(100.0, 0.0)).disabled(),
            );
        let root = PanelLocation::new("Root", Location::ORIGIN)
            .with_board(BoardLocation::new("B1", Board::new("b"), Location::ORIGIN))
            .with_panel(inner);
        Job::new(root)
    }

    #[test]
    fn test_board_order() {
        let job = job();
        let ids: Vec<_> = job.board_locations().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["B1", "B2", "B3"]);
        let enabled: Vec<_> = job
            .enabled_board_locations()
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(enabled, ["B1", "B2"]);
    }

    #[test]
    fn test_disabled_panel_hides_children() {
        let mut job = job();
        if let HolderLocation::Panel(p) = &mut job.root.children[1] {
            p.enabled = false;
        }
        let enabled: Vec<_> = job
            .enabled_board_locations()
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(enabled, ["B1"]);
    }

    #[test]
    fn test_set_holder_origin() {
        let mut job = job();
        assert!(job.set_holder_origin("B2", Location::xy(51.0, 1.0)));
        assert_eq!(job.board_location("B2").map(|b| b.origin), Some(Location::xy(51.0, 1.0)));
        assert!(job.set_holder_origin("P2", Location::xy(1.0, 0.0)));
        assert!(!job.set_holder_origin("missing", Location::ORIGIN));
    }
}
