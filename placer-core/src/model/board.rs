//! Boards, panels and their placements
//!
//! Boards are mounted on the machine through [`BoardLocation`]s. Panels
//! group board and panel locations into a tree; the job root is a panel.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::location::Location;

/// Board side facing the head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    #[default]
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlacementType {
    #[default]
    Placement,
    Fiducial,
}

/// What to do when a placement fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorHandling {
    /// Use the job-wide setting
    #[default]
    Default,
    /// Stop the run and report
    Alert,
    /// Mark the placement errored and carry on
    Defer,
}

impl ErrorHandling {
    /// Resolve against the job-wide setting; only Alert or Defer come out
    pub fn resolve(self, global: ErrorHandling) -> ErrorHandling {
        match (self, global) {
            (ErrorHandling::Default, ErrorHandling::Defer) => ErrorHandling::Defer,
            (ErrorHandling::Default, _) => ErrorHandling::Alert,
            (own, _) => own,
        }
    }
}

/// A single placement or fiducial on a board
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    pub id: String,
    pub part: Option<String>,
    /// Board-relative location
    pub location: Location,
    pub side: Side,
    pub kind: PlacementType,
    pub enabled: bool,
    pub error_handling: ErrorHandling,
}

impl Placement {
    pub fn new(id: impl Into<String>, part: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            part: Some(part.into()),
            location,
            side: Side::Top,
            kind: PlacementType::Placement,
            enabled: true,
            error_handling: ErrorHandling::Default,
        }
    }

    pub fn fiducial(id: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            part: None,
            location,
            side: Side::Top,
            kind: PlacementType::Fiducial,
            enabled: true,
            error_handling: ErrorHandling::Default,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Board {
    pub name: String,
    pub placements: Vec<Placement>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placements: Vec::new(),
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placements.push(placement);
        self
    }

    pub fn placement(&self, id: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.id == id)
    }

    /// First placement id that appears more than once
    pub fn duplicate_placement_id(&self) -> Option<&str> {
        self.placements.iter().enumerate().find_map(|(i, p)| {
            self.placements[..i]
                .iter()
                .any(|q| q.id == p.id)
                .then_some(p.id.as_str())
        })
    }
}

/// A board mounted on the machine
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardLocation {
    pub id: String,
    pub board: Board,
    /// Global origin, corrected in place by fiducial checks
    pub origin: Location,
    pub side: Side,
    pub enabled: bool,
    pub check_fiducials: bool,
}

impl BoardLocation {
    pub fn new(id: impl Into<String>, board: Board, origin: Location) -> Self {
        Self {
            id: id.into(),
            board,
            origin,
            side: Side::Top,
            enabled: true,
            check_fiducials: false,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_fiducial_check(mut self, check: bool) -> Self {
        self.check_fiducials = check;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Convert a board-relative location into machine coordinates
    ///
    /// Bottom-side boards are mirrored in X and have their rotation negated
    /// before the board rotation and origin are applied.
    pub fn to_global(&self, local: &Location) -> Location {
        let mut local = *local;
        if self.side == Side::Bottom {
            local.x = -local.x;
            local.rotation = -local.rotation;
        }
        let rotated = local.rotate_xy(self.origin.rotation);
        Location::new(
            self.origin.x + rotated.x,
            self.origin.y + rotated.y,
            self.origin.z + local.z,
            self.origin.rotation + local.rotation,
        )
    }

    /// Global location of a placement on this board
    pub fn placement_location(&self, placement_id: &str) -> Option<Location> {
        self.board
            .placement(placement_id)
            .map(|p| self.to_global(&p.location))
    }

    /// Global nominal locations of the enabled fiducials
    pub fn fiducial_locations(&self) -> Vec<Location> {
        self.board
            .placements
            .iter()
            .filter(|p| p.enabled && p.kind == PlacementType::Fiducial)
            .map(|p| self.to_global(&p.location))
            .collect()
    }
}

/// A panel of boards or nested panels
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PanelLocation {
    pub id: String,
    pub origin: Location,
    pub enabled: bool,
    pub check_fiducials: bool,
    /// Panel-relative fiducial marks
    pub fiducials: Vec<Location>,
    pub children: Vec<HolderLocation>,
}

impl PanelLocation {
    pub fn new(id: impl Into<String>, origin: Location) -> Self {
        Self {
            id: id.into(),
            origin,
            enabled: true,
            check_fiducials: false,
            fiducials: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_board(mut self, board: BoardLocation) -> Self {
        self.children.push(HolderLocation::Board(board));
        self
    }

    pub fn with_panel(mut self, panel: PanelLocation) -> Self {
        self.children.push(HolderLocation::Panel(panel));
        self
    }

    pub fn with_fiducials(mut self, fiducials: Vec<Location>) -> Self {
        self.fiducials = fiducials;
        self.check_fiducials = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Global nominal locations of the panel fiducials
    pub fn fiducial_locations(&self) -> Vec<Location> {
        self.fiducials
            .iter()
            .map(|f| {
                let rotated = f.rotate_xy(self.origin.rotation);
                Location::new(
                    self.origin.x + rotated.x,
                    self.origin.y + rotated.y,
                    self.origin.z + f.z,
                    self.origin.rotation + f.rotation,
                )
            })
            .collect()
    }
}

/// Either kind of holder in the panel tree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HolderLocation {
    Board(BoardLocation),
    Panel(PanelLocation),
}

impl HolderLocation {
    pub fn enabled(&self) -> bool {
        match self {
            HolderLocation::Board(b) => b.enabled,
            HolderLocation::Panel(p) => p.enabled,
        }
    }
}
