//! Tagged cell-kind enums. The source model packs these into sentinel
//! integers (e.g. `IMPASSABLE_OBJECT = -1000`); we keep a dense grid per
//! concern instead, one small enum each, so a misread sentinel can't silently
//! compile (see Design Notes in SPEC_FULL.md).

/// Obstacle-layer classification: walls, closed doors (`_`) and exit cells
/// are all `Impassable` here; exits are additionally exposed via
/// [`ExitMarker`] on a parallel grid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleCell {
    #[default]
    Empty,
    Impassable,
}

impl ObstacleCell {
    pub fn is_passable(self) -> bool {
        matches!(self, ObstacleCell::Empty)
    }
}

/// Exit-layer classification, held on a grid parallel to [`ObstacleCell`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExitMarker {
    #[default]
    Empty,
    Exit,
    BlockedExit,
}

impl ExitMarker {
    pub fn is_exit_cell(self) -> bool {
        matches!(self, ExitMarker::Exit | ExitMarker::BlockedExit)
    }

    pub fn is_usable_exit(self) -> bool {
        matches!(self, ExitMarker::Exit)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FireCell {
    #[default]
    Empty,
    Fire,
}

impl FireCell {
    pub fn is_on_fire(self) -> bool {
        matches!(self, FireCell::Fire)
    }
}

/// Proximity-to-fire classification used to gate and penalize pedestrian
/// movement near fire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    #[default]
    NonRisky,
    Risky,
    Danger,
}

impl RiskLevel {
    pub fn is_danger(self) -> bool {
        matches!(self, RiskLevel::Danger)
    }
}
