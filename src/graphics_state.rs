//! The graphics state: the small bundle of mutable, mostly-optional fields every operation code
//! reads from or writes to. Grounded on `processing/GraphicsState.{h,cpp}`; `Unit`, `PlotState`
//! and `ArcMode` are the same three small enums, `GetPoint` is `GraphicsState::GetPoint`.

use crate::error::LogicError;
use crate::geometry::{FixedPoint, Transform};

/// Linear measurement unit a file declares via `MO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Millimeter,
    Inch,
}

impl Unit {
    pub fn from_command(text: &str) -> Option<Self> {
        match text {
            "MOMM" => Some(Unit::Millimeter),
            "MOIN" => Some(Unit::Inch),
            _ => None,
        }
    }

    /// Narrow `uom`-backed conversion helper for callers that want a millimeter-normalized
    /// value when a file declared `MOIN`. Never consulted by `CoordinateFormat::convert`,
    /// which stays a pure decimal-scaling operation.
    pub fn to_millimeters(self, value: f64) -> f64 {
        use uom::si::f64::Length;
        use uom::si::length::{inch, millimeter};

        match self {
            Unit::Millimeter => value,
            Unit::Inch => Length::new::<inch>(value).get::<millimeter>(),
        }
    }
}

/// Interpretation of the next coordinate-bearing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotState {
    Linear,
    Clockwise,
    CounterClockwise,
}

impl PlotState {
    pub fn from_command(code: &str) -> Option<Self> {
        match code {
            "G01" => Some(PlotState::Linear),
            "G02" => Some(PlotState::Clockwise),
            "G03" => Some(PlotState::CounterClockwise),
            _ => None,
        }
    }
}

/// Arc quadrant mode. Only `MultiQuadrant` is honored; setting `SingleQuadrant` is a recoverable
/// `UnsupportedFeature` at the handler boundary, per the Non-goal in §1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcMode {
    SingleQuadrant,
    MultiQuadrant,
}

impl ArcMode {
    pub fn from_command(code: &str) -> Option<Self> {
        match code {
            "G74" => Some(ArcMode::SingleQuadrant),
            "G75" => Some(ArcMode::MultiQuadrant),
            _ => None,
        }
    }
}

/// Parsed X/Y (and optionally I/J) coordinate data from a `D01`/`D02`/`D03` word, prior to being
/// completed against the current point.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateData {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub i: Option<i32>,
    pub j: Option<i32>,
}

/// The implicit, mutable state every operation code draws from: coordinate format, unit,
/// current point/aperture (the aperture identifier, not the resolved shape — that lookup is the
/// processor's job), plot mode, arc quadrant mode, and the current layer transformation.
#[derive(Debug, Default)]
pub struct GraphicsState {
    pub format: Option<crate::geometry::CoordinateFormat>,
    pub unit: Option<Unit>,
    current_point: Option<FixedPoint>,
    pub current_aperture: Option<u32>,
    pub plot_state: Option<PlotState>,
    pub arc_mode: Option<ArcMode>,
    pub transform: Transform,
}

impl GraphicsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_point(&self) -> Option<FixedPoint> {
        self.current_point
    }

    pub fn set_current_point(&mut self, point: Option<FixedPoint>) {
        self.current_point = point;
    }

    /// Completes a parsed X/Y pair by filling in missing components from the current point.
    /// Fails if a component is missing and there is no current point to fall back on.
    pub fn get_point(&self, data: CoordinateData) -> Result<FixedPoint, LogicError> {
        let current = self.current_point;
        let x = match data.x {
            Some(x) => x,
            None => current.ok_or(LogicError::NoCurrentPoint)?.x,
        };
        let y = match data.y {
            Some(y) => y,
            None => current.ok_or(LogicError::NoCurrentPoint)?.y,
        };
        Ok(FixedPoint::new(x, y))
    }
}
