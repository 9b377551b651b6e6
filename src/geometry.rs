//! Fixed- and real-valued points, axis-aligned bounds, the coordinate format conversion,
//! and the layer transformation, grounded on `graphics/Box.{h,cpp}`, `graphics/Transform.{h,cpp}`
//! and `processing/CoordinateFormat.{h,cpp}` in the upstream source tree this crate descends from.

use nalgebra::{Rotation2, Vector2};

use crate::error::{LogicError, ParseError};

/// A 2D point with signed 32-bit integer coordinates, exactly as parsed from the file before
/// any unit conversion takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FixedPoint {
    pub x: i32,
    pub y: i32,
}

impl FixedPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

impl std::ops::Add for FixedPoint {
    type Output = FixedPoint;

    fn add(self, rhs: Self) -> Self::Output {
        FixedPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for FixedPoint {
    type Output = FixedPoint;

    fn sub(self, rhs: Self) -> Self::Output {
        FixedPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<i32> for FixedPoint {
    type Output = FixedPoint;

    fn mul(self, rhs: i32) -> Self::Output {
        FixedPoint::new(self.x * rhs, self.y * rhs)
    }
}

/// A 2D point with double-precision coordinates. In millimeters once produced by
/// `CoordinateFormat::convert`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RealPoint {
    pub x: f64,
    pub y: f64,
}

impl RealPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Rotate about the origin by `degrees`, counter-clockwise, positive degrees.
    pub fn rotate(&self, degrees: f64) -> RealPoint {
        let rotation = Rotation2::new(degrees.to_radians());
        let rotated = rotation * Vector2::new(self.x, self.y);
        RealPoint::new(rotated.x, rotated.y)
    }
}

impl std::ops::Add for RealPoint {
    type Output = RealPoint;

    fn add(self, rhs: Self) -> Self::Output {
        RealPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for RealPoint {
    type Output = RealPoint;

    fn sub(self, rhs: Self) -> Self::Output {
        RealPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for RealPoint {
    type Output = RealPoint;

    fn mul(self, rhs: f64) -> Self::Output {
        RealPoint::new(self.x * rhs, self.y * rhs)
    }
}

/// An axis-aligned bounding rectangle. Named `Bounds` rather than `Box` to avoid shadowing the
/// standard library's smart pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub bottom: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64, left: f64, bottom: f64) -> Self {
        debug_assert!(width >= 0.0, "bounds width must be >= 0");
        debug_assert!(height >= 0.0, "bounds height must be >= 0");
        Self {
            width,
            height,
            left,
            bottom,
        }
    }

    /// A square bounds centered on `center` with the given diameter, mirroring the
    /// `Box(diameter, center)` constructor used throughout the aperture bounding-box code.
    pub fn from_center_diameter(center: RealPoint, diameter: f64) -> Self {
        let radius = diameter / 2.0;
        Self::new(diameter, diameter, center.x - radius, center.y - radius)
    }

    pub fn top(&self) -> f64 {
        self.bottom + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    /// The smallest bounds covering both `self` and `other`.
    pub fn extend(&self, other: &Bounds) -> Bounds {
        let left = self.left.min(other.left);
        let bottom = self.bottom.min(other.bottom);
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());

        Bounds::new(right - left, top - bottom, left, bottom)
    }

    /// A uniformly dilated copy, growing in every direction by `d`.
    pub fn pad(&self, d: f64) -> Bounds {
        Bounds::new(
            self.width + 2.0 * d,
            self.height + 2.0 * d,
            self.left - d,
            self.bottom - d,
        )
    }

    pub fn translate(&self, p: RealPoint) -> Bounds {
        Bounds::new(self.width, self.height, self.left + p.x, self.bottom + p.y)
    }
}

impl std::ops::Mul<f64> for Bounds {
    type Output = Bounds;

    fn mul(self, rhs: f64) -> Self::Output {
        Bounds::new(
            self.width * rhs,
            self.height * rhs,
            self.left * rhs,
            self.bottom * rhs,
        )
    }
}

impl std::ops::Div<f64> for Bounds {
    type Output = Bounds;

    fn div(self, rhs: f64) -> Self::Output {
        Bounds::new(
            self.width / rhs,
            self.height / rhs,
            self.left / rhs,
            self.bottom / rhs,
        )
    }
}

/// Integer/decimal digit counts governing how a `FixedPoint` parsed from the file becomes a
/// `RealPoint`. Validated at construction: integer digits in `[1, 6]`, decimal digits in `{5, 6}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateFormat {
    integer_digits: u32,
    decimal_digits: u32,
}

impl CoordinateFormat {
    pub fn new(integer_digits: u32, decimal_digits: u32) -> Result<Self, ParseError> {
        if !(1..=6).contains(&integer_digits) {
            return Err(ParseError::OutOfRange(format!(
                "coordinate format integer digit count {integer_digits} outside [1, 6]"
            )));
        }
        if decimal_digits != 5 && decimal_digits != 6 {
            return Err(ParseError::OutOfRange(format!(
                "coordinate format decimal digit count {decimal_digits} must be 5 or 6"
            )));
        }

        Ok(Self {
            integer_digits,
            decimal_digits,
        })
    }

    pub fn integer_digits(&self) -> u32 {
        self.integer_digits
    }

    pub fn decimal_digits(&self) -> u32 {
        self.decimal_digits
    }

    fn resolution(&self) -> f64 {
        10f64.powi(-(self.decimal_digits as i32))
    }

    /// Pure decimal rescaling. Deliberately performs no unit conversion: `MOIN`/`MOMM` is an
    /// orthogonal concern handled by `crate::graphics_state::Unit`.
    pub fn convert(&self, p: FixedPoint) -> RealPoint {
        let resolution = self.resolution();
        RealPoint::new(p.x as f64 * resolution, p.y as f64 * resolution)
    }
}

/// Mirroring axis applied by a `Transform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mirroring {
    #[default]
    None,
    X,
    Y,
    XY,
}

impl Mirroring {
    pub fn from_command(text: &str) -> Option<Self> {
        match text {
            "N" => Some(Mirroring::None),
            "X" => Some(Mirroring::X),
            "Y" => Some(Mirroring::Y),
            "XY" => Some(Mirroring::XY),
            _ => None,
        }
    }

    fn mirror_x(&self) -> bool {
        matches!(self, Mirroring::X | Mirroring::XY)
    }

    fn mirror_y(&self) -> bool {
        matches!(self, Mirroring::Y | Mirroring::XY)
    }

    fn from_flags(x: bool, y: bool) -> Self {
        match (x, y) {
            (false, false) => Mirroring::None,
            (true, false) => Mirroring::X,
            (false, true) => Mirroring::Y,
            (true, true) => Mirroring::XY,
        }
    }
}

/// Layer composition polarity: Dark adds material, Clear subtracts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    Dark,
    Clear,
}

impl Polarity {
    pub fn inverse(self) -> Self {
        match self {
            Polarity::Dark => Polarity::Clear,
            Polarity::Clear => Polarity::Dark,
        }
    }

    pub fn from_command(text: &str) -> Option<Self> {
        match text {
            "D" => Some(Polarity::Dark),
            "C" => Some(Polarity::Clear),
            _ => None,
        }
    }

    pub fn is_clear(self) -> bool {
        matches!(self, Polarity::Clear)
    }
}

/// The layer-object transformation: polarity, mirroring, rotation (degrees) and scaling.
/// Carried by every aperture and applied lazily at serialization time rather than baked into
/// object coordinates eagerly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub polarity: Polarity,
    pub mirroring: Mirroring,
    pub rotation: f64,
    pub scaling: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            polarity: Polarity::Dark,
            mirroring: Mirroring::None,
            rotation: 0.0,
            scaling: 1.0,
        }
    }
}

impl Transform {
    pub fn set_scaling(&mut self, scaling: f64) -> Result<(), LogicError> {
        if scaling <= 0.0 {
            return Err(LogicError::InvalidStepAndRepeat {
                nx: 0,
                ny: 0,
                dx: scaling,
                dy: scaling,
            });
        }
        self.scaling = scaling;
        Ok(())
    }

    /// mirror -> scale -> rotate, about the origin.
    pub fn apply(&self, p: RealPoint) -> RealPoint {
        let mirrored = RealPoint::new(
            if self.mirroring.mirror_x() { -p.x } else { p.x },
            if self.mirroring.mirror_y() { -p.y } else { p.y },
        );
        let scaled = mirrored * self.scaling;
        scaled.rotate(self.rotation)
    }

    /// Compose a child transform onto `self` as parent. Scalings multiply; rotations add;
    /// polarity XORs if the child is Clear; each mirror axis flips only when the child itself
    /// sets that axis (not a blanket XOR of both flags).
    pub fn stack(&self, child: &Transform) -> Transform {
        let polarity = if child.polarity.is_clear() {
            self.polarity.inverse()
        } else {
            self.polarity
        };

        let mirror_x = if child.mirroring.mirror_x() {
            !self.mirroring.mirror_x()
        } else {
            self.mirroring.mirror_x()
        };
        let mirror_y = if child.mirroring.mirror_y() {
            !self.mirroring.mirror_y()
        } else {
            self.mirroring.mirror_y()
        };

        Transform {
            polarity,
            mirroring: Mirroring::from_flags(mirror_x, mirror_y),
            rotation: self.rotation + child.rotation,
            scaling: self.scaling * child.scaling,
        }
    }
}

/// A straight segment between two fixed points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: FixedPoint,
    pub end: FixedPoint,
}

impl Segment {
    pub fn new(start: FixedPoint, end: FixedPoint) -> Self {
        Self { start, end }
    }

    pub fn is_zero_length(&self) -> bool {
        self.start == self.end
    }
}

/// Arc winding direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// A circular arc segment: a `Segment` plus a center offset relative to `start` and a direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSegment {
    pub segment: Segment,
    pub center_offset: FixedPoint,
    pub direction: ArcDirection,
}

impl ArcSegment {
    pub fn new(segment: Segment, center_offset: FixedPoint, direction: ArcDirection) -> Self {
        Self {
            segment,
            center_offset,
            direction,
        }
    }

    pub fn start(&self) -> FixedPoint {
        self.segment.start
    }

    pub fn end(&self) -> FixedPoint {
        self.segment.end
    }

    pub fn center(&self) -> FixedPoint {
        self.segment.start + self.center_offset
    }

    /// A full circle iff start and end coincide.
    pub fn is_circle(&self) -> bool {
        self.segment.start == self.segment.end
    }
}

/// A single element of a `Contour`: either a straight or curved segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContourSegment {
    Line(Segment),
    Arc(ArcSegment),
}

impl ContourSegment {
    pub fn start(&self) -> FixedPoint {
        match self {
            ContourSegment::Line(s) => s.start,
            ContourSegment::Arc(a) => a.start(),
        }
    }

    pub fn end(&self) -> FixedPoint {
        match self {
            ContourSegment::Line(s) => s.end,
            ContourSegment::Arc(a) => a.end(),
        }
    }

    fn is_zero_length(&self) -> bool {
        match self {
            ContourSegment::Line(s) => s.is_zero_length(),
            ContourSegment::Arc(a) => a.is_circle() && a.center_offset == FixedPoint::zero(),
        }
    }
}

/// An ordered chain of linear and arc segments bounding a region.
#[derive(Debug, Clone, Default)]
pub struct Contour {
    segments: Vec<ContourSegment>,
}

impl Contour {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[ContourSegment] {
        &self.segments
    }

    /// Appends a segment. Rejects zero-length segments.
    pub fn add_segment(&mut self, segment: ContourSegment) -> Result<(), LogicError> {
        if segment.is_zero_length() {
            return Err(LogicError::NoCurrentPoint);
        }
        self.segments.push(segment);
        Ok(())
    }

    /// Closed iff non-empty, every segment's end equals the next segment's start, and the
    /// last segment's end equals the first segment's start.
    pub fn is_closed(&self) -> bool {
        if self.segments.is_empty() {
            return false;
        }

        for window in self.segments.windows(2) {
            if window[0].end() != window[1].start() {
                return false;
            }
        }

        let first = self.segments.first().expect("checked non-empty above");
        let last = self.segments.last().expect("checked non-empty above");
        first.start() == last.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_format_converts_by_pure_resolution_scaling() {
        for integer_digits in 1..=6u32 {
            for decimal_digits in [5u32, 6u32] {
                let format = CoordinateFormat::new(integer_digits, decimal_digits).unwrap();
                let p = FixedPoint::new(1_234_567, -42);
                let converted = format.convert(p);
                let expected_x = p.x as f64 * 10f64.powi(-(decimal_digits as i32));
                assert!((converted.x - expected_x).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn coordinate_format_rejects_out_of_range_digits() {
        assert!(CoordinateFormat::new(0, 6).is_err());
        assert!(CoordinateFormat::new(7, 6).is_err());
        assert!(CoordinateFormat::new(4, 4).is_err());
    }

    #[test]
    fn transform_apply_order_is_mirror_scale_rotate() {
        let t = Transform {
            polarity: Polarity::Dark,
            mirroring: Mirroring::X,
            rotation: 90.0,
            scaling: 2.0,
        };
        let p = RealPoint::new(1.0, 0.0);
        // mirror X: (-1, 0); scale 2: (-2, 0); rotate 90 ccw: (0, -2)
        let result = t.apply(p);
        assert!((result.x - 0.0).abs() < 1e-9);
        assert!((result.y - -2.0).abs() < 1e-9);
    }

    #[test]
    fn transform_stack_polarity_xors_only_on_clear_child() {
        let parent = Transform {
            polarity: Polarity::Dark,
            ..Transform::default()
        };
        let clear_child = Transform {
            polarity: Polarity::Clear,
            ..Transform::default()
        };
        let dark_child = Transform {
            polarity: Polarity::Dark,
            ..Transform::default()
        };

        assert_eq!(parent.stack(&clear_child).polarity, Polarity::Clear);
        assert_eq!(parent.stack(&dark_child).polarity, Polarity::Dark);
    }

    #[test]
    fn transform_stack_mirror_xors_per_axis_independently() {
        let parent = Transform {
            mirroring: Mirroring::X,
            ..Transform::default()
        };
        let child = Transform {
            mirroring: Mirroring::X,
            ..Transform::default()
        };
        let stacked = parent.stack(&child);
        assert_eq!(stacked.mirroring, Mirroring::None);

        let child_y = Transform {
            mirroring: Mirroring::Y,
            ..Transform::default()
        };
        let stacked2 = parent.stack(&child_y);
        assert_eq!(stacked2.mirroring, Mirroring::XY);
    }

    #[test]
    fn transform_stack_multiplies_scale_and_adds_rotation() {
        let parent = Transform {
            scaling: 2.0,
            rotation: 10.0,
            ..Transform::default()
        };
        let child = Transform {
            scaling: 3.0,
            rotation: 20.0,
            ..Transform::default()
        };
        let stacked = parent.stack(&child);
        assert!((stacked.scaling - 6.0).abs() < 1e-12);
        assert!((stacked.rotation - 30.0).abs() < 1e-12);
    }

    #[test]
    fn contour_closed_requires_matching_chain() {
        let mut c = Contour::new();
        c.add_segment(ContourSegment::Line(Segment::new(
            FixedPoint::new(0, 0),
            FixedPoint::new(10, 0),
        )))
        .unwrap();
        c.add_segment(ContourSegment::Line(Segment::new(
            FixedPoint::new(10, 0),
            FixedPoint::new(10, 10),
        )))
        .unwrap();
        assert!(!c.is_closed());
        c.add_segment(ContourSegment::Line(Segment::new(
            FixedPoint::new(10, 10),
            FixedPoint::new(0, 0),
        )))
        .unwrap();
        assert!(c.is_closed());
    }

    #[test]
    fn contour_rejects_zero_length_segment() {
        let mut c = Contour::new();
        let result = c.add_segment(ContourSegment::Line(Segment::new(
            FixedPoint::new(5, 5),
            FixedPoint::new(5, 5),
        )));
        assert!(result.is_err());
    }

    #[test]
    fn bounds_extend_covers_both() {
        let a = Bounds::new(2.0, 2.0, 0.0, 0.0);
        let b = Bounds::new(2.0, 2.0, 5.0, 5.0);
        let extended = a.extend(&b);
        assert_eq!(extended.left, 0.0);
        assert_eq!(extended.bottom, 0.0);
        assert_eq!(extended.right(), 7.0);
        assert_eq!(extended.top(), 7.0);
    }

    #[test]
    fn bounds_pad_grows_uniformly() {
        let a = Bounds::new(2.0, 2.0, 0.0, 0.0);
        let padded = a.pad(1.0);
        assert_eq!(padded.width, 4.0);
        assert_eq!(padded.left, -1.0);
    }
}
