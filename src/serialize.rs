//! The external serializer interface and a concrete, thin SVG-backed implementation. Grounded on
//! the SVG composition already present in `gerber_file.rs`'s `debug_render`/`calculate_svg_bounds`
//! and `geometry.rs`'s `Segment::debug_render`, generalized from a one-shot debug dump into the
//! full interface this specification names (`new_group`/`new_mask`/`set_mask`/`add_*`/`get_target`/
//! `save`).

use std::path::Path;

use svg_composer::{
    document::Document as SvgDocument,
    element::{
        attributes::{Color, ColorName, Paint, Size},
        path::{
            command::{Arc as SvgArc, CoordinateType, End, LineTo, LineToOption, MoveTo},
            Command, Path as SvgPath,
        },
        Element,
    },
};

use crate::error::{GerberError, IoError};
use crate::geometry::{ArcDirection, ArcSegment, Bounds, Contour, ContourSegment, CoordinateFormat, Polarity, RealPoint, Segment};

/// Opaque handle to a serializer-internal group or mask. Equality-comparable so a caller can
/// hold on to one and pass it back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetId(pub usize);

/// The external collaborator interface every graphical object's `serialize` method drives.
pub trait Serializer {
    fn new_group(&mut self, parent: TargetId) -> TargetId;
    fn new_mask(&mut self, bounds: Bounds) -> TargetId;
    fn set_mask(&mut self, target: TargetId, mask: TargetId);
    fn add_circle(&mut self, target: TargetId, radius: f64, center: RealPoint);
    fn add_draw(
        &mut self,
        target: TargetId,
        width: f64,
        segment: Segment,
        format: &CoordinateFormat,
        origin: RealPoint,
    );
    fn add_arc(
        &mut self,
        target: TargetId,
        width: f64,
        arc: ArcSegment,
        format: &CoordinateFormat,
        origin: RealPoint,
    );
    fn add_polygon(&mut self, target: TargetId, points: &[RealPoint]);
    fn add_contour(
        &mut self,
        target: TargetId,
        contour: &Contour,
        format: &CoordinateFormat,
        origin: RealPoint,
    );
    fn get_target(&mut self, polarity: Polarity) -> TargetId;
    fn save(&mut self, path: &Path) -> Result<(), GerberError>;
}

struct SvgGroup {
    elements: Vec<Box<dyn Element>>,
}

/// A concrete `Serializer` built on `svg_composer`. Every target is rendered as its own path,
/// collected into a flat document; Dark and Clear roots are distinguished purely by fill color
/// since this crate does not attempt real boolean mask evaluation (a Non-goal).
pub struct SvgSerializer {
    groups: Vec<SvgGroup>,
    dark_root: TargetId,
    clear_root: TargetId,
}

impl Default for SvgSerializer {
    fn default() -> Self {
        let mut groups = Vec::new();
        groups.push(SvgGroup { elements: Vec::new() }); // dark root, index 0
        groups.push(SvgGroup { elements: Vec::new() }); // clear root, index 1
        Self {
            groups,
            dark_root: TargetId(0),
            clear_root: TargetId(1),
        }
    }
}

impl SvgSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_path(&mut self, target: TargetId, commands: Vec<Box<dyn Command>>, polarity: Polarity) {
        let color = match polarity {
            Polarity::Dark => Color::from_name(ColorName::Black),
            Polarity::Clear => Color::from_name(ColorName::White),
        };
        let path = SvgPath::new()
            .set_fill(Paint::from_color(color))
            .add_commands(commands);
        if let Some(group) = self.groups.get_mut(target.0) {
            group.elements.push(Box::new(path));
        }
    }

    fn stroke_path(
        &mut self,
        target: TargetId,
        width: f64,
        commands: Vec<Box<dyn Command>>,
        polarity: Polarity,
    ) {
        let color = match polarity {
            Polarity::Dark => Color::from_name(ColorName::Black),
            Polarity::Clear => Color::from_name(ColorName::White),
        };
        let path = SvgPath::new()
            .set_stroke(Paint::from_color(color))
            .set_stroke_width(Size::from_length(width))
            .add_commands(commands);
        if let Some(group) = self.groups.get_mut(target.0) {
            group.elements.push(Box::new(path));
        }
    }

    fn contour_commands(
        contour: &Contour,
        format: &CoordinateFormat,
        origin: RealPoint,
    ) -> Vec<Box<dyn Command>> {
        let mut commands: Vec<Box<dyn Command>> = Vec::new();
        let segments = contour.segments();
        if let Some(first) = segments.first() {
            let start = origin + format.convert(first.start());
            commands.push(Box::new(MoveTo {
                point: (start.x, start.y),
                coordinate_type: CoordinateType::Absolute,
            }));
        }
        for segment in segments {
            commands.push(contour_segment_command(segment, format, origin));
        }
        commands.push(Box::new(End {}));
        commands
    }
}

fn contour_segment_command(
    segment: &ContourSegment,
    format: &CoordinateFormat,
    origin: RealPoint,
) -> Box<dyn Command> {
    match segment {
        ContourSegment::Line(line) => {
            let end = origin + format.convert(line.end);
            Box::new(LineTo {
                point: (end.x, end.y),
                option: LineToOption::Default,
                coordinate_type: CoordinateType::Absolute,
            })
        }
        ContourSegment::Arc(arc) => arc_command(arc, format, origin),
    }
}

fn arc_command(arc: &ArcSegment, format: &CoordinateFormat, origin: RealPoint) -> Box<dyn Command> {
    let start = format.convert(arc.start());
    let end = format.convert(arc.end());
    let center = format.convert(arc.center());
    let radius = ((start.x - center.x).powi(2) + (start.y - center.y).powi(2)).sqrt();
    let end_point = origin + end;

    Box::new(SvgArc {
        radius: (radius, radius),
        x_axis_rotation: 0.0,
        large_arc_flag: false,
        sweep_flag: matches!(arc.direction, ArcDirection::Clockwise),
        point: (end_point.x, end_point.y),
        coordinate_type: CoordinateType::Absolute,
    })
}

/// A full circle as two half-circle `SvgArc` commands: move to the leftmost point, arc to the
/// rightmost point, arc back, close. A single arc command cannot express a full circle (start
/// and end would coincide), hence the two-arc split.
fn circle_commands(center: RealPoint, radius: f64) -> Vec<Box<dyn Command>> {
    let left = (center.x - radius, center.y);
    let right = (center.x + radius, center.y);
    vec![
        Box::new(MoveTo {
            point: left,
            coordinate_type: CoordinateType::Absolute,
        }),
        Box::new(SvgArc {
            radius: (radius, radius),
            x_axis_rotation: 0.0,
            large_arc_flag: true,
            sweep_flag: false,
            point: right,
            coordinate_type: CoordinateType::Absolute,
        }),
        Box::new(SvgArc {
            radius: (radius, radius),
            x_axis_rotation: 0.0,
            large_arc_flag: true,
            sweep_flag: false,
            point: left,
            coordinate_type: CoordinateType::Absolute,
        }),
        Box::new(End {}),
    ]
}

impl Serializer for SvgSerializer {
    fn new_group(&mut self, _parent: TargetId) -> TargetId {
        self.groups.push(SvgGroup { elements: Vec::new() });
        TargetId(self.groups.len() - 1)
    }

    fn new_mask(&mut self, _bounds: Bounds) -> TargetId {
        self.new_group(self.dark_root)
    }

    fn set_mask(&mut self, _target: TargetId, _mask: TargetId) {
        // Boolean mask evaluation is out of scope; retained as a no-op so the interface is
        // complete for callers that only need to express intent.
    }

    fn add_circle(&mut self, target: TargetId, radius: f64, center: RealPoint) {
        let polarity = if target == self.clear_root {
            Polarity::Clear
        } else {
            Polarity::Dark
        };
        let commands = circle_commands(center, radius);
        self.push_path(target, commands, polarity);
    }

    fn add_draw(
        &mut self,
        target: TargetId,
        width: f64,
        segment: Segment,
        format: &CoordinateFormat,
        origin: RealPoint,
    ) {
        let polarity = if target == self.clear_root {
            Polarity::Clear
        } else {
            Polarity::Dark
        };
        let start = origin + format.convert(segment.start);
        let end = origin + format.convert(segment.end);
        let commands: Vec<Box<dyn Command>> = vec![
            Box::new(MoveTo {
                point: (start.x, start.y),
                coordinate_type: CoordinateType::Absolute,
            }),
            Box::new(LineTo {
                point: (end.x, end.y),
                option: LineToOption::Default,
                coordinate_type: CoordinateType::Absolute,
            }),
        ];
        self.stroke_path(target, width, commands, polarity);
    }

    fn add_arc(
        &mut self,
        target: TargetId,
        width: f64,
        arc: ArcSegment,
        format: &CoordinateFormat,
        origin: RealPoint,
    ) {
        let polarity = if target == self.clear_root {
            Polarity::Clear
        } else {
            Polarity::Dark
        };
        let start = origin + format.convert(arc.start());
        let commands: Vec<Box<dyn Command>> = vec![
            Box::new(MoveTo {
                point: (start.x, start.y),
                coordinate_type: CoordinateType::Absolute,
            }),
            arc_command(&arc, format, origin),
        ];
        self.stroke_path(target, width, commands, polarity);
    }

    fn add_polygon(&mut self, target: TargetId, points: &[RealPoint]) {
        let polarity = if target == self.clear_root {
            Polarity::Clear
        } else {
            Polarity::Dark
        };
        let mut commands: Vec<Box<dyn Command>> = Vec::new();
        if let Some(first) = points.first() {
            commands.push(Box::new(MoveTo {
                point: (first.x, first.y),
                coordinate_type: CoordinateType::Absolute,
            }));
        }
        for point in points.iter().skip(1) {
            commands.push(Box::new(LineTo {
                point: (point.x, point.y),
                option: LineToOption::Default,
                coordinate_type: CoordinateType::Absolute,
            }));
        }
        commands.push(Box::new(End {}));
        self.push_path(target, commands, polarity);
    }

    fn add_contour(
        &mut self,
        target: TargetId,
        contour: &Contour,
        format: &CoordinateFormat,
        origin: RealPoint,
    ) {
        let polarity = if target == self.clear_root {
            Polarity::Clear
        } else {
            Polarity::Dark
        };
        let commands = Self::contour_commands(contour, format, origin);
        self.push_path(target, commands, polarity);
    }

    fn get_target(&mut self, polarity: Polarity) -> TargetId {
        match polarity {
            Polarity::Dark => self.dark_root,
            Polarity::Clear => self.clear_root,
        }
    }

    fn save(&mut self, path: &Path) -> Result<(), GerberError> {
        let mut document = SvgDocument::new();
        for group in &mut self.groups {
            for element in group.elements.drain(..) {
                document.add_element(element);
            }
        }
        std::fs::write(path, document.to_string()).map_err(|e| GerberError::Io(IoError::Read(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_target_is_stable_for_same_polarity() {
        let mut serializer = SvgSerializer::new();
        let a = serializer.get_target(Polarity::Dark);
        let b = serializer.get_target(Polarity::Dark);
        assert_eq!(a, b);
        assert_ne!(a, serializer.get_target(Polarity::Clear));
    }

    #[test]
    fn new_group_returns_distinct_targets() {
        let mut serializer = SvgSerializer::new();
        let parent = serializer.get_target(Polarity::Dark);
        let a = serializer.new_group(parent);
        let b = serializer.new_group(parent);
        assert_ne!(a, b);
    }

    #[test]
    fn circle_commands_trace_a_closed_two_arc_path_through_the_diameter_endpoints() {
        let center = RealPoint::new(2.0, -1.0);
        let commands = circle_commands(center, 0.5);

        // MoveTo the leftmost point, SvgArc to the rightmost point, SvgArc back, End: four
        // commands, not a single bare MoveTo with no path data.
        assert_eq!(commands.len(), 4);

        let mut document = SvgDocument::new();
        let path = SvgPath::new().add_commands(commands);
        document.add_element(Box::new(path));
        let rendered = document.to_string();

        // The rendered path data must contain both arc commands and reach both sides of the
        // circle's diameter, not collapse to a single point.
        assert!(rendered.contains('A'), "expected an SVG arc command: {rendered}");
        assert!(rendered.contains("1.5"), "expected the leftmost x coordinate: {rendered}");
        assert!(rendered.contains("2.5"), "expected the rightmost x coordinate: {rendered}");
    }

    #[test]
    fn add_circle_on_the_dark_root_produces_a_filled_path_with_real_geometry() {
        let mut serializer = SvgSerializer::new();
        let target = serializer.get_target(Polarity::Dark);
        serializer.add_circle(target, 1.0, RealPoint::new(0.0, 0.0));

        assert_eq!(serializer.groups[target.0].elements.len(), 1);
    }
}
