//! The commands processor: the stateful core that interprets decoded operations, builds up the
//! destination stack and resolves the final object list. Grounded on
//! `processing/CommandsProcessor.h` — the same `CommandState`, destination-stack, active-region and
//! active-step-and-repeat bookkeeping, reimplemented with owned `Vec`s instead of raw pointers into
//! a parent's vector.

use std::collections::HashMap;

use crate::aperture::{Aperture, ApertureDictionary, ApertureTemplate, TemplateRegistry};
use crate::error::{GerberError, LogicError, ParseError};
use crate::geometry::{
    ArcDirection, ArcSegment, Contour, ContourSegment, CoordinateFormat, FixedPoint, Mirroring,
    Polarity, Segment, Transform,
};
use crate::graphics_state::{ArcMode, CoordinateData, GraphicsState, PlotState, Unit};
use crate::object::GraphicalObject;

/// Where the processor currently stands relative to a region body. Mirrors
/// `CommandState` in the upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Normal,
    InsideRegion,
    EndOfFile,
}

#[derive(Debug, Default)]
struct RegionBuilder {
    contours: Vec<Contour>,
    current: Contour,
}

impl RegionBuilder {
    /// Ends the contour currently accumulating, folding it into the finished list even when it
    /// never closed. A region with an open trailing contour is a caller-visible condition
    /// (`GraphicalObject::contours_closed`), not a parse failure.
    fn finish_current(&mut self) {
        if !self.current.is_empty() {
            self.contours.push(std::mem::take(&mut self.current));
        }
    }
}

/// One level of the nested destination stack: either the implicit top level, an open aperture
/// block, or an open step-and-repeat body.
#[derive(Debug)]
enum DestinationFrame {
    Block { ident: u32 },
    StepAndRepeat { nx: u32, ny: u32, dx: f64, dy: f64 },
}

/// File/aperture/object attribute tables. Parsed and stored verbatim; never consulted by
/// geometry or control flow.
#[derive(Debug, Default)]
pub struct Attributes {
    pub file: HashMap<String, Vec<String>>,
    pub aperture: HashMap<String, Vec<String>>,
    pub object: HashMap<String, Vec<String>>,
}

impl Attributes {
    fn delete(&mut self, name: Option<&str>) {
        match name {
            Some(name) => {
                self.file.remove(name);
                self.aperture.remove(name);
                self.object.remove(name);
            }
            None => {
                self.file.clear();
                self.aperture.clear();
                self.object.clear();
            }
        }
    }
}

/// The stateful core driving a single file's worth of commands to a resolved object list.
pub struct Processor {
    command_state: CommandState,
    graphics_state: GraphicsState,
    apertures: ApertureDictionary,
    templates: TemplateRegistry,
    dest_stack: Vec<Vec<GraphicalObject>>,
    dest_frames: Vec<DestinationFrame>,
    active_region: Option<RegionBuilder>,
    attributes: Attributes,
}

impl Default for Processor {
    fn default() -> Self {
        Self {
            command_state: CommandState::Normal,
            graphics_state: GraphicsState::new(),
            apertures: ApertureDictionary::new(),
            templates: TemplateRegistry::new(),
            dest_stack: vec![Vec::new()],
            dest_frames: Vec::new(),
            active_region: None,
            attributes: Attributes::default(),
        }
    }
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_state(&self) -> CommandState {
        self.command_state
    }

    pub fn graphics_state(&self) -> &GraphicsState {
        &self.graphics_state
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The finished top-level object list. Only meaningful once every block and
    /// step-and-repeat body has been closed.
    pub fn objects(&self) -> Result<&[GraphicalObject], LogicError> {
        if self.dest_stack.len() != 1 {
            return Err(LogicError::NoApertureBlockOpen);
        }
        Ok(&self.dest_stack[0])
    }

    fn push_object(&mut self, object: GraphicalObject) -> Result<(), LogicError> {
        self.dest_stack
            .last_mut()
            .ok_or(LogicError::EmptyDestinationStack)?
            .push(object);
        Ok(())
    }

    fn current_aperture(&self) -> Result<std::rc::Rc<Aperture>, LogicError> {
        let ident = self
            .graphics_state
            .current_aperture
            .ok_or(LogicError::NoCurrentAperture)?;
        self.apertures.get(ident).ok_or(LogicError::NoCurrentAperture)
    }

    /// The aperture cloning policy: a fresh clone of the dictionary template, stamped with the
    /// graphics state's current transform, so later `LP`/`LM`/`LR`/`LS` changes never
    /// retroactively affect objects already captured.
    fn stamped_aperture(&self) -> Result<Aperture, LogicError> {
        let template = self.current_aperture()?;
        Ok(template.clone_with_transform(self.graphics_state.transform))
    }

    // -- format / unit / mode -------------------------------------------------------------

    pub fn set_format(&mut self, format: CoordinateFormat) -> Result<(), LogicError> {
        if self.graphics_state.format.is_some() {
            return Err(LogicError::FormatAlreadySet);
        }
        self.graphics_state.format = Some(format);
        Ok(())
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.graphics_state.unit = Some(unit);
    }

    pub fn set_plot_state(&mut self, plot_state: PlotState) {
        self.graphics_state.plot_state = Some(plot_state);
    }

    /// `SingleQuadrant` arc interpolation is unsupported; recoverable, arc mode left untouched.
    pub fn set_arc_mode(&mut self, arc_mode: ArcMode) -> Result<(), ParseError> {
        match arc_mode {
            ArcMode::MultiQuadrant => {
                self.graphics_state.arc_mode = Some(ArcMode::MultiQuadrant);
                Ok(())
            }
            ArcMode::SingleQuadrant => Err(ParseError::UnsupportedFeature(
                "single-quadrant arc interpolation (G74)",
            )),
        }
    }

    pub fn set_polarity(&mut self, polarity: Polarity) {
        self.graphics_state.transform.polarity = polarity;
    }

    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        self.graphics_state.transform.mirroring = mirroring;
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.graphics_state.transform.rotation = degrees;
    }

    pub fn set_scaling(&mut self, scaling: f64) -> Result<(), LogicError> {
        self.graphics_state.transform.set_scaling(scaling)
    }

    // -- apertures --------------------------------------------------------------------------

    pub fn get_template(&self, name: &str) -> Result<std::rc::Rc<dyn ApertureTemplate>, ParseError> {
        self.templates.get(name)
    }

    pub fn register_macro(&mut self, name: String, body_words: Vec<String>) {
        self.templates.register_macro(name, body_words);
    }

    pub fn aperture_define(&mut self, ident: u32, aperture: Aperture) -> Result<(), LogicError> {
        self.apertures.insert(ident, aperture)
    }

    pub fn set_current_aperture(&mut self, ident: u32) -> Result<(), LogicError> {
        if self.apertures.get(ident).is_none() {
            return Err(LogicError::NoCurrentAperture);
        }
        self.graphics_state.current_aperture = Some(ident);
        Ok(())
    }

    // -- region -----------------------------------------------------------------------------

    pub fn start_region(&mut self) -> Result<(), LogicError> {
        if self.command_state != CommandState::Normal {
            return Err(LogicError::CannotStartRegion);
        }
        self.command_state = CommandState::InsideRegion;
        self.active_region = Some(RegionBuilder::default());
        Ok(())
    }

    /// Always succeeds given `InsideRegion`, folding in whatever contour is accumulating,
    /// closed or not.
    pub fn end_region(&mut self) -> Result<(), LogicError> {
        if self.command_state != CommandState::InsideRegion {
            return Err(LogicError::NotInsideRegion);
        }
        let mut builder = self.active_region.take().expect("InsideRegion implies an active region");
        builder.finish_current();
        self.command_state = CommandState::Normal;

        let object = GraphicalObject::Region {
            contours: builder.contours,
            polarity: self.graphics_state.transform.polarity,
        };
        self.push_object(object)
    }

    // -- aperture blocks ----------------------------------------------------------------------

    pub fn open_aperture_block(&mut self, ident: u32) -> Result<(), LogicError> {
        self.dest_stack.push(Vec::new());
        self.dest_frames.push(DestinationFrame::Block { ident });
        self.graphics_state.set_current_point(None);
        Ok(())
    }

    pub fn close_aperture_block(&mut self) -> Result<(), LogicError> {
        match self.dest_frames.pop() {
            Some(DestinationFrame::Block { ident }) => {
                let objects = self.dest_stack.pop().ok_or(LogicError::EmptyDestinationStack)?;
                let aperture = Aperture::Block {
                    objects,
                    transform: Transform::default(),
                };
                self.graphics_state.set_current_point(None);
                self.apertures.insert(ident, aperture)
            }
            Some(other) => {
                self.dest_frames.push(other);
                Err(LogicError::NoApertureBlockOpen)
            }
            None => Err(LogicError::NoApertureBlockOpen),
        }
    }

    // -- step and repeat ----------------------------------------------------------------------

    pub fn open_step_and_repeat(
        &mut self,
        nx: u32,
        ny: u32,
        dx: f64,
        dy: f64,
    ) -> Result<(), LogicError> {
        if self
            .dest_frames
            .iter()
            .any(|frame| matches!(frame, DestinationFrame::StepAndRepeat { .. }))
        {
            return Err(LogicError::StepAndRepeatAlreadyOpen);
        }
        if nx < 1 || ny < 1 || dx < 0.0 || dy < 0.0 {
            return Err(LogicError::InvalidStepAndRepeat {
                nx: nx as i64,
                ny: ny as i64,
                dx,
                dy,
            });
        }
        self.dest_stack.push(Vec::new());
        self.dest_frames
            .push(DestinationFrame::StepAndRepeat { nx, ny, dx, dy });
        self.graphics_state.set_current_point(None);
        Ok(())
    }

    pub fn close_step_and_repeat(&mut self) -> Result<(), LogicError> {
        match self.dest_frames.pop() {
            Some(DestinationFrame::StepAndRepeat { nx, ny, dx, dy }) => {
                let objects = self.dest_stack.pop().ok_or(LogicError::EmptyDestinationStack)?;
                self.graphics_state.set_current_point(None);
                self.push_object(GraphicalObject::StepAndRepeat {
                    nx,
                    ny,
                    dx,
                    dy,
                    objects,
                })
            }
            Some(other) => {
                self.dest_frames.push(other);
                Err(LogicError::NoStepAndRepeatOpen)
            }
            None => Err(LogicError::NoStepAndRepeatOpen),
        }
    }

    // -- plotting ---------------------------------------------------------------------------

    pub fn mov(&mut self, coord: CoordinateData) -> Result<(), LogicError> {
        let point = self.graphics_state.get_point(coord)?;
        if self.command_state == CommandState::InsideRegion {
            if let Some(region) = self.active_region.as_mut() {
                region.finish_current();
            }
        }
        self.graphics_state.set_current_point(Some(point));
        Ok(())
    }

    pub fn plot_draw(&mut self, coord: CoordinateData) -> Result<(), GerberError> {
        let start = self
            .graphics_state
            .current_point()
            .ok_or(LogicError::NoCurrentPoint)?;
        let end = self.graphics_state.get_point(coord)?;
        let segment = Segment::new(start, end);

        if self.command_state == CommandState::InsideRegion {
            let region = self.active_region.as_mut().expect("InsideRegion implies an active region");
            region
                .current
                .add_segment(ContourSegment::Line(segment))
                .map_err(GerberError::Logic)?;
        } else {
            if !self.current_aperture()?.is_circle() {
                return Err(GerberError::Logic(LogicError::ApertureNotCircle));
            }
            let aperture = self.stamped_aperture()?;
            self.push_object(GraphicalObject::Draw { segment, aperture })?;
        }
        self.graphics_state.set_current_point(Some(end));
        Ok(())
    }

    pub fn plot_arc(
        &mut self,
        coord: CoordinateData,
        center_offset: FixedPoint,
        direction: ArcDirection,
    ) -> Result<(), GerberError> {
        let start = self
            .graphics_state
            .current_point()
            .ok_or(LogicError::NoCurrentPoint)?;
        let end = self.graphics_state.get_point(coord)?;
        let arc = ArcSegment::new(Segment::new(start, end), center_offset, direction);

        if self.command_state == CommandState::InsideRegion {
            let region = self.active_region.as_mut().expect("InsideRegion implies an active region");
            region
                .current
                .add_segment(ContourSegment::Arc(arc))
                .map_err(GerberError::Logic)?;
        } else {
            if !self.current_aperture()?.is_circle() {
                return Err(GerberError::Logic(LogicError::ApertureNotCircle));
            }
            let aperture = self.stamped_aperture()?;
            self.push_object(GraphicalObject::Arc { arc, aperture })?;
        }
        self.graphics_state.set_current_point(Some(end));
        Ok(())
    }

    pub fn flash(&mut self, coord: CoordinateData) -> Result<(), GerberError> {
        if self.command_state == CommandState::InsideRegion {
            return Err(GerberError::Logic(LogicError::NotInsideRegion));
        }
        let point = self.graphics_state.get_point(coord)?;
        let aperture = self.stamped_aperture()?;
        self.push_object(GraphicalObject::Flash {
            origin: point,
            aperture,
        })?;
        self.graphics_state.set_current_point(Some(point));
        Ok(())
    }

    // -- attributes (ambient) -----------------------------------------------------------------

    pub fn set_file_attribute(&mut self, name: String, fields: Vec<String>) {
        self.attributes.file.insert(name, fields);
    }

    pub fn set_aperture_attribute(&mut self, name: String, fields: Vec<String>) {
        self.attributes.aperture.insert(name, fields);
    }

    pub fn set_object_attribute(&mut self, name: String, fields: Vec<String>) {
        self.attributes.object.insert(name, fields);
    }

    pub fn delete_attribute(&mut self, name: Option<String>) {
        self.attributes.delete(name.as_deref());
    }

    // -- end of file --------------------------------------------------------------------------

    pub fn set_end_of_file(&mut self) {
        self.command_state = CommandState::EndOfFile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics_state::CoordinateData;

    fn coord(x: i32, y: i32) -> CoordinateData {
        CoordinateData {
            x: Some(x),
            y: Some(y),
            i: None,
            j: None,
        }
    }

    #[test]
    fn draw_requires_a_circle_aperture() {
        let mut p = Processor::new();
        p.aperture_define(10, Aperture::rectangle(1.0, 1.0, None).unwrap())
            .unwrap();
        p.set_current_aperture(10).unwrap();
        p.mov(coord(0, 0)).unwrap();
        let result = p.plot_draw(coord(10, 0));
        assert!(result.is_err());
    }

    #[test]
    fn region_closes_even_with_an_open_trailing_contour() {
        let mut p = Processor::new();
        p.start_region().unwrap();
        p.mov(coord(0, 0)).unwrap();
        p.plot_draw(coord(10, 0)).unwrap();
        p.plot_draw(coord(10, 10)).unwrap();
        p.end_region().unwrap();

        let objects = p.objects().unwrap();
        match &objects[0] {
            GraphicalObject::Region { contours, .. } => {
                assert_eq!(contours.len(), 1);
                assert!(!contours[0].is_closed());
            }
            _ => panic!("expected a Region"),
        }
    }

    #[test]
    fn end_region_fails_outside_a_region() {
        let mut p = Processor::new();
        assert!(p.end_region().is_err());
    }

    #[test]
    fn aperture_block_nests_and_resolves_to_an_aperture() {
        let mut p = Processor::new();
        p.aperture_define(10, Aperture::circle(1.0, None).unwrap())
            .unwrap();
        p.open_aperture_block(20).unwrap();
        p.set_current_aperture(10).unwrap();
        p.flash(coord(0, 0)).unwrap();
        p.close_aperture_block().unwrap();

        match p.apertures.get(20).unwrap().as_ref() {
            Aperture::Block { objects, .. } => assert_eq!(objects.len(), 1),
            _ => panic!("expected a Block aperture"),
        }
        assert!(p.objects().unwrap().is_empty());
    }

    #[test]
    fn current_point_is_cleared_crossing_block_and_step_and_repeat_boundaries() {
        let mut p = Processor::new();
        p.aperture_define(10, Aperture::circle(1.0, None).unwrap())
            .unwrap();
        p.set_current_aperture(10).unwrap();
        p.mov(coord(1, 1)).unwrap();
        assert!(p.graphics_state().current_point().is_some());

        p.open_aperture_block(20).unwrap();
        assert!(p.graphics_state().current_point().is_none());
        p.flash(coord(0, 0)).unwrap();
        p.close_aperture_block().unwrap();
        assert!(p.graphics_state().current_point().is_none());

        p.mov(coord(2, 2)).unwrap();
        p.open_step_and_repeat(1, 1, 0.0, 0.0).unwrap();
        assert!(p.graphics_state().current_point().is_none());
        p.flash(coord(0, 0)).unwrap();
        p.close_step_and_repeat().unwrap();
        assert!(p.graphics_state().current_point().is_none());
    }

    #[test]
    fn step_and_repeat_closes_into_a_single_object() {
        let mut p = Processor::new();
        p.aperture_define(10, Aperture::circle(1.0, None).unwrap())
            .unwrap();
        p.set_current_aperture(10).unwrap();
        p.open_step_and_repeat(2, 3, 5.0, 4.0).unwrap();
        p.flash(coord(0, 0)).unwrap();
        p.close_step_and_repeat().unwrap();

        let objects = p.objects().unwrap();
        assert_eq!(objects.len(), 1);
        match &objects[0] {
            GraphicalObject::StepAndRepeat { nx, ny, .. } => {
                assert_eq!(*nx, 2);
                assert_eq!(*ny, 3);
            }
            _ => panic!("expected a StepAndRepeat"),
        }
    }

    #[test]
    fn nested_step_and_repeat_is_rejected() {
        let mut p = Processor::new();
        p.open_step_and_repeat(1, 1, 0.0, 0.0).unwrap();
        let result = p.open_step_and_repeat(1, 1, 0.0, 0.0);
        assert!(matches!(result, Err(LogicError::StepAndRepeatAlreadyOpen)));
    }
}
