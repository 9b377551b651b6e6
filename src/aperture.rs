//! The aperture model and its template factories. Grounded on the shape-constructor family in
//! `geometry.rs` (`circle`/`rectangle`/`obround`/`polygon`) and the template dispatch in
//! `gerber_file.rs`'s aperture-define handling, generalized to the fully recursive `Block`
//! variant and a genuine late-binding macro template instead of eager shape baking.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LogicError, ParseError};
use crate::geometry::{Bounds, RealPoint, Transform};
use crate::macros::{macro_word_to_primitive, MacroPrimitive, Variables};
use crate::object::GraphicalObject;

/// A 2D shape, optionally carrying an embedded `Transform` applied lazily at serialization.
#[derive(Debug, Clone)]
pub enum Aperture {
    Circle {
        diameter: f64,
        hole_diameter: Option<f64>,
        transform: Transform,
    },
    Rectangle {
        x_size: f64,
        y_size: f64,
        hole_diameter: Option<f64>,
        transform: Transform,
    },
    Obround {
        x_size: f64,
        y_size: f64,
        hole_diameter: Option<f64>,
        transform: Transform,
    },
    Polygon {
        outer_diameter: f64,
        num_vertices: u32,
        rotation: f64,
        hole_diameter: Option<f64>,
        transform: Transform,
    },
    Macro {
        primitives: Vec<MacroPrimitive>,
        transform: Transform,
    },
    Block {
        objects: Vec<GraphicalObject>,
        transform: Transform,
    },
}

fn validate_dimension(value: f64, label: &str) -> Result<(), ParseError> {
    if value < 0.0 {
        return Err(ParseError::InvalidAperture(format!(
            "{label} must be >= 0, got {value}"
        )));
    }
    Ok(())
}

fn validate_hole(hole: Option<f64>) -> Result<(), ParseError> {
    if let Some(h) = hole {
        validate_dimension(h, "hole diameter")?;
    }
    Ok(())
}

impl Aperture {
    pub fn circle(diameter: f64, hole_diameter: Option<f64>) -> Result<Self, ParseError> {
        validate_dimension(diameter, "circle diameter")?;
        validate_hole(hole_diameter)?;
        Ok(Aperture::Circle {
            diameter,
            hole_diameter,
            transform: Transform::default(),
        })
    }

    pub fn rectangle(
        x_size: f64,
        y_size: f64,
        hole_diameter: Option<f64>,
    ) -> Result<Self, ParseError> {
        validate_dimension(x_size, "rectangle x size")?;
        validate_dimension(y_size, "rectangle y size")?;
        validate_hole(hole_diameter)?;
        Ok(Aperture::Rectangle {
            x_size,
            y_size,
            hole_diameter,
            transform: Transform::default(),
        })
    }

    pub fn obround(
        x_size: f64,
        y_size: f64,
        hole_diameter: Option<f64>,
    ) -> Result<Self, ParseError> {
        validate_dimension(x_size, "obround x size")?;
        validate_dimension(y_size, "obround y size")?;
        validate_hole(hole_diameter)?;
        Ok(Aperture::Obround {
            x_size,
            y_size,
            hole_diameter,
            transform: Transform::default(),
        })
    }

    pub fn polygon(
        outer_diameter: f64,
        num_vertices: u32,
        rotation: f64,
        hole_diameter: Option<f64>,
    ) -> Result<Self, ParseError> {
        validate_dimension(outer_diameter, "polygon outer diameter")?;
        validate_hole(hole_diameter)?;
        if !(3..=12).contains(&num_vertices) {
            return Err(ParseError::InvalidAperture(format!(
                "polygon vertex count {num_vertices} outside [3, 12]"
            )));
        }
        Ok(Aperture::Polygon {
            outer_diameter,
            num_vertices,
            rotation,
            hole_diameter,
            transform: Transform::default(),
        })
    }

    pub fn transform(&self) -> &Transform {
        match self {
            Aperture::Circle { transform, .. }
            | Aperture::Rectangle { transform, .. }
            | Aperture::Obround { transform, .. }
            | Aperture::Polygon { transform, .. }
            | Aperture::Macro { transform, .. }
            | Aperture::Block { transform, .. } => transform,
        }
    }

    pub fn set_transform(&mut self, new_transform: Transform) {
        match self {
            Aperture::Circle { transform, .. }
            | Aperture::Rectangle { transform, .. }
            | Aperture::Obround { transform, .. }
            | Aperture::Polygon { transform, .. }
            | Aperture::Macro { transform, .. }
            | Aperture::Block { transform, .. } => *transform = new_transform,
        }
    }

    /// The aperture cloning policy used by Flash/Draw/Arc: clone, then stamp the clone with the
    /// graphics state's current transform so later transform changes never retroactively affect
    /// already-captured objects.
    pub fn clone_with_transform(&self, transform: Transform) -> Aperture {
        let mut clone = self.clone();
        clone.set_transform(transform);
        clone
    }

    pub fn is_circle(&self) -> bool {
        matches!(self, Aperture::Circle { .. })
    }

    /// Geometric bounding box in the aperture's own local space (transform not applied — the
    /// embedded transform is a serialization-time concern per the data model).
    pub fn bounding_box(&self) -> Bounds {
        match self {
            Aperture::Circle { diameter, .. } => {
                Bounds::from_center_diameter(RealPoint::zero(), *diameter)
            }
            Aperture::Rectangle { x_size, y_size, .. }
            | Aperture::Obround { x_size, y_size, .. } => {
                Bounds::new(*x_size, *y_size, -x_size / 2.0, -y_size / 2.0)
            }
            Aperture::Polygon { outer_diameter, .. } => {
                Bounds::from_center_diameter(RealPoint::zero(), *outer_diameter)
            }
            Aperture::Macro { primitives, .. } => {
                let mut iter = primitives.iter().map(MacroPrimitive::bounding_box);
                let first = iter.next().unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0));
                iter.fold(first, |acc, b| acc.extend(&b))
            }
            Aperture::Block { objects, .. } => {
                let mut iter = objects.iter().map(GraphicalObject::bounding_box);
                let first = iter.next().unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0));
                iter.fold(first, |acc, b| acc.extend(&b))
            }
        }
    }
}

/// A named factory producing an `Aperture` from a numeric parameter list.
pub trait ApertureTemplate: std::fmt::Debug {
    fn instantiate(&self, params: &[f64]) -> Result<Aperture, ParseError>;
}

#[derive(Debug)]
pub struct CircleTemplate;

impl ApertureTemplate for CircleTemplate {
    fn instantiate(&self, params: &[f64]) -> Result<Aperture, ParseError> {
        match params {
            [diameter] => Aperture::circle(*diameter, None),
            [diameter, hole] => Aperture::circle(*diameter, Some(*hole)),
            _ => Err(ParseError::WrongParameterCount {
                name: "C".to_string(),
                expected: "1 or 2",
                actual: params.len(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct RectangleTemplate;

impl ApertureTemplate for RectangleTemplate {
    fn instantiate(&self, params: &[f64]) -> Result<Aperture, ParseError> {
        match params {
            [x, y] => Aperture::rectangle(*x, *y, None),
            [x, y, hole] => Aperture::rectangle(*x, *y, Some(*hole)),
            _ => Err(ParseError::WrongParameterCount {
                name: "R".to_string(),
                expected: "2 or 3",
                actual: params.len(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct ObroundTemplate;

impl ApertureTemplate for ObroundTemplate {
    fn instantiate(&self, params: &[f64]) -> Result<Aperture, ParseError> {
        match params {
            [x, y] => Aperture::obround(*x, *y, None),
            [x, y, hole] => Aperture::obround(*x, *y, Some(*hole)),
            _ => Err(ParseError::WrongParameterCount {
                name: "O".to_string(),
                expected: "2 or 3",
                actual: params.len(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct PolygonTemplate;

impl ApertureTemplate for PolygonTemplate {
    fn instantiate(&self, params: &[f64]) -> Result<Aperture, ParseError> {
        match params {
            [outer, n] => Aperture::polygon(*outer, *n as u32, 0.0, None),
            [outer, n, rotation] => Aperture::polygon(*outer, *n as u32, *rotation, None),
            [outer, n, rotation, hole] => {
                Aperture::polygon(*outer, *n as u32, *rotation, Some(*hole))
            }
            _ => Err(ParseError::WrongParameterCount {
                name: "P".to_string(),
                expected: "2, 3, or 4",
                actual: params.len(),
            }),
        }
    }
}

/// A user-defined aperture macro: the literal, unparsed body words. Re-evaluated against a
/// fresh variable table on every `instantiate` call — macros are never pre-compiled.
#[derive(Debug, Clone)]
pub struct MacroTemplate {
    pub name: String,
    pub body_words: Vec<String>,
}

impl ApertureTemplate for MacroTemplate {
    fn instantiate(&self, params: &[f64]) -> Result<Aperture, ParseError> {
        let mut variables = Variables::new();
        for (i, value) in params.iter().enumerate() {
            variables.set((i + 1) as u32, *value);
        }

        let mut primitives = Vec::new();
        for word in &self.body_words {
            if let Some(primitive) = macro_word_to_primitive(word, &mut variables)? {
                primitives.push(primitive);
            }
        }

        Ok(Aperture::Macro {
            primitives,
            transform: Transform::default(),
        })
    }
}

/// The set of registered aperture templates: the four built-ins plus any user-defined macros.
#[derive(Debug)]
pub struct TemplateRegistry {
    templates: HashMap<String, Rc<dyn ApertureTemplate>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        let mut templates: HashMap<String, Rc<dyn ApertureTemplate>> = HashMap::new();
        templates.insert("C".to_string(), Rc::new(CircleTemplate));
        templates.insert("R".to_string(), Rc::new(RectangleTemplate));
        templates.insert("O".to_string(), Rc::new(ObroundTemplate));
        templates.insert("P".to_string(), Rc::new(PolygonTemplate));
        Self { templates }
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_macro(&mut self, name: String, body_words: Vec<String>) {
        self.templates.insert(
            name.clone(),
            Rc::new(MacroTemplate { name, body_words }),
        );
    }

    pub fn get(&self, name: &str) -> Result<Rc<dyn ApertureTemplate>, ParseError> {
        self.templates.get(name).cloned().ok_or_else(|| {
            ParseError::NotFound {
                kind: "template",
                id: name.to_string(),
            }
        })
    }
}

/// Write-once mapping from aperture ident (>= 10) to a shared, immutable `Aperture`.
#[derive(Debug, Default)]
pub struct ApertureDictionary {
    entries: HashMap<u32, Rc<Aperture>>,
}

impl ApertureDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, aperture: Aperture) -> Result<(), LogicError> {
        if id < 10 {
            return Err(LogicError::InvalidApertureIdent(id));
        }
        if self.entries.contains_key(&id) {
            return Err(LogicError::ApertureRedefined(id));
        }
        self.entries.insert(id, Rc::new(aperture));
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<Rc<Aperture>> {
        self.entries.get(&id).cloned()
    }
}
