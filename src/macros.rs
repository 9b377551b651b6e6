//! The macro engine: the scoped variable table and the primitive factory that turns a macro
//! template's literal body words into resolved `MacroPrimitive` geometry at call time. Grounded
//! on the primitive catalogue in the upstream aperture-macro source and on `gerber_file.rs`'s
//! `shape_from_aperture_macro`, generalized to cover every primitive that source left as
//! `bail!("Unimplemented")`.

use std::collections::HashMap;

use crate::error::ParseError;
use crate::geometry::{Bounds, Polarity, RealPoint};
use crate::shunting_yard::evaluate;

/// Scoped mapping from macro variable index (`$n`, 1-based) to value, local to one
/// `MacroTemplate::instantiate` call.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<u32, f64>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: u32, value: f64) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: u32) -> Result<f64, ParseError> {
        self.values.get(&id).copied().ok_or_else(|| {
            ParseError::Expression(format!("undefined macro variable ${id}"))
        })
    }
}

fn exposure_from(value: f64) -> Polarity {
    if value.round() as i64 != 0 {
        Polarity::Dark
    } else {
        Polarity::Clear
    }
}

/// A fully resolved macro primitive: numeric, absolute geometry, ready for bounding-box
/// computation and serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroPrimitive {
    Comment,
    Circle {
        exposure: Polarity,
        diameter: f64,
        center: (f64, f64),
        rotation: f64,
    },
    VectorLine {
        exposure: Polarity,
        width: f64,
        start: (f64, f64),
        end: (f64, f64),
        rotation: f64,
    },
    CenterLine {
        exposure: Polarity,
        size: (f64, f64),
        center: (f64, f64),
        rotation: f64,
    },
    Outline {
        exposure: Polarity,
        points: Vec<(f64, f64)>,
        rotation: f64,
    },
    Polygon {
        exposure: Polarity,
        num_vertices: u32,
        center: (f64, f64),
        diameter: f64,
        rotation: f64,
    },
    Thermal {
        center: (f64, f64),
        outer_diameter: f64,
        inner_diameter: f64,
        gap_thickness: f64,
        rotation: f64,
    },
}

/// Evaluate every comma-separated field of a macro body word (after the leading code) as an
/// infix expression, in order.
fn evaluate_fields(fields: &[&str], variables: &Variables) -> Result<Vec<f64>, ParseError> {
    fields.iter().map(|field| evaluate(field, variables)).collect()
}

fn field(values: &[f64], index: usize, word: &str) -> Result<f64, ParseError> {
    values.get(index).copied().ok_or_else(|| {
        ParseError::MalformedToken {
            word: word.to_string(),
            reason: format!("expected at least {} field(s)", index + 1),
        }
    })
}

/// Parses one macro body word against the current (mutable) variable table. Returns `None` for
/// comments and variable-definition words, which contribute no primitive.
pub fn macro_word_to_primitive(
    word: &str,
    variables: &mut Variables,
) -> Result<Option<MacroPrimitive>, ParseError> {
    let trimmed = word.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Variable assignment: "$n=<expr>"
    if let Some(rest) = trimmed.strip_prefix('$') {
        if let Some((index_text, expr_text)) = rest.split_once('=') {
            if index_text.chars().all(|c| c.is_ascii_digit()) && !index_text.is_empty() {
                let id: u32 = index_text.parse().map_err(|_| ParseError::MalformedToken {
                    word: word.to_string(),
                    reason: "invalid variable index".to_string(),
                })?;
                let value = evaluate(expr_text, variables)?;
                variables.set(id, value);
                return Ok(None);
            }
        }
    }

    let mut parts = trimmed.splitn(2, ',');
    let code = parts.next().unwrap_or_default().trim();

    if code == "0" {
        return Ok(None); // comment, rest of the word is human text
    }

    let rest = parts.next().unwrap_or_default();
    let fields: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').collect()
    };
    let values = evaluate_fields(&fields, variables)?;

    match code {
        "1" => {
            let exposure = exposure_from(field(&values, 0, word)?);
            let diameter = field(&values, 1, word)?;
            let center = (field(&values, 2, word)?, field(&values, 3, word)?);
            let rotation = values.get(4).copied().unwrap_or(0.0);
            Ok(Some(MacroPrimitive::Circle {
                exposure,
                diameter,
                center,
                rotation,
            }))
        }
        "20" => {
            let exposure = exposure_from(field(&values, 0, word)?);
            let width = field(&values, 1, word)?;
            let start = (field(&values, 2, word)?, field(&values, 3, word)?);
            let end = (field(&values, 4, word)?, field(&values, 5, word)?);
            let rotation = values.get(6).copied().unwrap_or(0.0);
            Ok(Some(MacroPrimitive::VectorLine {
                exposure,
                width,
                start,
                end,
                rotation,
            }))
        }
        "21" => {
            let exposure = exposure_from(field(&values, 0, word)?);
            let size = (field(&values, 1, word)?, field(&values, 2, word)?);
            let center = (field(&values, 3, word)?, field(&values, 4, word)?);
            let rotation = values.get(5).copied().unwrap_or(0.0);
            Ok(Some(MacroPrimitive::CenterLine {
                exposure,
                size,
                center,
                rotation,
            }))
        }
        "4" => {
            let exposure = exposure_from(field(&values, 0, word)?);
            let extra_vertices = field(&values, 1, word)? as usize;
            let num_points = extra_vertices + 1;
            let mut points = Vec::with_capacity(num_points);
            for i in 0..num_points {
                let x = field(&values, 2 + i * 2, word)?;
                let y = field(&values, 3 + i * 2, word)?;
                points.push((x, y));
            }
            let rotation = values.get(2 + num_points * 2).copied().unwrap_or(0.0);
            Ok(Some(MacroPrimitive::Outline {
                exposure,
                points,
                rotation,
            }))
        }
        "5" => {
            let exposure = exposure_from(field(&values, 0, word)?);
            let num_vertices = field(&values, 1, word)? as u32;
            let center = (field(&values, 2, word)?, field(&values, 3, word)?);
            let diameter = field(&values, 4, word)?;
            let rotation = values.get(5).copied().unwrap_or(0.0);
            if !(3..=12).contains(&num_vertices) {
                return Err(ParseError::InvalidAperture(format!(
                    "macro polygon vertex count {num_vertices} outside [3, 12]"
                )));
            }
            Ok(Some(MacroPrimitive::Polygon {
                exposure,
                num_vertices,
                center,
                diameter,
                rotation,
            }))
        }
        "7" => {
            let center = (field(&values, 0, word)?, field(&values, 1, word)?);
            let outer_diameter = field(&values, 2, word)?;
            let inner_diameter = field(&values, 3, word)?;
            let gap_thickness = field(&values, 4, word)?;
            let rotation = values.get(5).copied().unwrap_or(0.0);
            if outer_diameter <= inner_diameter {
                return Err(ParseError::InvalidAperture(
                    "thermal outer diameter must exceed inner diameter".to_string(),
                ));
            }
            if gap_thickness >= outer_diameter / std::f64::consts::SQRT_2 {
                return Err(ParseError::InvalidAperture(
                    "thermal gap thickness must be less than outer / sqrt(2)".to_string(),
                ));
            }
            Ok(Some(MacroPrimitive::Thermal {
                center,
                outer_diameter,
                inner_diameter,
                gap_thickness,
                rotation,
            }))
        }
        other => Err(ParseError::MalformedToken {
            word: word.to_string(),
            reason: format!("unrecognized macro primitive code '{other}'"),
        }),
    }
}

impl MacroPrimitive {
    /// A local (un-rotated-about-macro-origin-corrected) bounding box used to fold up a
    /// `Macro` aperture's overall bounds. Good enough for the non-negativity invariant tested
    /// in the property suite; does not attempt exact rotated-rectangle bounds.
    pub fn bounding_box(&self) -> Bounds {
        match self {
            MacroPrimitive::Comment => Bounds::new(0.0, 0.0, 0.0, 0.0),
            MacroPrimitive::Circle {
                diameter, center, ..
            } => Bounds::from_center_diameter(RealPoint::new(center.0, center.1), *diameter),
            MacroPrimitive::VectorLine {
                width, start, end, ..
            } => {
                let half = width / 2.0;
                let left = start.0.min(end.0) - half;
                let right = start.0.max(end.0) + half;
                let bottom = start.1.min(end.1) - half;
                let top = start.1.max(end.1) + half;
                Bounds::new(right - left, top - bottom, left, bottom)
            }
            MacroPrimitive::CenterLine { size, center, .. } => Bounds::new(
                size.0,
                size.1,
                center.0 - size.0 / 2.0,
                center.1 - size.1 / 2.0,
            ),
            MacroPrimitive::Outline { points, .. } => {
                let xs = points.iter().map(|p| p.0);
                let ys = points.iter().map(|p| p.1);
                let left = xs.clone().fold(f64::INFINITY, f64::min);
                let right = xs.fold(f64::NEG_INFINITY, f64::max);
                let bottom = ys.clone().fold(f64::INFINITY, f64::min);
                let top = ys.fold(f64::NEG_INFINITY, f64::max);
                Bounds::new(right - left, top - bottom, left, bottom)
            }
            MacroPrimitive::Polygon {
                center, diameter, ..
            } => Bounds::from_center_diameter(RealPoint::new(center.0, center.1), *diameter),
            MacroPrimitive::Thermal {
                center,
                outer_diameter,
                ..
            } => Bounds::from_center_diameter(RealPoint::new(center.0, center.1), *outer_diameter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_primitive_resolves_expressions_against_variables() {
        let mut vars = Variables::new();
        vars.set(1, 1.0);
        vars.set(2, 0.100);
        vars.set(3, 0.0);
        let primitive = macro_word_to_primitive("1,1,$1,$2,$3", &mut vars)
            .unwrap()
            .unwrap();
        assert_eq!(
            primitive,
            MacroPrimitive::Circle {
                exposure: Polarity::Dark,
                diameter: 1.0,
                center: (0.100, 0.0),
                rotation: 0.0,
            }
        );
    }

    #[test]
    fn comment_and_assignment_yield_no_primitive() {
        let mut vars = Variables::new();
        assert!(macro_word_to_primitive("0 a comment", &mut vars)
            .unwrap()
            .is_none());
        assert!(macro_word_to_primitive("$5=1+2", &mut vars).unwrap().is_none());
        assert!((vars.get(5).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn thermal_enforces_geometry_invariants() {
        let mut vars = Variables::new();
        let bad = macro_word_to_primitive("7,0,0,1.0,1.2,0.2,0", &mut vars);
        assert!(bad.is_err());
    }

    #[test]
    fn polygon_enforces_vertex_count_bounds() {
        let mut vars = Variables::new();
        let bad = macro_word_to_primitive("5,1,2,0,0,1.0,0", &mut vars);
        assert!(bad.is_err());
    }
}
