//! `GraphicalObject`: the leaf of the resolved scene graph, plus region-closure bookkeeping and
//! step-and-repeat expansion. Grounded on the `GerberFile { shapes, aperture_macro_flashes }`
//! accumulation in `gerber_file.rs`, generalized into the five-variant sum type the processor's
//! destination stack actually produces.

use crate::aperture::Aperture;
use crate::error::GerberError;
use crate::geometry::{
    ArcSegment, Bounds, Contour, FixedPoint, Polarity, RealPoint, Segment, Transform,
};
use crate::serialize::Serializer;

/// A positioned, transform-stamped graphical primitive.
#[derive(Debug, Clone)]
pub enum GraphicalObject {
    Draw {
        segment: Segment,
        aperture: Aperture,
    },
    Arc {
        arc: ArcSegment,
        aperture: Aperture,
    },
    Flash {
        origin: FixedPoint,
        aperture: Aperture,
    },
    Region {
        contours: Vec<Contour>,
        polarity: Polarity,
    },
    StepAndRepeat {
        nx: u32,
        ny: u32,
        dx: f64,
        dy: f64,
        objects: Vec<GraphicalObject>,
    },
}

impl GraphicalObject {
    /// Local (untransformed) bounding box, used when folding up a containing `Block`
    /// aperture's bounds.
    pub fn bounding_box(&self) -> Bounds {
        match self {
            GraphicalObject::Draw { segment, aperture } => {
                let radius = aperture.bounding_box().width / 2.0;
                let start = RealPoint::new(segment.start.x as f64, segment.start.y as f64);
                let end = RealPoint::new(segment.end.x as f64, segment.end.y as f64);
                Bounds::from_center_diameter(start, radius * 2.0)
                    .extend(&Bounds::from_center_diameter(end, radius * 2.0))
            }
            GraphicalObject::Arc { arc, aperture } => {
                let radius = aperture.bounding_box().width / 2.0;
                let center = RealPoint::new(arc.center().x as f64, arc.center().y as f64);
                // Conservative: bound by the full circle the arc travels on, padded by the
                // stroke radius.
                let span = ((arc.start().x - arc.center().x).pow(2) as f64
                    + (arc.start().y - arc.center().y).pow(2) as f64)
                    .sqrt();
                Bounds::from_center_diameter(center, span * 2.0).pad(radius)
            }
            GraphicalObject::Flash { origin, aperture } => aperture
                .bounding_box()
                .translate(RealPoint::new(origin.x as f64, origin.y as f64)),
            GraphicalObject::Region { contours, .. } => {
                let mut bb: Option<Bounds> = None;
                for contour in contours {
                    for segment in contour.segments() {
                        let p = RealPoint::new(segment.start().x as f64, segment.start().y as f64);
                        let point_box = Bounds::new(0.0, 0.0, p.x, p.y);
                        bb = Some(match bb {
                            Some(existing) => existing.extend(&point_box),
                            None => point_box,
                        });
                    }
                }
                bb.unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0))
            }
            GraphicalObject::StepAndRepeat { objects, .. } => {
                let mut iter = objects.iter().map(GraphicalObject::bounding_box);
                let first = iter.next().unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0));
                iter.fold(first, |acc, b| acc.extend(&b))
            }
        }
    }

    /// Whether every contour of a `Region` closed cleanly. `true` for every other variant, so
    /// callers can check it unconditionally while walking a resolved object list.
    pub fn contours_closed(&self) -> bool {
        match self {
            GraphicalObject::Region { contours, .. } => contours.iter().all(Contour::is_closed),
            _ => true,
        }
    }

    /// The polarity this object renders with: a leaf's aperture transform for
    /// Draw/Arc/Flash, its own stored polarity for Region, and "whatever its children declare"
    /// for StepAndRepeat (each child carries its own).
    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            GraphicalObject::Draw { aperture, .. }
            | GraphicalObject::Arc { aperture, .. }
            | GraphicalObject::Flash { aperture, .. } => Some(aperture.transform().polarity),
            GraphicalObject::Region { polarity, .. } => Some(*polarity),
            GraphicalObject::StepAndRepeat { .. } => None,
        }
    }

    /// Convert this object's geometry into calls on the serializer interface, rooted at
    /// `origin`. Recurses into `Block` apertures (via Flash) and `StepAndRepeat` expansion,
    /// stacking `parent_transform` onto each leaf's own baked transform per §3's composition
    /// rule — this is what makes a flashed block's polarity/rotation/scale apply to its
    /// contents rather than being discarded at the block boundary.
    pub fn serialize(
        &self,
        serializer: &mut dyn Serializer,
        origin: RealPoint,
        format: &crate::geometry::CoordinateFormat,
        parent_transform: &Transform,
    ) -> Result<(), GerberError> {
        match self {
            GraphicalObject::Draw { segment, aperture } => {
                let effective = parent_transform.stack(aperture.transform());
                let width = aperture.bounding_box().width * effective.scaling;
                let target = serializer.get_target(effective.polarity);
                serializer.add_draw(target, width, *segment, format, origin);
            }
            GraphicalObject::Arc { arc, aperture } => {
                let effective = parent_transform.stack(aperture.transform());
                let width = aperture.bounding_box().width * effective.scaling;
                let target = serializer.get_target(effective.polarity);
                serializer.add_arc(target, width, *arc, format, origin);
            }
            GraphicalObject::Flash { origin: at, aperture } => {
                let effective = parent_transform.stack(aperture.transform());
                let real_origin = origin + format.convert(*at);
                serialize_aperture(aperture, serializer, real_origin, format, &effective)?;
            }
            GraphicalObject::Region { contours, polarity } => {
                let target = serializer.get_target(*polarity);
                for contour in contours {
                    serializer.add_contour(target, contour, format, origin);
                }
            }
            GraphicalObject::StepAndRepeat {
                nx,
                ny,
                dx,
                dy,
                objects,
            } => {
                for ix in 0..*nx {
                    for iy in 0..*ny {
                        let offset = RealPoint::new(ix as f64 * dx, iy as f64 * dy);
                        for object in objects {
                            object.serialize(serializer, origin + offset, format, parent_transform)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Stamps `aperture`'s local shape into the serializer at `origin`, with `effective_transform`
/// (the flash's transform already stacked with the aperture's own) governing polarity and the
/// mirror/scale/rotate applied to every local offset before translation to `origin`. Recurses
/// into `Block` apertures, stacking `effective_transform` further onto each inner object.
fn serialize_aperture(
    aperture: &Aperture,
    serializer: &mut dyn Serializer,
    origin: RealPoint,
    format: &crate::geometry::CoordinateFormat,
    effective_transform: &Transform,
) -> Result<(), GerberError> {
    let target = serializer.get_target(effective_transform.polarity);
    let place = |offset: RealPoint| origin + effective_transform.apply(offset);

    match aperture {
        Aperture::Circle { diameter, .. } => {
            serializer.add_circle(target, diameter / 2.0 * effective_transform.scaling, origin);
        }
        Aperture::Rectangle { x_size, y_size, .. }
        | Aperture::Obround { x_size, y_size, .. } => {
            let half_x = x_size / 2.0;
            let half_y = y_size / 2.0;
            let points = vec![
                place(RealPoint::new(-half_x, -half_y)),
                place(RealPoint::new(half_x, -half_y)),
                place(RealPoint::new(half_x, half_y)),
                place(RealPoint::new(-half_x, half_y)),
            ];
            serializer.add_polygon(target, &points);
        }
        Aperture::Polygon {
            outer_diameter,
            num_vertices,
            rotation,
            ..
        } => {
            let radius = outer_diameter / 2.0;
            let points: Vec<RealPoint> = (0..*num_vertices)
                .map(|i| {
                    let angle =
                        rotation.to_radians() + (i as f64) * std::f64::consts::TAU / (*num_vertices as f64);
                    place(RealPoint::new(radius * angle.cos(), radius * angle.sin()))
                })
                .collect();
            serializer.add_polygon(target, &points);
        }
        Aperture::Macro { primitives, .. } => {
            for primitive in primitives {
                serialize_macro_primitive(primitive, serializer, origin, effective_transform);
            }
        }
        Aperture::Block { objects, .. } => {
            for object in objects {
                object.serialize(serializer, origin, format, effective_transform)?;
            }
        }
    }
    Ok(())
}

fn serialize_macro_primitive(
    primitive: &crate::macros::MacroPrimitive,
    serializer: &mut dyn Serializer,
    origin: RealPoint,
    effective_transform: &Transform,
) {
    use crate::macros::MacroPrimitive;

    // A macro primitive's own exposure flag picks Dark/Clear *within* the macro; the flash's
    // effective transform still XORs in on top of it, the same composition `Transform::stack`
    // defines for a block's inner objects.
    let exposed_target = |serializer: &mut dyn Serializer, exposure: Polarity| {
        let combined = if exposure == Polarity::Clear {
            effective_transform.polarity.inverse()
        } else {
            effective_transform.polarity
        };
        serializer.get_target(combined)
    };
    let place = |offset: RealPoint| origin + effective_transform.apply(offset);

    match primitive {
        MacroPrimitive::Comment => {}
        MacroPrimitive::Circle {
            exposure,
            diameter,
            center,
            ..
        } => {
            let target = exposed_target(serializer, *exposure);
            serializer.add_circle(
                target,
                diameter / 2.0 * effective_transform.scaling,
                place(RealPoint::new(center.0, center.1)),
            );
        }
        MacroPrimitive::VectorLine {
            exposure,
            width,
            start,
            end,
            ..
        } => {
            let target = exposed_target(serializer, *exposure);
            let dx = end.0 - start.0;
            let dy = end.1 - start.1;
            let len = (dx * dx + dy * dy).sqrt();
            let half = width / 2.0;
            let (perp_x, perp_y) = if len > 0.0 {
                (-dy / len * half, dx / len * half)
            } else {
                (0.0, half)
            };
            let points = vec![
                place(RealPoint::new(start.0 + perp_x, start.1 + perp_y)),
                place(RealPoint::new(end.0 + perp_x, end.1 + perp_y)),
                place(RealPoint::new(end.0 - perp_x, end.1 - perp_y)),
                place(RealPoint::new(start.0 - perp_x, start.1 - perp_y)),
            ];
            serializer.add_polygon(target, &points);
        }
        MacroPrimitive::CenterLine {
            exposure,
            size,
            center,
            ..
        } => {
            let target = exposed_target(serializer, *exposure);
            let half = (size.0 / 2.0, size.1 / 2.0);
            let c = (center.0, center.1);
            let points = vec![
                place(RealPoint::new(c.0 - half.0, c.1 - half.1)),
                place(RealPoint::new(c.0 + half.0, c.1 - half.1)),
                place(RealPoint::new(c.0 + half.0, c.1 + half.1)),
                place(RealPoint::new(c.0 - half.0, c.1 + half.1)),
            ];
            serializer.add_polygon(target, &points);
        }
        MacroPrimitive::Outline {
            exposure, points, ..
        } => {
            let target = exposed_target(serializer, *exposure);
            let points: Vec<RealPoint> = points
                .iter()
                .map(|p| place(RealPoint::new(p.0, p.1)))
                .collect();
            serializer.add_polygon(target, &points);
        }
        MacroPrimitive::Polygon {
            exposure,
            num_vertices,
            center,
            diameter,
            rotation,
        } => {
            let target = exposed_target(serializer, *exposure);
            let radius = diameter / 2.0;
            let points: Vec<RealPoint> = (0..*num_vertices)
                .map(|i| {
                    let angle = rotation.to_radians()
                        + (i as f64) * std::f64::consts::TAU / (*num_vertices as f64);
                    place(RealPoint::new(
                        center.0 + radius * angle.cos(),
                        center.1 + radius * angle.sin(),
                    ))
                })
                .collect();
            serializer.add_polygon(target, &points);
        }
        MacroPrimitive::Thermal {
            center,
            outer_diameter,
            inner_diameter,
            gap_thickness,
            ..
        } => {
            let dark = exposed_target(serializer, Polarity::Dark);
            let clear = exposed_target(serializer, Polarity::Clear);
            let c = (center.0, center.1);
            serializer.add_circle(
                dark,
                outer_diameter / 2.0 * effective_transform.scaling,
                place(RealPoint::new(c.0, c.1)),
            );
            serializer.add_circle(
                clear,
                inner_diameter / 2.0 * effective_transform.scaling,
                place(RealPoint::new(c.0, c.1)),
            );
            let half_gap = gap_thickness / 2.0;
            let reach = outer_diameter / 2.0;
            // Cut the four gaps as thin Clear rectangles along each axis.
            for points in [
                vec![
                    place(RealPoint::new(c.0 - half_gap, c.1 - reach)),
                    place(RealPoint::new(c.0 + half_gap, c.1 - reach)),
                    place(RealPoint::new(c.0 + half_gap, c.1 + reach)),
                    place(RealPoint::new(c.0 - half_gap, c.1 + reach)),
                ],
                vec![
                    place(RealPoint::new(c.0 - reach, c.1 - half_gap)),
                    place(RealPoint::new(c.0 + reach, c.1 - half_gap)),
                    place(RealPoint::new(c.0 + reach, c.1 + half_gap)),
                    place(RealPoint::new(c.0 - reach, c.1 + half_gap)),
                ],
            ] {
                serializer.add_polygon(clear, &points);
            }
        }
    }
}
