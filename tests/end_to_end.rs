//! Acceptance tests driving the crate's public API the way an external consumer would: feed a
//! Gerber command stream through the processor and inspect the resolved scene. Each test
//! mirrors one end-to-end scenario.

use gerber_core::aperture::Aperture;
use gerber_core::geometry::{FixedPoint, Polarity, Transform};
use gerber_core::graphics_state::Unit;
use gerber_core::handlers::dispatch;
use gerber_core::object::GraphicalObject;
use gerber_core::processor::{CommandState, Processor};
use gerber_core::serialize::{Serializer, SvgSerializer};

fn run(words: impl IntoIterator<Item = &'static str>, processor: &mut Processor) {
    for word in words {
        dispatch(&[word.to_string()], processor).expect("command should succeed");
    }
}

#[test]
fn two_squares_baseline_produces_eight_draws_and_leaves_expected_state() {
    let mut processor = Processor::new();
    run(
        [
            "FSLAX26Y26",
            "MOMM",
            "ADD10C,0.010",
            "D10",
            "X0Y0D02",
            "G01",
            "X5000000Y0D01",
            "Y5000000D01",
            "X0D01",
            "Y0D01",
            "X6000000D02",
            "X11000000D01",
            "Y5000000D01",
            "X6000000D01",
            "Y0D01",
            "M02",
        ],
        &mut processor,
    );

    let objects = processor.objects().unwrap();
    assert_eq!(objects.len(), 8);
    assert!(objects
        .iter()
        .all(|object| matches!(object, GraphicalObject::Draw { .. })));

    assert_eq!(processor.graphics_state().unit, Some(Unit::Millimeter));
    assert_eq!(processor.graphics_state().format.unwrap().integer_digits(), 2);
    assert_eq!(processor.graphics_state().format.unwrap().decimal_digits(), 6);
    assert_eq!(
        processor.graphics_state().current_point(),
        Some(FixedPoint::new(6_000_000, 0))
    );
    assert_eq!(processor.command_state(), CommandState::EndOfFile);
}

#[test]
fn aperture_macro_with_variables_resolves_two_circle_primitives() {
    let mut processor = Processor::new();
    run(
        ["FSLAX26Y26", "MOMM"],
        &mut processor,
    );
    dispatch(
        &[
            "AMDONUTVAR".to_string(),
            "1,1,$1,$2,$3".to_string(),
            "1,0,$4,$2,$3".to_string(),
        ],
        &mut processor,
    )
    .unwrap();
    run(["ADD11DONUTVAR,0.100X0X0X0.060"], &mut processor);

    let template = processor.get_template("DONUTVAR").unwrap();
    let aperture = template.instantiate(&[0.100, 0.0, 0.0, 0.060]).unwrap();
    match aperture {
        Aperture::Macro { primitives, .. } => {
            assert_eq!(primitives.len(), 2);
            use gerber_core::macros::MacroPrimitive;
            match (&primitives[0], &primitives[1]) {
                (
                    MacroPrimitive::Circle {
                        exposure: first_exposure,
                        diameter: first_diameter,
                        ..
                    },
                    MacroPrimitive::Circle {
                        exposure: second_exposure,
                        diameter: second_diameter,
                        ..
                    },
                ) => {
                    assert_eq!(*first_exposure, Polarity::Dark);
                    assert_eq!(*second_exposure, Polarity::Clear);
                    assert!((first_diameter - 0.100).abs() < 1e-9);
                    assert!((second_diameter - 0.060).abs() < 1e-9);
                }
                other => panic!("expected two Circle primitives, got {other:?}"),
            }
        }
        other => panic!("expected a Macro aperture, got {other:?}"),
    }
}

#[test]
fn nested_block_aperture_flashes_recurse_two_levels_deep() {
    let mut processor = Processor::new();
    run(["FSLAX26Y26", "MOMM", "ADD10C,0.010"], &mut processor);

    dispatch(&["ABD100".to_string()], &mut processor).unwrap();
    run(["D10", "X0Y0D02", "G01", "X1000000Y0D01"], &mut processor);
    dispatch(&["AB".to_string()], &mut processor).unwrap();

    dispatch(&["ABD101".to_string()], &mut processor).unwrap();
    run(["D100", "X0Y0D03"], &mut processor);
    dispatch(&["AB".to_string()], &mut processor).unwrap();

    run(["D101", "X0Y0D03", "M02"], &mut processor);

    let objects = processor.objects().unwrap();
    assert_eq!(objects.len(), 1);
    match &objects[0] {
        GraphicalObject::Flash { aperture, .. } => match aperture {
            Aperture::Block { objects, .. } => {
                assert_eq!(objects.len(), 1);
                match &objects[0] {
                    GraphicalObject::Flash { aperture, .. } => match aperture {
                        Aperture::Block { objects, .. } => {
                            assert_eq!(objects.len(), 1);
                            assert!(matches!(objects[0], GraphicalObject::Draw { .. }));
                        }
                        other => panic!("expected inner Block aperture, got {other:?}"),
                    },
                    other => panic!("expected inner Flash, got {other:?}"),
                }
            }
            other => panic!("expected outer Block aperture, got {other:?}"),
        },
        other => panic!("expected top-level Flash, got {other:?}"),
    }
}

#[test]
fn step_and_repeat_expands_to_six_flashes_on_a_grid() {
    let mut processor = Processor::new();
    run(["FSLAX26Y26", "MOMM", "ADD10C,1.0", "D10"], &mut processor);

    dispatch(&["SRX2Y3I5.0J4.0".to_string()], &mut processor).unwrap();
    run(["X3000000Y-2000000D03"], &mut processor);
    dispatch(&["SR".to_string()], &mut processor).unwrap();

    let objects = processor.objects().unwrap();
    assert_eq!(objects.len(), 1);
    match &objects[0] {
        GraphicalObject::StepAndRepeat {
            nx,
            ny,
            dx,
            dy,
            objects,
        } => {
            assert_eq!(*nx, 2);
            assert_eq!(*ny, 3);
            assert!((dx - 5.0).abs() < 1e-9);
            assert!((dy - 4.0).abs() < 1e-9);
            assert_eq!(objects.len(), 1);

            let mut positions = Vec::new();
            for ix in 0..*nx {
                for iy in 0..*ny {
                    positions.push((3.0 + ix as f64 * dx, -2.0 + iy as f64 * dy));
                }
            }
            assert_eq!(positions.len(), 6);
        }
        other => panic!("expected a StepAndRepeat, got {other:?}"),
    }
}

#[test]
fn single_square_draws_serialize_to_one_svg_path_per_draw() {
    let mut processor = Processor::new();
    run(
        [
            "FSLAX26Y26",
            "MOMM",
            "ADD10C,0.010",
            "D10",
            "X0Y0D02",
            "G01",
            "X5000000Y0D01",
            "Y5000000D01",
            "X0D01",
            "Y0D01",
            "M02",
        ],
        &mut processor,
    );

    let objects = processor.objects().unwrap();
    let format = processor.graphics_state().format.unwrap();
    let mut serializer = SvgSerializer::new();
    for object in &objects {
        object
            .serialize(
                &mut serializer,
                gerber_core::geometry::RealPoint::new(0.0, 0.0),
                &format,
                &Transform::default(),
            )
            .unwrap();
    }

    let path = std::env::temp_dir().join("gerber_core_end_to_end_two_squares.svg");
    serializer.save(&path).unwrap();
    let rendered = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(!rendered.is_empty());
    assert_eq!(rendered.matches("<path").count(), 4);
}

#[test]
fn circle_flash_serializes_to_a_path_that_reaches_both_sides_of_its_diameter() {
    let mut processor = Processor::new();
    run(
        ["FSLAX26Y26", "MOMM", "ADD10C,2.0", "D10", "X0Y0D03", "M02"],
        &mut processor,
    );

    let objects = processor.objects().unwrap();
    assert_eq!(objects.len(), 1);
    let format = processor.graphics_state().format.unwrap();
    let mut serializer = SvgSerializer::new();
    objects[0]
        .serialize(
            &mut serializer,
            gerber_core::geometry::RealPoint::new(0.0, 0.0),
            &format,
            &Transform::default(),
        )
        .unwrap();

    let path = std::env::temp_dir().join("gerber_core_end_to_end_circle_flash.svg");
    serializer.save(&path).unwrap();
    let rendered = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    // A 2.0mm diameter circle centered on the origin reaches x = -1.0 and x = 1.0; a
    // single-MoveTo path with no arc/line data would never mention either coordinate.
    assert!(rendered.contains("-1"), "expected the leftmost extent: {rendered}");
    assert!(rendered.contains('A'), "expected an SVG arc command: {rendered}");
}

#[test]
fn region_with_an_open_trailing_contour_still_parses() {
    let mut processor = Processor::new();
    run(
        [
            "FSLAX26Y26",
            "MOMM",
            "G36",
            "X0Y0D02",
            "G01",
            "X1000000Y0D01",
            "X1000000Y1000000D01",
            "G37",
            "M02",
        ],
        &mut processor,
    );

    let objects = processor.objects().unwrap();
    assert_eq!(objects.len(), 1);
    match &objects[0] {
        GraphicalObject::Region { .. } => {
            assert!(!objects[0].contours_closed());
        }
        other => panic!("expected a Region, got {other:?}"),
    }
}

#[test]
fn polarity_stacks_through_a_flashed_clear_block() {
    let mut processor = Processor::new();
    run(["FSLAX26Y26", "MOMM", "ADD10C,1.0"], &mut processor);

    dispatch(&["ABD100".to_string()], &mut processor).unwrap();
    run(["D10", "X0Y0D03"], &mut processor); // Dark flash (default polarity)
    dispatch(&["LPC".to_string()], &mut processor).unwrap();
    run(["X1000000Y0D03"], &mut processor); // Clear flash
    dispatch(&["LPD".to_string()], &mut processor).unwrap(); // restore for outer scope
    dispatch(&["AB".to_string()], &mut processor).unwrap();

    dispatch(&["LPC".to_string()], &mut processor).unwrap();
    run(["D100", "X0Y0D03", "M02"], &mut processor);

    let objects = processor.objects().unwrap();
    assert_eq!(objects.len(), 1);
    match &objects[0] {
        GraphicalObject::Flash { aperture, .. } => match aperture {
            Aperture::Block { objects, .. } => {
                assert_eq!(objects.len(), 2);

                // The block itself was flashed under LPC, so its own baked transform carries
                // Clear; each leaf flash inside it was captured with its own polarity (Dark,
                // then Clear) at definition time. The *effective* polarity a serializer would
                // see is the stack of both, not either one alone.
                let outer_transform = *aperture.transform();
                let leaf_polarity = |object: &GraphicalObject| match object {
                    GraphicalObject::Flash { aperture, .. } => {
                        Transform::default()
                            .stack(&outer_transform)
                            .stack(aperture.transform())
                            .polarity
                    }
                    other => panic!("expected a Flash, got {other:?}"),
                };

                // Captured polarities are [Dark, Clear]; stacked under an outer Clear they XOR
                // to [Clear, Dark].
                assert_eq!(leaf_polarity(&objects[0]), Polarity::Clear);
                assert_eq!(leaf_polarity(&objects[1]), Polarity::Dark);
            }
            other => panic!("expected a Block aperture, got {other:?}"),
        },
        other => panic!("expected a top-level Flash, got {other:?}"),
    }
}
