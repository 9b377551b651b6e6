//! One function per command code: word-level syntax parsing plus the typed call into
//! `Processor`. Grounded on `CommandHandler.{h,cpp}` — same function-per-code split, same
//! `AssertWordCommand`-style up-front shape checks, reimplemented as free functions over
//! `lexing.rs`'s primitives instead of `std::regex`.

use crate::error::{GerberError, LogicError, ParseError};
use crate::geometry::{ArcDirection, CoordinateFormat, FixedPoint, Mirroring, Polarity};
use crate::graphics_state::{ArcMode, CoordinateData, PlotState, Unit};
use crate::lexing;
use crate::processor::Processor;

fn malformed(word: &str, reason: &str) -> ParseError {
    ParseError::MalformedToken {
        word: word.to_string(),
        reason: reason.to_string(),
    }
}

/// Dispatches one command group (the tokens returned by `StreamParser::next_command`) against
/// `processor`. The first token's prefix/suffix selects the handler; `AM` is the only code that
/// consumes more than the first token.
pub fn dispatch(words: &[String], processor: &mut Processor) -> Result<(), GerberError> {
    let first = words
        .first()
        .ok_or_else(|| GerberError::Parse(malformed("", "empty command group")))?;
    let code = lexing::command_code(first)?;

    match code.as_str() {
        "G04" => Ok(()),
        "MO" => handle_unit(first, processor),
        "FS" => handle_format(first, processor),
        "AD" => handle_aperture_define(first, processor),
        "AM" => handle_aperture_macro(words, processor),
        "Dnn" => handle_select_aperture(first, processor),
        "G01" | "G02" | "G03" => handle_plot_state(first, processor),
        "G74" | "G75" => handle_arc_mode(first, processor),
        "D01" | "D02" | "D03" => handle_operation(&code, first, processor),
        "LP" | "LM" | "LR" | "LS" => handle_transform(&code, first, processor),
        "G36" | "G37" => handle_region(&code, processor),
        "AB" => handle_aperture_block(first, processor),
        "SR" => handle_step_and_repeat(first, processor),
        "M02" => {
            processor.set_end_of_file();
            Ok(())
        }
        "TF" | "TA" | "TO" | "TD" => handle_attribute(&code, first, processor),
        other => Err(GerberError::Parse(ParseError::UnsupportedCommand(
            other.to_string(),
        ))),
    }
}

fn handle_unit(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let unit = Unit::from_command(word).ok_or_else(|| malformed(word, "expected MOMM or MOIN"))?;
    processor.set_unit(unit);
    Ok(())
}

fn handle_format(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let rest = word.strip_prefix("FS").ok_or_else(|| malformed(word, "expected FS prefix"))?;
    let rest = rest
        .strip_prefix("LA")
        .ok_or(ParseError::UnsupportedFeature(
            "only leading-zero-omission, absolute coordinates (FSLA...) are supported",
        ))?;
    let rest = rest.strip_prefix('X').ok_or_else(|| malformed(word, "expected X digit spec"))?;
    let (x_int, x_dec, rest) = take_digit_spec(rest, word)?;
    let rest = rest.strip_prefix('Y').ok_or_else(|| malformed(word, "expected Y digit spec"))?;
    let (y_int, y_dec, _rest) = take_digit_spec(rest, word)?;

    if x_int != y_int || x_dec != y_dec {
        return Err(GerberError::Parse(malformed(
            word,
            "X and Y coordinate formats must match",
        )));
    }

    let format = CoordinateFormat::new(x_int, x_dec)?;
    processor.set_format(format).map_err(GerberError::Logic)
}

fn take_digit_spec<'a>(input: &'a str, word: &str) -> Result<(u32, u32, &'a str), GerberError> {
    let mut chars = input.chars();
    let integer_digit = chars
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| malformed(word, "expected an integer digit count"))?;
    let decimal_digit = chars
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| malformed(word, "expected a decimal digit count"))?;
    Ok((integer_digit, decimal_digit, &input[2..]))
}

fn handle_aperture_define(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let rest = word.strip_prefix("AD").ok_or_else(|| malformed(word, "expected AD prefix"))?;
    let (rest, (ident, template_name)) = lexing::aperture_define_prefix(rest)
        .map_err(|_| malformed(word, "expected D<ident><template name>"))?;

    let params = match rest.strip_prefix(',') {
        Some(fields) => lexing::split_params(fields, 'X')?,
        None => Vec::new(),
    };

    let template = processor.get_template(template_name)?;
    let aperture = template.instantiate(&params)?;
    processor.aperture_define(ident, aperture).map_err(GerberError::Logic)
}

fn handle_aperture_macro(words: &[String], processor: &mut Processor) -> Result<(), GerberError> {
    let first = words
        .first()
        .ok_or_else(|| GerberError::Parse(malformed("", "empty AM command")))?;
    let rest = first.strip_prefix("AM").ok_or_else(|| malformed(first, "expected AM prefix"))?;
    let (_, name) =
        lexing::name(rest).map_err(|_| malformed(first, "expected a macro name"))?;

    let body_words = words[1..].to_vec();
    processor.register_macro(name.to_string(), body_words);
    Ok(())
}

fn handle_select_aperture(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let digits = word.strip_prefix('D').ok_or_else(|| malformed(word, "expected D prefix"))?;
    let ident: u32 = digits
        .parse()
        .map_err(|_| malformed(word, "expected digits after D"))?;
    processor.set_current_aperture(ident).map_err(GerberError::Logic)
}

fn handle_plot_state(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let plot_state = PlotState::from_command(word)
        .ok_or_else(|| malformed(word, "expected G01, G02, or G03"))?;
    processor.set_plot_state(plot_state);
    Ok(())
}

fn handle_arc_mode(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let arc_mode =
        ArcMode::from_command(word).ok_or_else(|| malformed(word, "expected G74 or G75"))?;
    processor.set_arc_mode(arc_mode)?;
    Ok(())
}

fn take_marked_number(input: &mut &str, marker: char) -> Result<Option<f64>, ParseError> {
    if let Some(rest) = input.strip_prefix(marker) {
        let (rest, digits) = lexing::number(rest).map_err(|_| ParseError::MalformedToken {
            word: rest.to_string(),
            reason: format!("expected a number after '{marker}'"),
        })?;
        let value: f64 = digits.parse().map_err(|_| ParseError::MalformedToken {
            word: digits.to_string(),
            reason: "not a valid number".to_string(),
        })?;
        *input = rest;
        Ok(Some(value))
    } else {
        Ok(None)
    }
}

fn parse_coordinate_data(word: &str) -> Result<CoordinateData, ParseError> {
    let mut input = word;
    let x = take_marked_number(&mut input, 'X')?;
    let y = take_marked_number(&mut input, 'Y')?;
    let i = take_marked_number(&mut input, 'I')?;
    let j = take_marked_number(&mut input, 'J')?;
    Ok(CoordinateData {
        x: x.map(|v| v as i32),
        y: y.map(|v| v as i32),
        i: i.map(|v| v as i32),
        j: j.map(|v| v as i32),
    })
}

fn reject_ij(word: &str, data: &CoordinateData) -> Result<(), GerberError> {
    if data.i.is_some() || data.j.is_some() {
        return Err(GerberError::Parse(malformed(
            word,
            "I/J offsets are forbidden outside of arc interpolation",
        )));
    }
    Ok(())
}

fn handle_operation(code: &str, word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let data = parse_coordinate_data(word)?;

    match code {
        "D02" => {
            reject_ij(word, &data)?;
            processor.mov(data).map_err(GerberError::Logic)
        }
        "D03" => {
            reject_ij(word, &data)?;
            processor.flash(data)
        }
        "D01" => {
            let plot_state = processor
                .graphics_state()
                .plot_state
                .ok_or(LogicError::NoPlotState)?;
            match plot_state {
                PlotState::Linear => {
                    reject_ij(word, &data)?;
                    processor.plot_draw(data)
                }
                PlotState::Clockwise | PlotState::CounterClockwise => {
                    let i = data
                        .i
                        .ok_or_else(|| malformed(word, "arc interpolation requires an I offset"))?;
                    let j = data
                        .j
                        .ok_or_else(|| malformed(word, "arc interpolation requires a J offset"))?;
                    let direction = if plot_state == PlotState::Clockwise {
                        ArcDirection::Clockwise
                    } else {
                        ArcDirection::CounterClockwise
                    };
                    processor.plot_arc(data, FixedPoint::new(i, j), direction)
                }
            }
        }
        _ => unreachable!("handle_operation only called for D01/D02/D03"),
    }
}

fn handle_transform(code: &str, word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let value = word.strip_prefix(code).ok_or_else(|| malformed(word, "expected LP/LM/LR/LS prefix"))?;

    match code {
        "LP" => {
            let polarity =
                Polarity::from_command(value).ok_or_else(|| malformed(word, "expected D or C"))?;
            processor.set_polarity(polarity);
            Ok(())
        }
        "LM" => {
            let mirroring = Mirroring::from_command(value)
                .ok_or_else(|| malformed(word, "expected N, X, Y, or XY"))?;
            processor.set_mirroring(mirroring);
            Ok(())
        }
        "LR" => {
            let degrees: f64 = value.parse().map_err(|_| malformed(word, "expected a rotation angle"))?;
            processor.set_rotation(degrees);
            Ok(())
        }
        "LS" => {
            let scaling: f64 = value.parse().map_err(|_| malformed(word, "expected a scaling factor"))?;
            processor.set_scaling(scaling).map_err(GerberError::Logic)
        }
        _ => unreachable!("handle_transform only called for LP/LM/LR/LS"),
    }
}

fn handle_region(code: &str, processor: &mut Processor) -> Result<(), GerberError> {
    match code {
        "G36" => processor.start_region().map_err(GerberError::Logic),
        "G37" => processor.end_region().map_err(GerberError::Logic),
        _ => unreachable!("handle_region only called for G36/G37"),
    }
}

fn handle_aperture_block(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let rest = word.strip_prefix("AB").unwrap_or(word);
    if rest.is_empty() {
        return processor.close_aperture_block().map_err(GerberError::Logic);
    }

    let digits = rest.strip_prefix('D').ok_or_else(|| malformed(word, "expected D<ident>"))?;
    let ident: u32 = digits.parse().map_err(|_| malformed(word, "expected digits after D"))?;
    processor.open_aperture_block(ident).map_err(GerberError::Logic)
}

fn handle_step_and_repeat(word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let rest = word.strip_prefix("SR").unwrap_or(word);
    if rest.is_empty() {
        return processor.close_step_and_repeat().map_err(GerberError::Logic);
    }

    let mut input = rest;
    let nx = take_marked_number(&mut input, 'X')?.unwrap_or(1.0) as u32;
    let ny = take_marked_number(&mut input, 'Y')?.unwrap_or(1.0) as u32;
    let dx = take_marked_number(&mut input, 'I')?.unwrap_or(0.0);
    let dy = take_marked_number(&mut input, 'J')?.unwrap_or(0.0);

    processor
        .open_step_and_repeat(nx, ny, dx, dy)
        .map_err(GerberError::Logic)
}

fn handle_attribute(code: &str, word: &str, processor: &mut Processor) -> Result<(), GerberError> {
    let rest = word.strip_prefix(code).unwrap_or(word);
    let rest = rest.strip_prefix('.').unwrap_or(rest);

    if code == "TD" {
        let name = if rest.is_empty() { None } else { Some(rest.to_string()) };
        processor.delete_attribute(name);
        return Ok(());
    }

    let mut parts = rest.split(',');
    let name = parts.next().unwrap_or_default().to_string();
    let fields: Vec<String> = parts.map(|s| s.to_string()).collect();

    match code {
        "TF" => processor.set_file_attribute(name, fields),
        "TA" => processor.set_aperture_attribute(name, fields),
        "TO" => processor.set_object_attribute(name, fields),
        _ => {}
    }
    Ok(())
}
