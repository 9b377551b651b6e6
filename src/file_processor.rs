//! Drives the stream parser → command-code lookup → handler dispatch loop, converting per-command
//! failures into warn-and-continue versus log-and-abort per the recoverable/fatal split in
//! `error.rs`. Grounded on `processing/FileProcessor.{h,cpp}`: the same `Process(stream)` loop and
//! `catch(invalid_argument&)` / `catch(logic_error&)` split, reimplemented as a `Result`-returning
//! Rust loop instead of C++ exception handling.

use crate::error::GerberError;
use crate::geometry::CoordinateFormat;
use crate::graphics_state::Unit;
use crate::handlers;
use crate::object::GraphicalObject;
use crate::processor::Processor;
use crate::stream::StreamParser;

/// The resolved product of a whole file sweep: the flat top-level object list plus the
/// coordinate format and unit the file itself declared, both of which a downstream serializer
/// needs in order to convert `FixedPoint` geometry back into real-world measurements.
#[derive(Debug)]
pub struct ProcessedFile {
    pub objects: Vec<GraphicalObject>,
    pub format: CoordinateFormat,
    pub unit: Option<Unit>,
}

/// Runs every command in `source` against a fresh `Processor`, returning the resolved top-level
/// object list together with the file's declared coordinate format and unit. Recoverable
/// (`ParseError`-class) failures are logged as warnings with the offending line and the loop
/// continues; anything else is logged as an error and aborts the sweep.
pub fn process(source: &str) -> Result<ProcessedFile, GerberError> {
    process_with_options(source, false)
}

/// As `process`, but with the ambient `Config`'s `warnings_as_errors` toggle (or its CLI
/// override) applied: when set, a command that would normally only warn aborts the sweep
/// instead.
pub fn process_with_options(
    source: &str,
    warnings_as_errors: bool,
) -> Result<ProcessedFile, GerberError> {
    let mut parser = StreamParser::new(source);
    let mut processor = Processor::new();

    loop {
        let line = parser.current_line();
        let words = parser.next_command().map_err(GerberError::Io)?;
        if words.is_empty() {
            break;
        }

        match handlers::dispatch(&words, &mut processor) {
            Ok(()) => {}
            Err(err) if err.is_recoverable() && !warnings_as_errors => {
                log::warn!("line {line}: {err}");
            }
            Err(err) => {
                log::error!("line {line}: {err}");
                return Err(err);
            }
        }
    }

    let unit = processor.graphics_state().unit;
    // `FS` is mandatory in a well-formed file; a file that never declares one still resolves to
    // Gerber's most common convention (2 integer, 6 decimal digits) rather than failing the
    // whole sweep over a cosmetic defect in an otherwise-parsed file.
    let format = processor
        .graphics_state()
        .format
        .unwrap_or_else(|| CoordinateFormat::new(2, 6).expect("2, 6 is a valid format"));
    let objects = processor.objects()?.to_vec();

    Ok(ProcessedFile {
        objects,
        format,
        unit,
    })
}
