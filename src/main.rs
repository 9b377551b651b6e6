use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::LevelFilter;

mod arguments;

use gerber_core::config::Config;
use gerber_core::geometry::Transform;
use gerber_core::serialize::{Serializer, SvgSerializer};
use gerber_core::{file_processor, geometry};

fn main() -> ExitCode {
    let arguments: arguments::Arguments = argh::from_env();

    let config = Config::load().unwrap_or_else(|error| {
        eprintln!("Failed to read config file, using defaults: {error:?}");
        Config::default()
    });

    let level = if arguments.verbose {
        LevelFilter::Debug
    } else {
        config.log_level.parse().unwrap_or(LevelFilter::Info)
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("Failed to initialize logger.");

    match run(arguments, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(arguments: arguments::Arguments, config: &Config) -> Result<()> {
    let source = std::fs::read_to_string(&arguments.input)
        .with_context(|| format!("Failed to read {}", arguments.input.display()))?;

    let warnings_as_errors = arguments.warnings_as_errors || config.warnings_as_errors;
    let processed = file_processor::process_with_options(&source, warnings_as_errors)
        .context("Failed to process Gerber file")?;
    log::info!("Resolved {} top-level object(s)", processed.objects.len());

    let mut serializer = SvgSerializer::new();
    for object in &processed.objects {
        object
            .serialize(
                &mut serializer,
                geometry::RealPoint::zero(),
                &processed.format,
                &Transform::default(),
            )
            .context("Failed to serialize a graphical object")?;
    }

    let output_path = output_path(&arguments.input, arguments.output);
    serializer
        .save(&output_path)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;
    log::info!("Wrote {}", output_path.display());

    Ok(())
}

fn output_path(input: &PathBuf, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| input.with_extension("svg"))
}
