use std::path::PathBuf;

use argh::FromArgs;

#[derive(FromArgs, PartialEq, Debug)]
/// Reads a Gerber X2/X3 file and renders it to SVG.
pub struct Arguments {
    #[argh(positional)]
    /// path to the Gerber file to read.
    pub input: PathBuf,

    #[argh(positional)]
    /// path to write the rendered SVG to. Defaults to the input path with its extension
    /// replaced by `.svg`.
    pub output: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// increase log verbosity; overrides the configured default.
    pub verbose: bool,

    #[argh(switch)]
    /// treat recoverable warnings as fatal; overrides the configured default.
    pub warnings_as_errors: bool,
}
