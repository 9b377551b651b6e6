use thiserror::Error;

/// Recoverable, per-command failures. The file processor logs these and moves on to the next
/// command; graphics state is left exactly as it was before the offending command ran.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed token '{word}': {reason}")]
    MalformedToken { word: String, reason: String },

    #[error("unknown aperture template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{name}' expects {expected}, got {actual} parameter(s)")]
    WrongParameterCount {
        name: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("numeric value out of range: {0}")]
    OutOfRange(String),

    #[error("unsupported command code '{0}'")]
    UnsupportedCommand(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    #[error("aperture or template '{kind}' {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid aperture parameters: {0}")]
    InvalidAperture(String),

    #[error("macro expression error: {0}")]
    Expression(String),
}

/// Fatal violations of a processor precondition: parsing already succeeded, but the
/// semantic state the command depends on is wrong. The file processor aborts on these.
#[derive(Debug, Error)]
pub enum LogicError {
    #[error("no current point; a move or prior plot is required first")]
    NoCurrentPoint,

    #[error("no current aperture selected")]
    NoCurrentAperture,

    #[error("format already set")]
    FormatAlreadySet,

    #[error("aperture ident {0} is already defined")]
    ApertureRedefined(u32),

    #[error("aperture ident {0} is invalid; idents must be >= 10")]
    InvalidApertureIdent(u32),

    #[error("not currently inside a region")]
    NotInsideRegion,

    #[error("no plot state set; G01/G02/G03 must precede a D01 operation")]
    NoPlotState,

    #[error("cannot start a region while not in the Normal state")]
    CannotStartRegion,

    #[error("no aperture block is currently open")]
    NoApertureBlockOpen,

    #[error("a step-and-repeat block is already open")]
    StepAndRepeatAlreadyOpen,

    #[error("no step-and-repeat block is currently open")]
    NoStepAndRepeatOpen,

    #[error("invalid step-and-repeat parameters: nx={nx}, ny={ny}, dx={dx}, dy={dy}")]
    InvalidStepAndRepeat { nx: i64, ny: i64, dx: f64, dy: f64 },

    #[error("a Circle-only aperture is required for draws and arcs")]
    ApertureNotCircle,

    #[error("destination stack is unexpectedly empty")]
    EmptyDestinationStack,
}

/// Fatal I/O-class failures.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("unterminated command group starting at line {line}")]
    UnterminatedCommand { line: u32 },

    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),
}

/// The aggregate error type threaded through the core. Handlers and processor operations
/// return this; the file processor matches on the variant to decide whether to warn-and-continue
/// or log-and-abort.
#[derive(Debug, Error)]
pub enum GerberError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Logic(#[from] LogicError),

    #[error(transparent)]
    Io(#[from] IoError),
}

impl GerberError {
    /// Whether the file processor should warn and continue (`true`) or abort (`false`).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GerberError::Parse(_))
    }
}
