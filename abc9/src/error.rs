use std::fmt::Display;

use boxsplice_netlist::{NameConflict, Timing, TimingError};

fn short(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

/// A structural problem with a box or timing annotation, found by the validator or while
/// cataloging a box type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    DuplicateBoxId { module: String, id: i64, other: String },
    MultipleCarry { module: String, output: bool },
    UnpairedCarry { module: String, output: bool },
    InoutCarry { module: String, port: String },
    Timing { module: String, port: String, attr: &'static str, error: TimingError },
    TimingWidth { module: String, port: String, attr: &'static str, width: usize, value: Timing, count: usize },
    FlopOutputs { module: String, count: usize },
}

impl Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckError::DuplicateBoxId { module, id, other } => {
                write!(f, "Module '{}' has the same abc9_box_id = {id} value as '{}'.", short(module), short(other))
            }
            CheckError::MultipleCarry { module, output } => {
                let direction = if *output { "output" } else { "input" };
                write!(f, "Module '{}' contains more than one (* abc9_carry *) {direction} port.", short(module))
            }
            CheckError::UnpairedCarry { module, output } => {
                let (present, absent) = if *output { ("output", "input") } else { ("input", "output") };
                write!(f, "Module '{}' contains an (* abc9_carry *) {present} port but no {absent} port.", short(module))
            }
            CheckError::InoutCarry { module, port } => {
                write!(f, "{}.{} is an inout port and cannot carry (* abc9_carry *).", short(module), short(port))
            }
            CheckError::Timing { module, port, attr, error } => match error {
                TimingError::NonInteger(token) => {
                    write!(f, "{}.{} has non-integer {attr} value '{token}'!", short(module), short(port))
                }
                TimingError::Negative(token) => {
                    write!(f, "{}.{} has negative {attr} value {token}!", short(module), short(port))
                }
            },
            CheckError::TimingWidth { module, port, attr, width, value, count } => write!(
                f,
                "{}.{} is {width} bits wide but abc9_{attr} = {value} has {count} value(s)!",
                short(module),
                short(port)
            ),
            CheckError::FlopOutputs { module, count } => {
                write!(f, "Module '{}' with (* abc9_flop *) has {count} outputs (expect 1).", short(module))
            }
        }
    }
}

impl std::error::Error for CheckError {}

#[derive(Debug)]
pub enum Error {
    /// No operation was requested.
    NoOperation,
    /// `dff` was requested without `prep_xaiger`.
    DffWithoutXaiger,
    /// Every violation found by the validator.
    Check(Vec<CheckError>),
    /// A single design error found outside of the validator.
    Design(CheckError),
    MissingFlopWire { module: String, cell: String, suffix: &'static str },
    NonConstantInit { module: String, cell: String },
    UnsupportedInit { module: String, cell: String },
    Io(std::io::Error),

    MissingMappedModule { module: String },
    UnknownBox { module: String, cell: String },
    BoxIdMismatch { cell: String, expected: String, found: String },
    MissingBoxPorts { box_type: String },
    MalformedCell { module: String, cell: String, port: String },
    MissingFeedback { module: String, cell: String },
    UnknownWire { module: String, wire: String },
    WidthMismatch { module: String, wire: String, width: usize, mapped: usize },
    BoxWidthMismatch { module: String, cell: String, port: String, width: usize, mapped: usize },
    NameConflict(NameConflict),
    Loop { module: String, cells: Vec<Vec<String>> },
}

impl Error {
    /// Whether the error is a broken contract between extraction and reintegration (rather than
    /// a problem with the input design or the request).
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::MissingMappedModule { .. }
                | Error::UnknownBox { .. }
                | Error::BoxIdMismatch { .. }
                | Error::MissingBoxPorts { .. }
                | Error::MalformedCell { .. }
                | Error::MissingFeedback { .. }
                | Error::UnknownWire { .. }
                | Error::WidthMismatch { .. }
                | Error::BoxWidthMismatch { .. }
                | Error::NameConflict(_)
                | Error::Loop { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<NameConflict> for Error {
    fn from(error: NameConflict) -> Self {
        Error::NameConflict(error)
    }
}

impl From<CheckError> for Error {
    fn from(error: CheckError) -> Self {
        Error::Design(error)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NoOperation => write!(
                f,
                "At least one of -check, -mark_scc, -prep_{{delays,xaiger,dff}}, -write_box, -reintegrate must be specified."
            ),
            Error::DffWithoutXaiger => write!(f, "'-dff' option is only relevant for -prep_xaiger."),
            Error::Check(errors) => {
                for (index, error) in errors.iter().enumerate() {
                    if index > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
            Error::Design(error) => write!(f, "{error}"),
            Error::MissingFlopWire { module, cell, suffix } => {
                write!(f, "'{cell}.{suffix}' is not a wire present in module '{}'.", short(module))
            }
            Error::NonConstantInit { module, cell } => {
                write!(f, "'{cell}.init' is not a constant wire present in module '{}'.", short(module))
            }
            Error::UnsupportedInit { module, cell } => write!(
                f,
                "'{cell}.init' in module '{}' has value 1'b1 which is not supported by 'abc9 -dff'.",
                short(module)
            ),
            Error::Io(error) => write!(f, "I/O error: {error}"),
            Error::MissingMappedModule { module } => {
                write!(f, "ABC output file does not contain a module `{}$abc9'.", short(module))
            }
            Error::UnknownBox { module, cell } => write!(
                f,
                "Cannot find existing box cell with name '{}' in original design '{}'.",
                short(cell),
                short(module)
            ),
            Error::BoxIdMismatch { cell, expected, found } => {
                write!(f, "box cell '{}' is mapped as '{found}' instead of '{expected}'", short(cell))
            }
            Error::MissingBoxPorts { box_type } => write!(f, "no port ordering known for box type '{}'", short(box_type)),
            Error::MalformedCell { module, cell, port } => {
                write!(f, "cell '{}' in module '{}' has no usable port '{}'", short(cell), short(module), short(port))
            }
            Error::MissingFeedback { module, cell } => write!(
                f,
                "flip-flop '{}' in holes module '{}' has no register feedback input",
                short(cell),
                short(module)
            ),
            Error::UnknownWire { module, wire } => {
                write!(f, "wire '{}' does not exist in module '{}'", short(wire), short(module))
            }
            Error::WidthMismatch { module, wire, width, mapped } => write!(
                f,
                "wire '{}' in module '{}' is {width} bits wide but the mapped module has {mapped}",
                short(wire),
                short(module)
            ),
            Error::BoxWidthMismatch { module, cell, port, width, mapped } => write!(
                f,
                "box '{}' in module '{}' takes {width} bits on '{}' but the mapper connected {mapped}",
                short(cell),
                short(module),
                short(port)
            ),
            Error::NameConflict(error) => write!(f, "{error}"),
            Error::Loop { module, cells } => {
                write!(f, "module '{}' contains {} combinational loop(s)", short(module), cells.len())?;
                for (index, cells) in cells.iter().enumerate() {
                    write!(f, "\n  loop {index}: {}", cells.join(" "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}
