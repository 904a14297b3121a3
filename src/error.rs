use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What went wrong.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// Directive name is empty or not in the directive table.
    UnknownDirective,
    /// A directive appeared twice.
    DuplicateDirective,
    /// Wrong number of arguments for a directive.
    InvalidArgumentCount,
    /// An argument has the wrong shape or value.
    InvalidArgument,
    InvalidUriSyntax,
    InvalidHostSyntax,
    InvalidPortSyntax,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match *self {
            ErrorKind::UnknownDirective => "unknown directive",
            ErrorKind::DuplicateDirective => "duplicate directive",
            ErrorKind::InvalidArgumentCount => "invalid argument count",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidUriSyntax => "invalid uri syntax",
            ErrorKind::InvalidHostSyntax => "invalid host syntax",
            ErrorKind::InvalidPortSyntax => "invalid port syntax",
        }
    }
}

/// A parse error.
///
/// `pos` is a 0-based byte offset into the buffer that was handed to the
/// parser. The rendered message is 1-based.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub pos: usize,
    pub fragment: String,
    pub msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, fragment: impl Into<String>, pos: usize, msg: impl Into<String>) -> Error {
        Error {
            kind,
            pos,
            fragment: fragment.into(),
            msg: msg.into(),
        }
    }
}

/// Render a diagnostic: `Error:<pos+1> "<input>" <message>`.
pub fn format_message(input: &str, pos: usize, msg: &str) -> String {
    format!("Error:{} \"{}\" {}", pos + 1, input, msg)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_message(&self.fragment, self.pos, &self.msg))
    }
}

impl std::error::Error for Error {}
