use thiserror::Error as ThisError;

/// Raised when recurrence text cannot be parsed.
///
/// There is exactly one kind of parse failure. The message names the offending
/// fragment, and `productions` records which productions were being
/// processed (outermost first) when the failure happened, e.g.
/// `["RRULE", "recur", "BYMONTHDAY"]`.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("malformed recurrence text: {message}{}", render_productions(.productions))]
pub struct ParseError {
    pub message: String,
    pub productions: Vec<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            productions: Vec::new(),
        }
    }
}

fn render_productions(productions: &[String]) -> String {
    if productions.is_empty() {
        String::new()
    } else {
        format!(" (in {})", productions.join(" > "))
    }
}

/// Attaches the name of the enclosing production to a failed parse as the
/// error propagates outwards.
pub(crate) trait InProduction<T> {
    fn in_production(self, name: &str) -> Result<T, ParseError>;
}

impl<T> InProduction<T> for Result<T, ParseError> {
    fn in_production(self, name: &str) -> Result<T, ParseError> {
        self.map_err(|mut err| {
            err.productions.insert(0, name.to_string());
            err
        })
    }
}

macro_rules! parse_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::ParseError::new(format!($($arg)*)))
    };
}

pub(crate) use parse_bail;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A value object was constructed from inconsistent parts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
