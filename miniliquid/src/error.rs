use std::borrow::Cow;
use std::fmt;

/// Represents rendering errors.
///
/// Almost everything in a template degrades to `nil` or is silently
/// skipped, so errors are rare.  A render only fails if an include cannot
/// be resolved, if includes nest deeper than the configured recursion
/// limit, or if context data could not be converted.
///
/// Errors raised while rendering an include carry the name of the
/// template and the line of the tag that failed.  Formatting an error
/// with the alternative formatting (``format!("{:#}", err)``) also lists
/// the chain of includes that led to it.
///
/// # Example
///
/// ```rust
/// # use miniliquid::{Context, Environment};
/// let env = Environment::new();
/// match env.render_str("{% include 'missing' %}", &mut Context::new()) {
///     Ok(result) => println!("{}", result),
///     Err(err) => {
///         eprintln!("Could not render template:");
///         eprintln!("  {:#}", err);
///     }
/// }
/// ```
pub struct Error {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
    name: Option<String>,
    lineno: usize,
    included_from: Vec<(String, usize)>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .field("name", &self.name)
            .field("lineno", &self.lineno)
            .field("included_from", &self.included_from)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl Eq for Error {}

/// An enum describing the error kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An include could not be resolved by name.
    TemplateNotFound,
    /// The operation is not allowed, for instance includes nesting too deep.
    InvalidOperation,
    /// Context data could not be converted into values.
    BadSerialization,
    /// Writing the output failed.
    WriteFailure,
}

impl ErrorKind {
    fn description(self) -> &'static str {
        match self {
            ErrorKind::TemplateNotFound => "template not found",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::BadSerialization => "could not serialize to internal format",
            ErrorKind::WriteFailure => "failed to write output",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref detail) = self.detail {
            write!(f, "{}: {}", self.kind, detail)?;
        } else {
            write!(f, "{}", self.kind)?;
        }
        if let Some(ref filename) = self.name {
            write!(f, " (in {}:{})", filename, self.lineno)?
        }
        if f.alternate() {
            for (name, lineno) in &self.included_from {
                write!(f, "\n  included from {}:{}", name, lineno)?;
            }
        }
        Ok(())
    }
}

impl Error {
    /// Creates a new error with kind and detail.
    pub fn new<D: Into<Cow<'static, str>>>(kind: ErrorKind, detail: D) -> Error {
        Error {
            kind,
            detail: Some(detail.into()),
            name: None,
            lineno: 0,
            included_from: Vec::new(),
            source: None,
        }
    }

    /// Records where the error happened.
    ///
    /// The innermost location wins, every later call is recorded as one
    /// more step of the include chain.
    pub(crate) fn set_location(&mut self, filename: &str, lineno: usize) {
        if self.name.is_none() {
            self.name = Some(filename.into());
            self.lineno = lineno;
        } else {
            self.included_from.push((filename.into(), lineno));
        }
    }

    /// Attaches another error as source to this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error detail
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the name of the template the error happened in.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the line.
    pub fn line(&self) -> Option<usize> {
        self.name.as_ref().map(|_| self.lineno)
    }

    /// Returns the templates (and lines) that included the failing template,
    /// innermost first.
    pub fn included_from(&self) -> impl Iterator<Item = (&str, usize)> {
        self.included_from
            .iter()
            .map(|(name, lineno)| (name.as_str(), *lineno))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            detail: None,
            name: None,
            lineno: 0,
            included_from: Vec::new(),
            source: None,
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::new(ErrorKind::WriteFailure, "formatting failed")
    }
}
