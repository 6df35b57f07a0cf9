use std::fmt;

/// Represents a token in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Raw template data.
    TemplateData(&'a str),
    /// An output block (`{{ … }}`) with the source of its expression.
    Output(&'a str),
    /// A tag (`{% … %}`).  `body` is the trimmed inner text, `raw` the tag
    /// exactly as it was written including its delimiters.
    Tag { body: &'a str, raw: &'a str },
}

/// Token span information
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub start_offset: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub end_offset: u32,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " @ {}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}
