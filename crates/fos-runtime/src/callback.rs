//! Callback references
//!
//! Attribute values name behaviors as a space-separated list of entries:
//!
//! ```text
//! data-on-click="open toggle (menu,left)"
//! ```
//!
//! Each entry is an id optionally followed by a parenthesized, comma-separated
//! argument list. Arguments are strings; `%`, `,`, `(` and `)` inside an
//! argument are percent-escaped.

use std::fmt;
use std::str::FromStr;

/// One parsed entry of a callback attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackRef {
    pub id: String,
    pub args: Vec<String>,
}

/// Malformed callback attribute value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackParseError {
    #[error("Argument list without a callback id")]
    EmptyId,

    #[error("Unterminated argument list for `{0}`")]
    UnterminatedArgs(String),

    #[error("Unexpected input after `{0}`")]
    TrailingInput(String),
}

impl CallbackRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(id: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Encode `id` with optional arguments.
    ///
    /// A trailing run of `None` is dropped; a `None` before a present argument
    /// encodes as an empty string.
    pub fn encode(id: &str, args: &[Option<&str>]) -> String {
        let Some(last) = args.iter().rposition(Option::is_some) else {
            return id.to_string();
        };
        let encoded: Vec<String> = args[..=last]
            .iter()
            .map(|arg| escape(arg.unwrap_or("")))
            .collect();
        format!("{id} ({})", encoded.join(","))
    }

    /// Parse a whole attribute value, failing on the first malformed entry
    pub fn parse_list(value: &str) -> Result<Vec<CallbackRef>, CallbackParseError> {
        let mut cursor = Cursor::new(value);
        let mut refs = Vec::new();
        while let Some(entry) = cursor.next_entry() {
            refs.push(entry?);
        }
        Ok(refs)
    }

    /// Parse an attribute value, keeping the entries before the first malformed one
    pub fn parse_list_lossy(value: &str) -> Vec<CallbackRef> {
        let mut cursor = Cursor::new(value);
        let mut refs = Vec::new();
        while let Some(entry) = cursor.next_entry() {
            match entry {
                Ok(entry) => refs.push(entry),
                Err(err) => {
                    tracing::warn!("Ignoring malformed callback list {:?}: {}", value, err);
                    break;
                }
            }
        }
        refs
    }
}

impl fmt::Display for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(&self.id);
        }
        let args: Vec<String> = self.args.iter().map(|a| escape(a)).collect();
        write!(f, "{} ({})", self.id, args.join(","))
    }
}

impl FromStr for CallbackRef {
    type Err = CallbackParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cursor = Cursor::new(s);
        let entry = cursor.next_entry().ok_or(CallbackParseError::EmptyId)??;
        cursor.skip_whitespace();
        if cursor.at_end() {
            Ok(entry)
        } else {
            Err(CallbackParseError::TrailingInput(entry.id))
        }
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn next_entry(&mut self) -> Option<Result<CallbackRef, CallbackParseError>> {
        self.skip_whitespace();
        if self.at_end() {
            return None;
        }

        let rest = self.rest();
        let id_len = rest
            .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
            .unwrap_or(rest.len());
        if id_len == 0 {
            // Consume everything so callers stop here
            self.pos = self.src.len();
            return Some(Err(CallbackParseError::EmptyId));
        }
        let id = rest[..id_len].to_string();
        self.pos += id_len;

        let after = self.rest();
        let trimmed = after.trim_start();
        if trimmed.starts_with(')') {
            self.pos = self.src.len();
            return Some(Err(CallbackParseError::TrailingInput(id)));
        }
        if !trimmed.starts_with('(') {
            return Some(Ok(CallbackRef::new(id)));
        }

        let open = self.pos + (after.len() - trimmed.len());
        let Some(close) = self.src[open..].find(')') else {
            self.pos = self.src.len();
            return Some(Err(CallbackParseError::UnterminatedArgs(id)));
        };
        let inner = &self.src[open + 1..open + close];
        self.pos = open + close + 1;

        if self.rest().starts_with(|c: char| !c.is_whitespace()) {
            self.pos = self.src.len();
            return Some(Err(CallbackParseError::TrailingInput(id)));
        }

        let args = inner.split(',').map(unescape).collect();
        Some(Ok(CallbackRef { id, args }))
    }
}

fn escape(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    for c in arg.chars() {
        match c {
            '%' => out.push_str("%25"),
            ',' => out.push_str("%2C"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let escaped = rest.get(idx..idx + 3);
        let decoded = match escaped {
            Some("%25") => Some('%'),
            Some("%2C" | "%2c") => Some(','),
            Some("%28") => Some('('),
            Some("%29") => Some(')'),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[idx + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[idx + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
