use crate::core::dialect::Dialect;

/// Parser state within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Unquoted = 0,
    Quoted = 1,
}

/// What a character means to the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    Separator = 0,
    Quote = 1,
    /// Escape character distinct from the quote.
    Escape = 2,
    Cr = 3,
    Lf = 4,
    Other = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Keep the character as field data.
    Append,
    /// Keep the quote and enter the quoted state.
    OpenQuote,
    /// Keep the quote and leave the quoted state.
    CloseQuote,
    /// Keep the escape; a following quote or escape is literal data.
    EscapeNext,
    /// Flush the field into the record.
    EndField,
    /// Flush the field and emit the record. CR swallows a following LF.
    EndRecord,
    /// Linebreak inside quotes, data only if the dialect allows it.
    EmbeddedLinebreak,
}

use Action::*;

const TRANSITIONS: [[Action; 6]; 2] = [
    // Separator, Quote,     Escape,     Cr,                Lf,                Other
    [EndField, OpenQuote, Append, EndRecord, EndRecord, Append],
    [Append, CloseQuote, EscapeNext, EmbeddedLinebreak, EmbeddedLinebreak, Append],
];

pub(crate) fn transition(state: State, class: CharClass) -> Action {
    TRANSITIONS[state as usize][class as usize]
}

/// Maps characters to their class for one dialect.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Classifier {
    separator: char,
    quote: Option<char>,
    escape: Option<char>,
}

impl Classifier {
    pub(crate) fn new(dialect: &Dialect) -> Self {
        Self {
            separator: dialect.separator(),
            quote: dialect.quote(),
            escape: dialect.distinct_escape(),
        }
    }

    pub(crate) fn classify(&self, c: char) -> CharClass {
        if c == self.separator {
            CharClass::Separator
        } else if Some(c) == self.quote {
            CharClass::Quote
        } else if Some(c) == self.escape {
            CharClass::Escape
        } else if c == '\r' {
            CharClass::Cr
        } else if c == '\n' {
            CharClass::Lf
        } else {
            CharClass::Other
        }
    }

    /// Whether `c` directly after an escape is kept as literal data.
    pub(crate) fn is_escapable(&self, c: char) -> bool {
        Some(c) == self.quote || Some(c) == self.escape
    }
}

/// Removes the quoting from a raw field.
///
/// Toggling quotes are dropped, doubled quotes (or escape + quote when the
/// escape is distinct) become one literal quote.
pub(crate) fn unquote(raw: &str, quote: char, escape: Option<char>) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut quoted = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if !quoted {
            if c == quote {
                quoted = true;
            } else {
                value.push(c);
            }
        } else if Some(c) == escape {
            match chars.peek() {
                Some(&next) if next == quote || Some(next) == escape => {
                    value.push(next);
                    chars.next();
                }
                _ => value.push(c),
            }
        } else if c == quote {
            if escape.is_none() && chars.peek() == Some(&quote) {
                value.push(quote);
                chars.next();
            } else {
                quoted = false;
            }
        } else {
            value.push(c);
        }
    }

    value
}

/// Rewrites CRLF and lone CR as LF.
pub(crate) fn normalize_linebreaks(value: String) -> String {
    if value.contains('\r') {
        value.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        value
    }
}
