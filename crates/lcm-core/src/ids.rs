//! The LCM identifier grammar: a bare integer names a message, `S<n>`
//! names a summary, `F<n>` names a file reference.

use std::fmt;
use std::str::FromStr;

use crate::error::LcmError;

/// A stable identifier handed to the agent: message, summary, or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Id {
    Message(i64),
    Summary(i64),
    File(i64),
}

impl Id {
    /// The bare integer payload, regardless of which kind this is.
    pub fn value(&self) -> i64 {
        match self {
            Id::Message(n) | Id::Summary(n) | Id::File(n) => *n,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Message(n) => write!(f, "{n}"),
            Id::Summary(n) => write!(f, "S{n}"),
            Id::File(n) => write!(f, "F{n}"),
        }
    }
}

impl FromStr for Id {
    type Err = LcmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix('S').or_else(|| s.strip_prefix('s')) {
            return rest
                .parse::<i64>()
                .map(Id::Summary)
                .map_err(|_| LcmError::InputError(format!("invalid summary id: {s}")));
        }
        if let Some(rest) = s.strip_prefix('F').or_else(|| s.strip_prefix('f')) {
            return rest
                .parse::<i64>()
                .map(Id::File)
                .map_err(|_| LcmError::InputError(format!("invalid file id: {s}")));
        }
        s.parse::<i64>()
            .map(Id::Message)
            .map_err(|_| LcmError::InputError(format!("invalid id: {s}")))
    }
}
