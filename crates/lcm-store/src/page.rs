//! Opaque pagination tokens: a base64-encoded `(last_id, offset)` pair,
//! ten items per page everywhere (§4.A).

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Result, StoreError};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageToken {
    pub last_id: i64,
    pub offset: usize,
}

impl PageToken {
    pub fn first() -> Self {
        Self::default()
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.last_id, self.offset))
    }

    pub fn decode(token: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(token)
            .map_err(|e| StoreError::Input(format!("malformed page token: {e}")))?;
        let raw = String::from_utf8(raw)
            .map_err(|e| StoreError::Input(format!("malformed page token: {e}")))?;
        let (last_id, offset) = raw
            .split_once(':')
            .ok_or_else(|| StoreError::Input("malformed page token".to_string()))?;
        Ok(Self {
            last_id: last_id
                .parse()
                .map_err(|_| StoreError::Input("malformed page token".to_string()))?,
            offset: offset
                .parse()
                .map_err(|_| StoreError::Input("malformed page token".to_string()))?,
        })
    }
}

/// A single page of results plus the token to request the next one.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageToken>,
    /// Set when a bounded scan (regex search) hit its result cap or
    /// deadline before exhausting the underlying data.
    pub truncated: bool,
}

impl<T> Page<T> {
    pub fn slice(mut all: Vec<T>, token: PageToken, last_id_of: impl Fn(&T) -> i64) -> Self
    where
        T: Clone,
    {
        let total = all.len();
        let start = token.offset.min(total);
        let end = (start + PAGE_SIZE).min(total);
        let items: Vec<T> = all.drain(start..end).collect();
        let next = if end < total {
            Some(PageToken {
                last_id: items.last().map(&last_id_of).unwrap_or(token.last_id),
                offset: end,
            })
        } else {
            None
        };
        Self {
            items,
            next,
            truncated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let t = PageToken {
            last_id: 42,
            offset: 30,
        };
        let encoded = t.encode();
        assert_eq!(PageToken::decode(&encoded).unwrap(), t);
    }

    #[test]
    fn rejects_garbage() {
        assert!(PageToken::decode("not-base64!!").is_err());
    }
}
