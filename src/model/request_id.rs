//! Request-ID is an opaque token to correlate a response with its log lines

use http::{HeaderMap, HeaderValue};
use rand::Rng;
use std::fmt::Write;
use thiserror::*;

/// Request-ID echoed from the client or freshly generated
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<[u8; 16]> for RequestId {
    fn from(bytes: [u8; 16]) -> Self {
        let mut token = String::with_capacity(32);
        for b in bytes.iter() {
            // writing to a String cannot fail
            let _ = write!(token, "{:02x}", b);
        }
        RequestId(token)
    }
}

#[derive(Debug, Error)]
pub enum InvalidRequestId {
    #[error("request-id not found")]
    NotFound(),
    #[error("Invalid request-id string {0}")]
    InvalidString(String),
}

impl RequestId {
    pub const HEADER_NAME: &'static str = "x-request-id";

    /// Generates a request-id out of 16 random bytes, hex encoded.
    pub fn generate() -> Self {
        rand::thread_rng().gen::<[u8; 16]>().into()
    }

    /// Extract request-id from a set of HTTP headers
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut headers = HeaderMap::new();
    ///
    /// let rid = RequestId::generate();
    /// rid.insert_into_header_map(&mut headers)?;
    /// let rid_extracted = RequestId::from_header_map(&headers);
    ///
    /// assert_eq!(rid_extracted.unwrap(), rid);
    /// ```
    pub fn from_header_map(h: &HeaderMap) -> Result<Self, InvalidRequestId> {
        h.get(Self::HEADER_NAME)
            .ok_or(InvalidRequestId::NotFound())
            .and_then(|x| {
                x.to_str()
                    .map_err(|err| InvalidRequestId::InvalidString(err.to_string()))
            })
            .and_then(|x| {
                if x.is_empty() {
                    return Err(InvalidRequestId::NotFound());
                }
                Ok(RequestId(x.to_string()))
            })
    }

    /// The inbound request-id if the client sent a usable one, a new one otherwise.
    pub fn from_header_map_or_generate(h: &HeaderMap) -> Self {
        Self::from_header_map(h).unwrap_or_else(|_| Self::generate())
    }

    pub fn insert_into_header_map(&self, h: &mut HeaderMap) -> anyhow::Result<()> {
        h.insert(Self::HEADER_NAME, HeaderValue::from_str(&self.0)?);
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
