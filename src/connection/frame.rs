//! Provides a type representing a Redis protocol frame.
//!
//! Commands are rendered into frames before a writer frames them on the wire,
//! and replies are delivered to callers as frames.
//!
//! Redis serialization protocol (RESP) specification:
//!  https://redis.io/docs/reference/protocol-spec/

use std::fmt;

use bytes::Bytes;

/// A frame in the Redis protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(u64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl PartialEq<&str> for Frame {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Frame::Simple(s) => s.eq(other),
            Frame::Bulk(s) => s.eq(other),
            _ => false,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use std::str;

        match self {
            Frame::Simple(response) => response.fmt(fmt),
            Frame::Error(msg) => write!(fmt, "error: {}", msg),
            Frame::Integer(num) => num.fmt(fmt),
            Frame::Bulk(msg) => match str::from_utf8(msg) {
                Ok(string) => string.fmt(fmt),
                Err(_) => write!(fmt, "{:?}", msg),
            },
            Frame::Null => "(nil)".fmt(fmt),
            Frame::Array(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, " ")?;
                    }
                    part.fmt(fmt)?;
                }

                Ok(())
            }
        }
    }
}

impl Frame {
    /// Build an array frame of bulk strings.
    pub(crate) fn bulk_array<I>(parts: I) -> Frame
    where
        I: IntoIterator<Item = Bytes>,
    {
        Frame::Array(parts.into_iter().map(Frame::Bulk).collect())
    }
}
