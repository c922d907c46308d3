//! Error types for the aggregation layer.

use std::fmt;

/// Aggregation error type.
///
/// Absent inputs (no chain id, no filter address) are not errors — the
/// aggregators return an empty list for those. Everything here is a real
/// failure the caller should surface.
#[derive(Debug)]
pub enum Error {
    /// Chain configuration missing or incomplete.
    Config(String),
    /// Indexer query failure or malformed response.
    Indexer(String),
    /// Contract read (JSON-RPC) failure.
    Rpc(String),
    /// Oracle price API failure.
    Oracle(String),
    /// Malformed caller-supplied amount.
    Input(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Indexer(msg) => write!(f, "indexer error: {msg}"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::Oracle(msg) => write!(f, "oracle error: {msg}"),
            Error::Input(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_readable() {
        let err = Error::Indexer("pools query timed out".into());
        assert_eq!(err.to_string(), "indexer error: pools query timed out");
    }
}
