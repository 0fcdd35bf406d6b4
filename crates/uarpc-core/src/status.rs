//! Status code taxonomy for service results.
//!
//! Every response carries one of these codes, and every fault is identified
//! by one. The numeric layout follows the industrial-automation convention:
//! the top two bits encode severity, so `is_good`/`is_bad` never need a
//! variant list.

use std::fmt;

/// Severity lives in the top two bits of the 32-bit code.
const SEVERITY_MASK: u32 = 0xC000_0000;
const SEVERITY_BAD: u32 = 0x8000_0000;

/// Service result codes.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The operation completed successfully.
    Good = 0x0000_0000,

    /// An unexpected error occurred.
    BadUnexpectedError = 0x8001_0000,

    /// An internal error occurred as a result of a programming or
    /// configuration error.
    BadInternalError = 0x8002_0000,

    /// A low-level communication error occurred.
    BadCommunicationError = 0x8005_0000,

    /// The operation timed out.
    BadTimeout = 0x800A_0000,

    /// The server does not support the requested operation.
    BadServiceUnsupported = 0x800B_0000,

    /// The operation was cancelled because the endpoint is shutting down.
    BadShutdown = 0x800F_0000,

    /// The connection to the peer has been closed.
    BadConnectionClosed = 0x80AE_0000,

    /// The operation cannot be completed in the current state.
    BadInvalidState = 0x80AF_0000,
}

impl StatusCode {
    /// Convert from a u32 wire value.
    /// Returns None if the value doesn't match a known status code.
    pub fn from_u32(val: u32) -> Option<Self> {
        Some(match val {
            0x0000_0000 => StatusCode::Good,
            0x8001_0000 => StatusCode::BadUnexpectedError,
            0x8002_0000 => StatusCode::BadInternalError,
            0x8005_0000 => StatusCode::BadCommunicationError,
            0x800A_0000 => StatusCode::BadTimeout,
            0x800B_0000 => StatusCode::BadServiceUnsupported,
            0x800F_0000 => StatusCode::BadShutdown,
            0x80AE_0000 => StatusCode::BadConnectionClosed,
            0x80AF_0000 => StatusCode::BadInvalidState,
            _ => return None,
        })
    }

    /// Convert to u32 for wire transmission.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Check if this code reports success.
    pub fn is_good(self) -> bool {
        self.as_u32() & SEVERITY_MASK == 0
    }

    /// Check if this code reports failure.
    pub fn is_bad(self) -> bool {
        self.as_u32() & SEVERITY_MASK == SEVERITY_BAD
    }

    /// Get the symbolic name of this status code.
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Good => "Good",
            StatusCode::BadUnexpectedError => "BadUnexpectedError",
            StatusCode::BadInternalError => "BadInternalError",
            StatusCode::BadCommunicationError => "BadCommunicationError",
            StatusCode::BadTimeout => "BadTimeout",
            StatusCode::BadServiceUnsupported => "BadServiceUnsupported",
            StatusCode::BadShutdown => "BadShutdown",
            StatusCode::BadConnectionClosed => "BadConnectionClosed",
            StatusCode::BadInvalidState => "BadInvalidState",
        }
    }
}

impl TryFrom<u32> for StatusCode {
    type Error = UnknownStatusCode;

    fn try_from(val: u32) -> Result<Self, Self::Error> {
        StatusCode::from_u32(val).ok_or(UnknownStatusCode(val))
    }
}

impl From<StatusCode> for u32 {
    fn from(code: StatusCode) -> u32 {
        code.as_u32()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.as_u32())
    }
}

/// Error when converting from an unknown status code value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownStatusCode(pub u32);

impl fmt::Display for UnknownStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status code: 0x{:08X}", self.0)
    }
}

impl std::error::Error for UnknownStatusCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_roundtrip() {
        let codes = [
            StatusCode::Good,
            StatusCode::BadUnexpectedError,
            StatusCode::BadInternalError,
            StatusCode::BadCommunicationError,
            StatusCode::BadTimeout,
            StatusCode::BadServiceUnsupported,
            StatusCode::BadShutdown,
            StatusCode::BadConnectionClosed,
            StatusCode::BadInvalidState,
        ];

        for &code in &codes {
            let val = code.as_u32();
            let roundtrip = StatusCode::from_u32(val).unwrap();
            assert_eq!(code, roundtrip);
        }
    }

    #[test]
    fn status_code_try_from() {
        assert_eq!(StatusCode::try_from(0).unwrap(), StatusCode::Good);
        assert_eq!(
            StatusCode::try_from(0x800B_0000).unwrap(),
            StatusCode::BadServiceUnsupported
        );

        assert_eq!(StatusCode::try_from(0xDEAD), Err(UnknownStatusCode(0xDEAD)));
    }

    #[test]
    fn severity_from_top_bits() {
        assert!(StatusCode::Good.is_good());
        assert!(!StatusCode::Good.is_bad());

        for &code in &[
            StatusCode::BadUnexpectedError,
            StatusCode::BadInternalError,
            StatusCode::BadCommunicationError,
            StatusCode::BadTimeout,
            StatusCode::BadServiceUnsupported,
            StatusCode::BadShutdown,
            StatusCode::BadConnectionClosed,
            StatusCode::BadInvalidState,
        ] {
            assert!(code.is_bad(), "{} should be bad", code.name());
            assert!(!code.is_good(), "{} should not be good", code.name());
        }
    }

    #[test]
    fn status_code_display() {
        let s = format!("{}", StatusCode::BadServiceUnsupported);
        assert!(s.contains("BadServiceUnsupported"));
        assert!(s.contains("0x800B0000"));
    }

    #[test]
    fn unknown_status_code_display() {
        let s = format!("{}", UnknownStatusCode(0xDEAD));
        assert!(s.contains("0x0000DEAD"));
    }
}
