//! Constants for relay networking (timeouts).

/// Default connect timeout per relay (10 seconds).
pub const RELAY_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default time to wait for response headers from one relay (30 seconds).
pub const RELAY_RESPONSE_TIMEOUT_SECS: u64 = 30;

/// Default idle timeout between body chunks (30 seconds).
pub const RELAY_READ_TIMEOUT_SECS: u64 = 30;
