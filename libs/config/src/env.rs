//! Environment variable names read or written by the worker host

/// Set to `1` to turn on trace-level logging
pub const TRACE_SWITCH: &str = "FUNCTIONS_NETHOST_TRACE";

/// Prefix for settings overrides, e.g. `FUNCTIONS_NETHOST__PORT=7071`
pub const SETTINGS_PREFIX: &str = "FUNCTIONS_NETHOST";

/// Application root the loaded payload reads its functions from
pub const SCRIPT_ROOT: &str = "AzureWebJobsScriptRoot";

/// Attempt token handed to a launched payload; echoed back in its loaded signal
pub const SPECIALIZATION_ATTEMPT: &str = "FUNCTIONS_NETHOST_ATTEMPT";

/// Unix socket the launched payload connects back to
pub const PAYLOAD_SOCKET: &str = "FUNCTIONS_NETHOST_PAYLOAD_SOCKET";
