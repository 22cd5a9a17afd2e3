//! Protocol constants shared by the host-facing crates

/// Capability advertised in the init response: exceptions carry user-code detail
pub const CAPABILITY_ENABLE_USER_CODE_EXCEPTION: &str = "EnableUserCodeException";

/// Capability advertised in the init response: the worker answers warmup requests
pub const CAPABILITY_HANDLES_WORKER_WARMUP: &str = "HandlesWorkerWarmupMessage";

/// Value written for an enabled capability
pub const CAPABILITY_ENABLED: &str = "True";

/// Version reported in `WorkerInitResponse`
pub const WORKER_VERSION: &str = env!("CARGO_PKG_VERSION");
