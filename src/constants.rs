//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager used for every write made by the controller
pub const FIELD_MANAGER: &str = "infra-binding-controller";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default requeue delay after a default backing instance was just provisioned (seconds)
pub const DEFAULT_PROVISION_REQUEUE_SECS: u64 = 10;

/// Default periodic resync interval after a successful reconciliation (seconds)
/// Backing instances are owned by other operators, so readiness is re-checked on this cadence
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default Fibonacci backoff minimum after a reconciliation error (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default Fibonacci backoff maximum after a reconciliation error (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default number of attempts for a write that hits a version conflict
pub const DEFAULT_CONFLICT_RETRY_ATTEMPTS: u32 = 5;

/// Default maximum number of Infra resources reconciled at the same time
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Label marking objects created by the controller
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY_VALUE: &str = "infra-binding-controller";

/// Label carrying the name of the Infra resource an object was created for
pub const INFRA_NAME_LABEL: &str = "infra.processruntime.io/infra";

/// Secret key holding a derived username
pub const CREDENTIAL_USERNAME_KEY: &str = "username";

/// Secret key holding a derived password
pub const CREDENTIAL_PASSWORD_KEY: &str = "password";

/// Secret key holding a derived PKCS#12 trust store
pub const TRUSTSTORE_KEY: &str = "truststore.p12";

/// Secret key holding the trust store password
pub const TRUSTSTORE_PASSWORD_KEY: &str = "truststore-password";

/// Trust store format advertised to application runtimes
pub const TRUSTSTORE_TYPE: &str = "PKCS12";

/// Directory where derived certificates are mounted inside application pods
pub const CERTS_MOUNT_DIR: &str = "/home/kogito/certs";
