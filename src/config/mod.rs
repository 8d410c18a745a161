//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → HttpSettings published through ArcSwap to every endpoint
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<HttpSettings>
//!     → invocations started afterwards observe the new timeout/threshold
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Route paths (including the internal prefix) are fixed at registration

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ClientConfig, HttpConfig, HttpSettings, ListenerConfig, ObservabilityConfig, ServiceConfig,
    ServiceSection,
};
