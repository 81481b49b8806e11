pub mod backend;
pub mod config;
pub mod hooks;
pub mod logging;

pub use config::{Config, ResolvedConfig};
pub use hooks::{GeneratedFile, Hooks};
