//! Track Gateway Library
//!
//! Minimal HTTP gateway that converts uploaded GPS track files with an
//! external tool (gpsbabel).
//!
//! # Features
//!
//! - **Single endpoint**: `POST /convert` with a multipart `file` field
//! - **Superficial validation**: size limit and XML content sniffing
//! - **Ephemeral staging**: one directory per request, removed at request end
//! - **Delegated conversion**: all format work is done by gpsbabel
//!
//! # Example
//!
//! ```no_run
//! use track_gateway::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use convert::{Converter, GpsBabel, TrackFormat};
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
