//! Admin HTTP surface.
//!
//! A health check for the hosting platform, a Prometheus scrape endpoint and
//! an endpoint that lets an operator message one chat or every subscriber.

pub mod admin;
pub mod error;
pub mod router;
pub mod server;

pub use admin::{AdminState, SendForm};
pub use error::AdminError;
pub use router::{create_health_router, create_metrics_router, create_router};
pub use server::WebServer;
