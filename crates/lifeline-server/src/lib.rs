pub mod config;
pub mod connections;
pub mod error;
pub mod fanout;
pub mod handlers;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod ws;

pub use config::{AppConfig, DispatchConfig, LoggingConfig, SeedResource, ServerConfig};
pub use connections::{ConnectionRegistry, Session, SessionHandle};
pub use error::ApiError;
pub use fanout::FanoutRouter;
pub use observability::init_tracing;
pub use protocol::{AlertAction, ClientMessage, ServerMessage};
pub use server::{build_app, AppState, LifelineServer, ServerBuilder};
