//! Composable HTTP request dispatch.
//!
//! A request becomes a [`Dialogue`] that is passed by value through
//! handlers. Handlers compose with [`chain!`] and [`switch`]; the first
//! handler that writes a response terminates the dialogue and everything
//! after it is skipped.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::AppConfig;
pub use dispatch::{chain, BoxHandler, Chain, Dialogue, Handler, Phase, ResponseSink};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{switch, PathParams, Pattern, PatternError, RouteTable, Switch, TypedValue};
