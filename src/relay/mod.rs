//! The mail relay: request model, handler, and HTTP routes.

pub mod handler;
pub mod model;
pub mod routes;

pub use handler::MailRelay;
pub use model::{Ack, SendRequest};
pub use routes::relay_routes;
