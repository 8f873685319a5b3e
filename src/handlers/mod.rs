pub mod graphql_handler;
pub mod health;

pub use graphql_handler::{graphiql, graphql};
pub use health::{health_check, health_check_ready};
