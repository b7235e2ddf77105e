//! HTTP API handlers for agora-ai

pub mod health;
pub mod issues;
pub mod titles;

pub use health::health_routes;
pub use issues::issue_routes;
pub use titles::title_routes;
