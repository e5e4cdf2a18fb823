pub mod auth;
pub mod convert;
pub mod dashboard;
pub mod error;
pub mod feedback;
pub mod middleware;
pub mod routes;
pub mod token;
