pub mod auth;
pub mod convert;
pub mod directory;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod otp;
pub mod requests;
pub mod routes;
pub mod runner;
pub mod state;
pub mod tokens;
