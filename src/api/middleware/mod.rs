//! API middleware.
//!
//! The dashboard API is local and unauthenticated, so the stack is just
//! the access logger (CORS is a tower-http layer in the router).

pub mod audit;
