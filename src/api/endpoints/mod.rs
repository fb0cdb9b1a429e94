//! API endpoint handlers.
//!
//! Each module corresponds to one dashboard feature. Handlers only
//! translate HTTP to `CoreState` calls and back.

pub mod dashboard;
pub mod health;
pub mod logs;
pub mod run;
