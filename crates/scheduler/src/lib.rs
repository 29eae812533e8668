//! Course scheduling: users, courses, sections and skills, with role-based
//! administration and batched course updates.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod policy;
pub mod server;
pub mod service;
pub mod session;
pub mod types;
pub mod update;
pub mod validation;

pub use error::SchedulerError;
