pub mod access;
pub mod aggregate;
pub mod api;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod lifecycle;
pub mod office;
pub mod scope;
pub mod search;
