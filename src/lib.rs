//! Type-ahead place suggestions merged from a field's own candidate list and
//! a remote place service.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod fields;
pub mod handlers;
pub mod http;
pub mod init;
pub mod models;
pub mod session;
pub mod sources;
pub mod suggest;
