// Library root for the inventory ledger service

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod ledger;
pub mod store;
