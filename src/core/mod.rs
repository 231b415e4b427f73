// Domain types and errors

pub mod errors;
pub mod models;
