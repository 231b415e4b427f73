// Identity layer: password storage, token mint/verify, auth service

pub mod password;
pub mod service;
pub mod token;

pub use service::{AuthService, AuthSession};
pub use token::TokenService;
