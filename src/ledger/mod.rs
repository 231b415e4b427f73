// Transactional stock ledger

pub mod engine;

pub use engine::LedgerEngine;
