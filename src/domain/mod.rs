pub mod error;
pub mod hex;
pub mod types;
