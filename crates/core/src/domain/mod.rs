pub mod error;
pub mod relay;
pub mod settings;
pub mod types;
pub mod workspace;
