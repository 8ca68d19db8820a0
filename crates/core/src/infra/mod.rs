pub mod metrics;
pub mod normalizer;
pub mod output;
pub mod rewriter;
pub mod settings_store;
