pub mod engine;
pub mod reaching_defs;
pub mod taint_client;
