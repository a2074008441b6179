pub mod cache;
pub mod direct;
pub mod filename;
pub mod orchestrator;
pub mod paths;
pub mod platform;
pub mod process;
pub mod progress;
pub mod registry;
pub mod ytdlp;
