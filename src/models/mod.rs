pub mod job;
pub mod media;
pub mod settings;
