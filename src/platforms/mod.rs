pub mod aggregator;
pub mod gallery;
pub mod locked;
pub mod social;
pub mod streaming;
pub mod traits;

pub use traits::{ExtractError, Extractor};
