// source/mod.rs
pub mod errors;
pub mod synthetic;
pub mod traits;
pub mod types;
pub mod utils;
pub mod yahoo;

use std::sync::Arc;

// Re-export main interfaces for easy access
pub use errors::SourceError;
pub use synthetic::SyntheticSource;
pub use traits::PriceSource;
pub use types::*;
pub use yahoo::YahooSource;

use crate::config::SourceSettings;

/// Build the price source selected in configuration
pub fn create_source(settings: &SourceSettings) -> Arc<dyn PriceSource> {
    match settings.kind {
        PriceSourceKind::Synthetic => Arc::new(SyntheticSource::new(settings.seed)),
        PriceSourceKind::External => Arc::new(YahooSource::with_api_url(&settings.api_url)),
    }
}
