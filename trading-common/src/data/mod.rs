pub mod cache;
pub mod types;

pub use cache::{PriceSeriesCache, SeriesKey};
pub use types::{DataError, PricePoint, PriceSeries};
