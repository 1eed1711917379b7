pub mod model_store;
pub mod price_history;

pub use price_history::{PriceDataError, read_price_history};
