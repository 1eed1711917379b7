// Price series domain
pub mod price_point;

pub use price_point::{PricePoint, closing_prices};
