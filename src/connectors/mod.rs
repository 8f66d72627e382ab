pub mod file;
pub mod messages;
pub mod traits;

pub use file::JsonFileSource;
pub use traits::MarketDataSource;
