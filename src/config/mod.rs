pub mod schema;

pub use schema::{BotConfig, Config, Messages};
