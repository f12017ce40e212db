pub mod schema;

#[allow(unused_imports)]
pub use schema::{BotConfig, Config, GatewayConfig, LuisConfig, QnaConfig, SchedulerConfig};
