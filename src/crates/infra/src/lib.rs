pub mod repository;

pub mod id_generator;
pub use id_generator::SnowflakeIdGenerator;

pub mod config;
pub use config::{SearchConfig, ServerConfig};

pub mod auth;

pub mod search;
pub use search::ElasticSearchIndex;
