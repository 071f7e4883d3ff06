pub mod cursor;
pub mod get_playlist;
pub mod query_builder;
pub mod recommend;
pub mod search;
