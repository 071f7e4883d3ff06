pub mod activity;
pub mod catalog;
pub mod db_data;
pub mod playlist;
pub mod user;
