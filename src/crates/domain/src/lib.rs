pub mod activity;
pub mod catalog;
pub mod playlist;
pub mod user;
pub mod value;
