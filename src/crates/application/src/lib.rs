pub mod auth;
pub mod command;
pub mod error;
pub mod query;
pub mod shared;

#[cfg(test)]
pub(crate) mod test_support;
