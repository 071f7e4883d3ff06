pub mod dsl;
pub mod elastic;

pub use elastic::ElasticSearchIndex;
