pub mod postgres;

pub use postgres::command::{
    activity::{SongRatingRepositoryImpl, SongShareRepositoryImpl},
    catalog::CatalogRepositoryImpl,
    playlist::PlaylistRepositoryImpl,
    user::UserRepositoryImpl,
};
