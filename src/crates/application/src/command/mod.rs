pub mod index;
pub mod playlist;
pub mod shared;
pub mod song_rating;
pub mod sync;
