pub mod album;
pub mod artist;
pub mod genre;
pub mod playlist;
pub mod playlist_song;
pub mod song;
pub mod song_rating;
pub mod song_share;
pub mod user;
