use crate::search::{FieldType, IndexMapping};
use crate::IndexError;
use domain::catalog::SongDetail;
use domain::playlist::Playlist;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// 索引文档字段名
pub mod fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const ARTIST_ID: &str = "artist_id";
    pub const ARTIST_NAME: &str = "artist_name";
    pub const GENRE_ID: &str = "genre_id";
    pub const GENRE_NAME: &str = "genre_name";
    pub const ALBUM_ID: &str = "album_id";
    pub const ALBUM_NAME: &str = "album_name";
    pub const TOTAL_RATINGS: &str = "total_ratings";

    pub const NAME: &str = "name";
    pub const USER: &str = "user";
    pub const SONGS: &str = "songs";
}

/// 歌曲文档（扁平化的歌曲 + 艺术家/流派/专辑名称 + 平均评分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDocument {
    pub id: String,
    pub title: String,
    pub artist_id: String,
    pub artist_name: String,
    pub genre_id: String,
    pub genre_name: String,
    pub album_id: String,
    pub album_name: String,
    #[serde(default)]
    pub total_ratings: f64,
}

impl SongDocument {
    pub fn from_detail(detail: &SongDetail, total_ratings: f64) -> Self {
        Self {
            id: detail.song.id.to_string(),
            title: detail.song.title.clone(),
            artist_id: detail.artist.id.to_string(),
            artist_name: detail.artist.name.clone(),
            genre_id: detail.genre.id.to_string(),
            genre_name: detail.genre.name.clone(),
            album_id: detail.album.id.to_string(),
            album_name: detail.album.title.clone(),
            total_ratings,
        }
    }

    pub fn mapping() -> IndexMapping {
        IndexMapping::new()
            .field(fields::ID, FieldType::Keyword)
            .field(fields::TITLE, FieldType::Text)
            .field(fields::ARTIST_ID, FieldType::Keyword)
            .field(fields::ARTIST_NAME, FieldType::TextWithKeyword)
            .field(fields::GENRE_ID, FieldType::Keyword)
            .field(fields::GENRE_NAME, FieldType::TextWithKeyword)
            .field(fields::ALBUM_ID, FieldType::Keyword)
            .field(fields::ALBUM_NAME, FieldType::TextWithKeyword)
            .field(fields::TOTAL_RATINGS, FieldType::Float)
    }
}

/// 播放列表文档，`songs` 与关系库中的成员行集合等价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDocument {
    pub id: String,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub songs: Vec<String>,
}

impl PlaylistDocument {
    pub fn from_playlist(playlist: &Playlist) -> Self {
        Self {
            id: playlist.id.to_string(),
            name: playlist.name.clone(),
            user: playlist.owner_id.to_string(),
            songs: playlist
                .entries
                .iter()
                .map(|e| e.song_id.to_string())
                .collect(),
        }
    }

    /// 成员歌曲按集合比较，忽略顺序与重复
    pub fn same_songs(&self, other: &PlaylistDocument) -> bool {
        let mine: BTreeSet<&str> = self.songs.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.songs.iter().map(String::as_str).collect();
        mine == theirs
    }

    pub fn mapping() -> IndexMapping {
        IndexMapping::new()
            .field(fields::ID, FieldType::Keyword)
            .field(fields::NAME, FieldType::TextWithKeyword)
            .field(fields::USER, FieldType::Keyword)
            .field(fields::SONGS, FieldType::Keyword)
    }
}

pub fn to_value<T: Serialize>(doc: &T) -> Result<Value, IndexError> {
    serde_json::to_value(doc).map_err(|e| IndexError::Malformed(e.to_string()))
}

pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, IndexError> {
    serde_json::from_value(value).map_err(|e| IndexError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> PlaylistDocument {
        PlaylistDocument {
            id: "1".to_string(),
            name: "mix".to_string(),
            user: "9".to_string(),
            songs: vec![],
        }
    }

    #[test]
    fn test_same_songs_ignores_order() {
        let mut a = doc();
        a.songs = vec!["10".to_string(), "11".to_string()];
        let mut b = doc();
        b.songs = vec!["11".to_string(), "10".to_string()];
        assert!(a.same_songs(&b));
        b.songs.pop();
        assert!(!a.same_songs(&b));
    }

    #[test]
    fn test_missing_songs_field_defaults_to_empty() {
        let value = serde_json::json!({"id": "1", "name": "mix", "user": "9"});
        let doc: PlaylistDocument = from_value(value).unwrap();
        assert!(doc.songs.is_empty());
    }
}
