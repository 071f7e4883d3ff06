use crate::value::{PlaylistId, PlaylistSongId, SongId, UserId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

/// 播放列表领域错误
#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("Playlist not found: {0}")]
    NotFound(PlaylistId),
    #[error("Playlist already exists: {0}")]
    DuplicateName(String),
    #[error("Song {song_id} already in playlist {playlist_id}")]
    SongAlreadyPresent {
        playlist_id: PlaylistId,
        song_id: SongId,
    },
    #[error("Song {song_id} not in playlist {playlist_id}")]
    SongNotPresent {
        playlist_id: PlaylistId,
        song_id: SongId,
    },
    #[error("Validation error: {0}")]
    ValidationErr(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    DbErr(String),
}

/// 播放列表成员行
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub id: PlaylistSongId,
    pub song_id: SongId,
}

/// 播放列表聚合根
///
/// 成员歌曲是无序集合，同一首歌在一个播放列表里最多出现一次。
#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub owner_id: UserId,
    pub entries: Vec<PlaylistEntry>,
    pub created_at: NaiveDateTime,
}

impl Playlist {
    /// 创建新播放列表
    pub fn new(id: PlaylistId, name: &str, owner_id: UserId) -> Result<Self, PlaylistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlaylistError::ValidationErr(
                "playlist name is empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            owner_id,
            entries: Vec::new(),
            created_at: Utc::now().naive_utc(),
        })
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }

    pub fn contains(&self, song_id: &SongId) -> bool {
        self.entries.iter().any(|e| &e.song_id == song_id)
    }

    pub fn song_ids(&self) -> Vec<SongId> {
        self.entries.iter().map(|e| e.song_id.clone()).collect()
    }

    /// 添加成员歌曲，重复时返回 `SongAlreadyPresent`
    pub fn add_entry(
        &mut self,
        entry_id: PlaylistSongId,
        song_id: SongId,
    ) -> Result<(), PlaylistError> {
        if self.contains(&song_id) {
            return Err(PlaylistError::SongAlreadyPresent {
                playlist_id: self.id.clone(),
                song_id,
            });
        }
        self.entries.push(PlaylistEntry {
            id: entry_id,
            song_id,
        });
        Ok(())
    }
}

/// 播放列表仓储接口
///
/// (owner, name) 与 (playlist, song) 的唯一性由存储层约束保证，
/// 违反约束时分别返回 `DuplicateName` 与 `SongAlreadyPresent`。
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// 根据 ID 查找（包含成员歌曲）
    async fn find_by_id(&self, id: &PlaylistId) -> Result<Option<Playlist>, PlaylistError>;

    async fn exists_by_owner_and_name(
        &self,
        owner_id: &UserId,
        name: &str,
    ) -> Result<bool, PlaylistError>;

    /// 在同一事务内插入播放列表行及其成员行
    async fn insert(&self, playlist: &Playlist) -> Result<(), PlaylistError>;

    /// 删除播放列表（级联删除成员行），返回是否删除了记录
    async fn delete(&self, id: &PlaylistId) -> Result<bool, PlaylistError>;

    async fn add_song(
        &self,
        entry_id: PlaylistSongId,
        id: &PlaylistId,
        song_id: &SongId,
    ) -> Result<(), PlaylistError>;

    /// 删除成员行，返回是否删除了记录
    async fn remove_song(&self, id: &PlaylistId, song_id: &SongId)
        -> Result<bool, PlaylistError>;
}
