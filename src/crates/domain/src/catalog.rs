use crate::value::{AlbumId, ArtistId, GenreId, SongId};
use async_trait::async_trait;
use thiserror::Error;

/// 曲库领域错误
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Song not found: {0}")]
    SongNotFound(SongId),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    DbErr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub artist_id: ArtistId,
}

/// 歌曲实体，艺术家、流派、专辑均为必填引用
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist_id: ArtistId,
    pub genre_id: GenreId,
    pub album_id: AlbumId,
}

/// 歌曲及其关联的艺术家/流派/专辑，用于构建搜索文档
#[derive(Debug, Clone, PartialEq)]
pub struct SongDetail {
    pub song: Song,
    pub artist: Artist,
    pub genre: Genre,
    pub album: Album,
}

/// 曲库仓储接口
///
/// 曲库数据由外部批量导入任务写入，这里只需要读能力。
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn song_exists(&self, id: &SongId) -> Result<bool, CatalogError>;

    async fn find_song_detail(&self, id: &SongId) -> Result<Option<SongDetail>, CatalogError>;

    /// 均匀随机抽取最多 `limit` 首歌曲（不放回）
    async fn random_song_ids(&self, limit: u64) -> Result<Vec<SongId>, CatalogError>;

    /// 按 id 顺序分页读取歌曲详情
    async fn list_song_details(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SongDetail>, CatalogError>;

    async fn count_songs(&self) -> Result<u64, CatalogError>;
}
