use std::sync::Arc;

use super::shared::IdGenerator;
use super::sync::{partial_write_failure, retry_index_write, RetryPolicy, MAX_CONVERGE_PASSES};
use crate::error::AppError;
use crate::query::query_builder::{curation_query, CurationFilter};
use crate::shared::{IndexNames, SearchIndex};
use domain::catalog::{CatalogError, CatalogRepository};
use domain::playlist::{Playlist, PlaylistError, PlaylistRepository};
use domain::value::{PlaylistId, PlaylistSongId, SongId, UserId};
use log::{debug, info, warn};
use model::document::{to_value, PlaylistDocument, SongDocument};
use model::search::SearchRequest;

const ENTITY: &str = "playlist";

/// 创建播放列表命令
#[derive(Debug)]
pub struct CreatePlaylistCmd {
    pub owner_id: i64,
    pub name: String,
}

/// 添加/移除播放列表歌曲命令
#[derive(Debug)]
pub struct PlaylistSongCmd {
    pub playlist_id: i64,
    pub song_id: i64,
    pub requester_id: i64,
}

/// 删除播放列表命令
#[derive(Debug)]
pub struct DeletePlaylistCmd {
    pub playlist_id: i64,
    pub requester_id: i64,
}

/// 根据艺术家/流派/专辑精选歌曲并生成播放列表
#[derive(Debug)]
pub struct CuratePlaylistCmd {
    pub owner_id: i64,
    pub name: String,
    pub filter: CurationFilter,
    pub size: u32,
}

#[derive(Debug)]
pub struct CuratedPlaylist {
    pub playlist_id: PlaylistId,
    pub songs: Vec<SongDocument>,
}

/// 播放列表应用服务
///
/// 每个写操作都先提交关系库，再更新 `playlist-info` 索引文档。
/// 索引写入失败不会回滚关系库，而是有限重试后返回 `PartialWriteFailure`。
pub struct PlaylistAppService {
    playlist_repository: Arc<dyn PlaylistRepository>,
    catalog_repository: Arc<dyn CatalogRepository>,
    search_index: Arc<dyn SearchIndex>,
    id_generator: Arc<dyn IdGenerator>,
    indices: IndexNames,
    retry: RetryPolicy,
}

impl PlaylistAppService {
    pub fn new(
        playlist_repository: Arc<dyn PlaylistRepository>,
        catalog_repository: Arc<dyn CatalogRepository>,
        search_index: Arc<dyn SearchIndex>,
        id_generator: Arc<dyn IdGenerator>,
        indices: IndexNames,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            playlist_repository,
            catalog_repository,
            search_index,
            id_generator,
            indices,
            retry,
        }
    }

    /// 创建空播放列表，返回新 id
    pub async fn create_playlist(&self, cmd: CreatePlaylistCmd) -> Result<PlaylistId, AppError> {
        let playlist = self.new_playlist(UserId::from(cmd.owner_id), &cmd.name).await?;
        self.playlist_repository.insert(&playlist).await?;
        info!(
            "playlist {} '{}' created for user {}",
            playlist.id, playlist.name, playlist.owner_id
        );

        self.write_document(&PlaylistDocument::from_playlist(&playlist))
            .await?;
        Ok(playlist.id)
    }

    /// 添加歌曲
    pub async fn add_song(&self, cmd: PlaylistSongCmd) -> Result<(), AppError> {
        let playlist_id = PlaylistId::from(cmd.playlist_id);
        let song_id = SongId::from(cmd.song_id);
        let playlist = self
            .owned_playlist(&playlist_id, &UserId::from(cmd.requester_id))
            .await?;

        if !self.catalog_repository.song_exists(&song_id).await? {
            return Err(CatalogError::SongNotFound(song_id).into());
        }
        if playlist.contains(&song_id) {
            return Err(PlaylistError::SongAlreadyPresent {
                playlist_id,
                song_id,
            }
            .into());
        }

        let entry_id = PlaylistSongId::from(self.id_generator.next_id().await?);
        self.playlist_repository
            .add_song(entry_id, &playlist_id, &song_id)
            .await?;

        self.sync_membership(&playlist_id).await
    }

    /// 移除歌曲
    pub async fn remove_song(&self, cmd: PlaylistSongCmd) -> Result<(), AppError> {
        let playlist_id = PlaylistId::from(cmd.playlist_id);
        let song_id = SongId::from(cmd.song_id);
        self.owned_playlist(&playlist_id, &UserId::from(cmd.requester_id))
            .await?;

        if !self
            .playlist_repository
            .remove_song(&playlist_id, &song_id)
            .await?
        {
            return Err(PlaylistError::SongNotPresent {
                playlist_id,
                song_id,
            }
            .into());
        }

        self.sync_membership(&playlist_id).await
    }

    /// 删除播放列表
    ///
    /// 关系库删除成功后操作即视为成功；文档删除失败只记录日志，留给对账任务清理。
    pub async fn delete_playlist(&self, cmd: DeletePlaylistCmd) -> Result<(), AppError> {
        let playlist_id = PlaylistId::from(cmd.playlist_id);
        self.owned_playlist(&playlist_id, &UserId::from(cmd.requester_id))
            .await?;

        if !self.playlist_repository.delete(&playlist_id).await? {
            return Err(PlaylistError::NotFound(playlist_id).into());
        }
        info!("playlist {} deleted", playlist_id);

        let doc_id = playlist_id.to_string();
        let index = self.search_index.as_ref();
        let name = self.indices.playlists.as_str();
        let id = doc_id.as_str();
        let what = format!("{} {}", ENTITY, doc_id);
        match retry_index_write(&self.retry, &what, move || index.delete(name, id)).await {
            Ok(true) => {}
            Ok(false) => warn!("playlist document {} was already absent", doc_id),
            Err(e) => warn!(
                "playlist {} deleted but its document could not be removed: {}",
                doc_id, e
            ),
        }
        Ok(())
    }

    /// 精选歌曲并以这些歌曲创建播放列表
    ///
    /// 过滤条件为空时不访问索引，创建一个空播放列表。
    pub async fn curate_playlist(&self, cmd: CuratePlaylistCmd) -> Result<CuratedPlaylist, AppError> {
        let query = curation_query(&cmd.filter);
        let mut songs: Vec<SongDocument> = Vec::new();
        if !query.is_match_none() {
            let request = SearchRequest::new(query, cmd.size);
            let response = self
                .search_index
                .search(&self.indices.songs, &request)
                .await?;
            for hit in &response.hits {
                songs.push(hit.decode()?);
            }
        }

        let mut playlist = self.new_playlist(UserId::from(cmd.owner_id), &cmd.name).await?;
        let mut curated = Vec::with_capacity(songs.len());
        for song in songs {
            let song_id: SongId = song.id.parse().map_err(|_| {
                AppError::Internal(format!("malformed song id in search index: {}", song.id))
            })?;
            // 索引可能领先于关系库（例如歌曲已被删除），只保留关系库中存在的歌曲
            if !self.catalog_repository.song_exists(&song_id).await? {
                warn!("curated song {} missing from catalog, skipped", song_id);
                continue;
            }
            let entry_id = PlaylistSongId::from(self.id_generator.next_id().await?);
            if playlist.add_entry(entry_id, song_id).is_ok() {
                curated.push(song);
            }
        }

        self.playlist_repository.insert(&playlist).await?;
        info!(
            "curated playlist {} '{}' created with {} songs",
            playlist.id,
            playlist.name,
            playlist.entries.len()
        );

        self.write_document(&PlaylistDocument::from_playlist(&playlist))
            .await?;
        Ok(CuratedPlaylist {
            playlist_id: playlist.id,
            songs: curated,
        })
    }

    /// 构造新播放列表并检查 (owner, name) 是否重复
    async fn new_playlist(&self, owner_id: UserId, name: &str) -> Result<Playlist, AppError> {
        let playlist_id = PlaylistId::from(self.id_generator.next_id().await?);
        let playlist = Playlist::new(playlist_id, name, owner_id)?;
        if self
            .playlist_repository
            .exists_by_owner_and_name(&playlist.owner_id, &playlist.name)
            .await?
        {
            return Err(PlaylistError::DuplicateName(playlist.name).into());
        }
        Ok(playlist)
    }

    /// 读取关系库中的播放列表并校验所有权
    async fn owned_playlist(
        &self,
        playlist_id: &PlaylistId,
        requester: &UserId,
    ) -> Result<Playlist, AppError> {
        let playlist = self
            .playlist_repository
            .find_by_id(playlist_id)
            .await?
            .ok_or_else(|| PlaylistError::NotFound(playlist_id.clone()))?;
        if !playlist.is_owned_by(requester) {
            return Err(AppError::Forbidden(format!(
                "playlist {} is not owned by user {}",
                playlist_id, requester
            )));
        }
        Ok(playlist)
    }

    /// 写入完整的播放列表文档
    async fn write_document(&self, doc: &PlaylistDocument) -> Result<(), AppError> {
        let value = to_value(doc).map_err(|e| partial_write_failure(ENTITY, &doc.id, e))?;
        let index = self.search_index.as_ref();
        let name = self.indices.playlists.as_str();
        let id = doc.id.as_str();
        let value = &value;
        let what = format!("{} {}", ENTITY, doc.id);
        retry_index_write(&self.retry, &what, move || index.index(name, id, value))
            .await
            .map_err(|e| partial_write_failure(ENTITY, &doc.id, e))
    }

    /// 按关系库现状写入完整文档，直到写入后重读的成员集合不再变化
    ///
    /// 同一播放列表的并发写入可能乱序落地；最后落地的写入方重读时会发现差异并补写。
    /// 文档缺失时这一步同时完成重建。
    async fn sync_membership(&self, playlist_id: &PlaylistId) -> Result<(), AppError> {
        let doc_id = playlist_id.to_string();
        let mut written: Option<PlaylistDocument> = None;
        for _ in 0..MAX_CONVERGE_PASSES {
            let current = self
                .playlist_repository
                .find_by_id(playlist_id)
                .await
                .map_err(|e| partial_write_failure(ENTITY, &doc_id, e))?;
            let Some(playlist) = current else {
                // 播放列表已被并发删除，清掉可能被本次写入复活的文档
                self.discard_document(&doc_id).await;
                return Ok(());
            };
            let doc = PlaylistDocument::from_playlist(&playlist);
            if let Some(prev) = &written {
                if prev.same_songs(&doc) {
                    return Ok(());
                }
                debug!("playlist {} membership moved during sync, rewriting", doc_id);
            }
            self.write_document(&doc).await?;
            written = Some(doc);
        }
        Err(partial_write_failure(
            ENTITY,
            &doc_id,
            "membership kept changing while syncing the document",
        ))
    }

    async fn discard_document(&self, doc_id: &str) {
        let index = self.search_index.as_ref();
        let name = self.indices.playlists.as_str();
        let what = format!("{} {}", ENTITY, doc_id);
        let result = retry_index_write(&self.retry, &what, move || index.delete(name, doc_id)).await;
        if let Err(e) = result {
            warn!("stale playlist document {} could not be removed: {}", doc_id, e);
        }
    }
}
