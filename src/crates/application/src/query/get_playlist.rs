use crate::error::AppError;
use domain::playlist::{Playlist, PlaylistError, PlaylistRepository};
use domain::value::{PlaylistId, UserId};
use std::sync::Arc;

/// 获取播放列表查询服务（读关系库，仅所有者可见）
#[derive(Clone)]
pub struct GetPlaylist {
    playlist_repository: Arc<dyn PlaylistRepository>,
}

impl GetPlaylist {
    pub fn new(playlist_repository: Arc<dyn PlaylistRepository>) -> Self {
        Self {
            playlist_repository,
        }
    }

    /// 根据 ID 获取播放列表（包含成员歌曲）
    pub async fn get_by_id(&self, playlist_id: i64, requester_id: i64) -> Result<Playlist, AppError> {
        let playlist_id = PlaylistId::from(playlist_id);
        let playlist = self
            .playlist_repository
            .find_by_id(&playlist_id)
            .await?
            .ok_or(PlaylistError::NotFound(playlist_id))?;
        if !playlist.is_owned_by(&UserId::from(requester_id)) {
            return Err(AppError::Forbidden(format!(
                "playlist {} is not owned by user {}",
                playlist.id, requester_id
            )));
        }
        Ok(playlist)
    }
}
