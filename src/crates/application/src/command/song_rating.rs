use std::sync::Arc;

use super::shared::IdGenerator;
use super::sync::{partial_write_failure, retry_index_write, RetryPolicy, MAX_CONVERGE_PASSES};
use crate::error::AppError;
use crate::shared::{IndexNames, SearchIndex};
use domain::activity::{
    RatingOutcome, RatingRange, SongRating, SongRatingRepository, SongShare, SongShareRepository,
};
use domain::catalog::{CatalogError, CatalogRepository};
use domain::user::{UserError, UserRepository};
use domain::value::{SongId, SongRatingId, SongShareId, UserId};
use log::{debug, info, warn};
use model::document::{to_value, SongDocument};
use model::IndexError;
use serde_json::json;

const ENTITY: &str = "song";

#[derive(Debug)]
pub struct RateSongCmd {
    pub user_id: i64,
    pub song_id: i64,
    pub rating: i32,
}

#[derive(Debug)]
pub struct ShareSongCmd {
    pub from_user_id: i64,
    pub to_user_id: i64,
    pub song_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingResult {
    pub outcome: RatingOutcome,
    /// 更新后写入歌曲文档的平均分
    pub total_ratings: f64,
}

/// 歌曲评分与分享服务
pub struct SongActivityAppService {
    rating_repository: Arc<dyn SongRatingRepository>,
    share_repository: Arc<dyn SongShareRepository>,
    catalog_repository: Arc<dyn CatalogRepository>,
    user_repository: Arc<dyn UserRepository>,
    search_index: Arc<dyn SearchIndex>,
    id_generator: Arc<dyn IdGenerator>,
    indices: IndexNames,
    range: RatingRange,
    retry: RetryPolicy,
}

impl SongActivityAppService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rating_repository: Arc<dyn SongRatingRepository>,
        share_repository: Arc<dyn SongShareRepository>,
        catalog_repository: Arc<dyn CatalogRepository>,
        user_repository: Arc<dyn UserRepository>,
        search_index: Arc<dyn SearchIndex>,
        id_generator: Arc<dyn IdGenerator>,
        indices: IndexNames,
        range: RatingRange,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            rating_repository,
            share_repository,
            catalog_repository,
            user_repository,
            search_index,
            id_generator,
            indices,
            range,
            retry,
        }
    }

    /// 评分（存在则覆盖），提交后重算平均分并写入歌曲文档的 `total_ratings`
    pub async fn rate_song(&self, cmd: RateSongCmd) -> Result<RatingResult, AppError> {
        let rating_value = self.range.check(cmd.rating)?;
        let song_id = SongId::from(cmd.song_id);
        if !self.catalog_repository.song_exists(&song_id).await? {
            return Err(CatalogError::SongNotFound(song_id).into());
        }

        let rating = SongRating::new(
            SongRatingId::from(self.id_generator.next_id().await?),
            UserId::from(cmd.user_id),
            song_id.clone(),
            rating_value,
            &self.range,
        )?;
        let outcome = self.rating_repository.upsert(&rating).await?;
        info!(
            "rating {:?} for song {} by user {}: {}",
            outcome, song_id, rating.user_id, rating_value
        );

        let total_ratings = self.sync_total_ratings(&song_id).await?;
        Ok(RatingResult {
            outcome,
            total_ratings,
        })
    }

    /// 把关系库中的平均分写入文档，直到写入后重读的平均分不再变化
    ///
    /// 两次评分的索引写入可能乱序落地，旧均值覆盖新均值；
    /// 写入后重读关系库，发现均值已变化就补写，最后落地的写入方总会看到最终状态。
    async fn sync_total_ratings(&self, song_id: &SongId) -> Result<f64, AppError> {
        let doc_id = song_id.to_string();
        let mut written: Option<f64> = None;
        for _ in 0..MAX_CONVERGE_PASSES {
            let mean = self
                .rating_repository
                .summary_for_song(song_id)
                .await
                .map_err(|e| partial_write_failure(ENTITY, &doc_id, e))?
                .mean();
            if written == Some(mean) {
                return Ok(mean);
            }
            if written.is_some() {
                debug!("song {} mean moved to {} during sync, rewriting", doc_id, mean);
            }
            self.write_total_ratings(song_id, mean).await?;
            written = Some(mean);
        }
        Err(partial_write_failure(
            ENTITY,
            &doc_id,
            "ratings kept changing while syncing total_ratings",
        ))
    }

    /// 记录一次分享，只写关系库
    pub async fn share_song(&self, cmd: ShareSongCmd) -> Result<(), AppError> {
        let song_id = SongId::from(cmd.song_id);
        let to_user_id = UserId::from(cmd.to_user_id);
        if !self.catalog_repository.song_exists(&song_id).await? {
            return Err(CatalogError::SongNotFound(song_id).into());
        }
        if !self.user_repository.exists(&to_user_id).await? {
            return Err(UserError::UserNotFound(to_user_id.to_string()).into());
        }

        let share = SongShare::new(
            SongShareId::from(self.id_generator.next_id().await?),
            UserId::from(cmd.from_user_id),
            to_user_id,
            song_id,
        );
        self.share_repository.append(&share).await?;
        info!(
            "song {} shared by user {} with user {}",
            share.song_id, share.from_user_id, share.to_user_id
        );
        Ok(())
    }

    async fn write_total_ratings(&self, song_id: &SongId, total: f64) -> Result<(), AppError> {
        let doc_id = song_id.to_string();
        let index = self.search_index.as_ref();
        let name = self.indices.songs.as_str();
        let id = doc_id.as_str();
        let partial = json!({ "total_ratings": total });
        let partial = &partial;
        let what = format!("{} {}", ENTITY, doc_id);

        match retry_index_write(&self.retry, &what, move || index.update(name, id, partial)).await
        {
            Ok(()) => Ok(()),
            Err(IndexError::DocumentNotFound { .. }) => {
                warn!("song document {} missing, rebuilding from catalog", doc_id);
                self.rebuild_document(song_id, total).await
            }
            Err(e) => Err(partial_write_failure(ENTITY, &doc_id, e)),
        }
    }

    async fn rebuild_document(&self, song_id: &SongId, total: f64) -> Result<(), AppError> {
        let doc_id = song_id.to_string();
        let detail = self
            .catalog_repository
            .find_song_detail(song_id)
            .await
            .map_err(|e| partial_write_failure(ENTITY, &doc_id, e))?
            .ok_or_else(|| partial_write_failure(ENTITY, &doc_id, "song vanished during rebuild"))?;
        let value = to_value(&SongDocument::from_detail(&detail, total))
            .map_err(|e| partial_write_failure(ENTITY, &doc_id, e))?;

        let index = self.search_index.as_ref();
        let name = self.indices.songs.as_str();
        let id = doc_id.as_str();
        let value = &value;
        let what = format!("{} {}", ENTITY, doc_id);
        retry_index_write(&self.retry, &what, move || index.index(name, id, value))
            .await
            .map_err(|e| partial_write_failure(ENTITY, &doc_id, e))
    }
}
