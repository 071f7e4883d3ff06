use std::sync::Arc;

use super::sync::{retry_index_write, RetryPolicy};
use crate::error::AppError;
use crate::shared::{IndexNames, SearchIndex};
use domain::activity::SongRatingRepository;
use domain::catalog::CatalogRepository;
use log::{debug, info};
use model::document::{to_value, PlaylistDocument, SongDocument};

/// 索引维护：启动时建索引，以及从关系库全量重建歌曲文档
pub struct IndexMaintenanceService {
    search_index: Arc<dyn SearchIndex>,
    catalog_repository: Arc<dyn CatalogRepository>,
    rating_repository: Arc<dyn SongRatingRepository>,
    indices: IndexNames,
    retry: RetryPolicy,
}

impl IndexMaintenanceService {
    pub fn new(
        search_index: Arc<dyn SearchIndex>,
        catalog_repository: Arc<dyn CatalogRepository>,
        rating_repository: Arc<dyn SongRatingRepository>,
        indices: IndexNames,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            search_index,
            catalog_repository,
            rating_repository,
            indices,
            retry,
        }
    }

    /// 不存在的索引按映射创建，返回本次新建的索引名
    pub async fn ensure_indices(&self) -> Result<Vec<String>, AppError> {
        let wanted = [
            (&self.indices.songs, SongDocument::mapping()),
            (&self.indices.playlists, PlaylistDocument::mapping()),
        ];
        let mut created = Vec::new();
        for (name, mapping) in wanted.iter() {
            if self.search_index.exists(name).await? {
                debug!("index {} already exists", name);
                continue;
            }
            self.search_index.create(name, mapping).await?;
            info!("index {} created", name);
            created.push(name.to_string());
        }
        Ok(created)
    }

    /// 分批读取歌曲并覆盖写入文档（含当前平均分），可重复执行
    pub async fn reindex_songs(&self, batch_size: u64) -> Result<u64, AppError> {
        let batch_size = batch_size.max(1);
        let index = self.search_index.as_ref();
        let name = self.indices.songs.as_str();
        let mut offset = 0;
        let mut indexed = 0;
        loop {
            let details = self
                .catalog_repository
                .list_song_details(offset, batch_size)
                .await?;
            if details.is_empty() {
                break;
            }
            for detail in &details {
                let summary = self
                    .rating_repository
                    .summary_for_song(&detail.song.id)
                    .await?;
                let doc = SongDocument::from_detail(detail, summary.mean());
                let value = to_value(&doc)?;
                let (id, value) = (doc.id.as_str(), &value);
                let what = format!("song {}", doc.id);
                retry_index_write(&self.retry, &what, move || index.index(name, id, value)).await?;
                indexed += 1;
            }
            offset += details.len() as u64;
            debug!("reindexed {} songs so far", indexed);
        }
        info!("reindexed {} songs into {}", indexed, name);
        Ok(indexed)
    }
}
