use std::sync::Arc;

use super::cursor::DocumentCursor;
use super::query_builder::{free_text_query, playlists_of_user_query};
use crate::error::AppError;
use crate::shared::{IndexNames, SearchIndex};
use domain::value::{SongId, UserId};
use model::document::SongDocument;
use model::search::{Query, SearchHit, SearchRequest};

/// 检索相关的默认值
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub free_text_size: u32,
    pub page_size: u32,
    pub scroll_keep_alive: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            free_text_size: 10,
            page_size: 100,
            scroll_keep_alive: "1m".to_string(),
        }
    }
}

/// 歌曲/播放列表文档的只读查询
#[derive(Clone)]
pub struct SongSearch {
    search_index: Arc<dyn SearchIndex>,
    indices: IndexNames,
    settings: SearchSettings,
}

impl SongSearch {
    pub fn new(search_index: Arc<dyn SearchIndex>, indices: IndexNames, settings: SearchSettings) -> Self {
        Self {
            search_index,
            indices,
            settings,
        }
    }

    /// 全文检索，命中附带相关性解释
    pub async fn search(&self, text: &str, size: Option<u32>) -> Result<Vec<SearchHit>, AppError> {
        let query = free_text_query(text)?;
        let request = SearchRequest::new(query, size.unwrap_or(self.settings.free_text_size))
            .with_explain(true);
        let response = self.search_index.search(&self.indices.songs, &request).await?;
        Ok(response.hits)
    }

    pub async fn get_song(&self, song_id: i64) -> Result<SongDocument, AppError> {
        let song_id = SongId::from(song_id);
        let value = self
            .search_index
            .get(&self.indices.songs, &song_id.to_string())
            .await?
            .ok_or_else(|| AppError::not_found("Song", &song_id))?;
        Ok(model::document::from_value(value)?)
    }

    /// 全部歌曲文档的分页游标
    pub fn songs_cursor(&self) -> DocumentCursor {
        self.cursor(&self.indices.songs, Query::MatchAll)
    }

    /// 某个用户全部播放列表文档的分页游标
    pub fn playlists_cursor(&self, user_id: i64) -> DocumentCursor {
        let query = playlists_of_user_query(&UserId::from(user_id));
        self.cursor(&self.indices.playlists, query)
    }

    fn cursor(&self, index: &str, query: Query) -> DocumentCursor {
        DocumentCursor::new(
            self.search_index.clone(),
            index,
            SearchRequest::new(query, self.settings.page_size),
            &self.settings.scroll_keep_alive,
        )
    }
}
