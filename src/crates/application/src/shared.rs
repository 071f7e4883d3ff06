use async_trait::async_trait;
use model::search::{IndexMapping, ScrollPage, SearchRequest, SearchResponse};
use model::IndexError;
use serde_json::Value;

/// 搜索索引端口
///
/// 文档以 JSON 形式传递，具体的查询 DSL 与传输由基础设施层负责。
/// 索引不存在时读写操作返回 `IndexError::IndexMissing`。
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn exists(&self, index: &str) -> Result<bool, IndexError>;

    async fn create(&self, index: &str, mapping: &IndexMapping) -> Result<(), IndexError>;

    /// 以指定 id 写入完整文档（存在则覆盖）
    async fn index(&self, index: &str, id: &str, doc: &Value) -> Result<(), IndexError>;

    /// 局部更新，文档不存在时返回 `DocumentNotFound`
    async fn update(&self, index: &str, id: &str, partial: &Value) -> Result<(), IndexError>;

    /// 删除文档，返回文档之前是否存在
    async fn delete(&self, index: &str, id: &str) -> Result<bool, IndexError>;

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, IndexError>;

    async fn search(&self, index: &str, request: &SearchRequest)
        -> Result<SearchResponse, IndexError>;

    /// 打开 scroll 游标并返回第一页
    async fn open_scroll(
        &self,
        index: &str,
        request: &SearchRequest,
        keep_alive: &str,
    ) -> Result<ScrollPage, IndexError>;

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> Result<ScrollPage, IndexError>;

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexError>;
}

/// 两个索引的名称
#[derive(Debug, Clone, PartialEq)]
pub struct IndexNames {
    pub songs: String,
    pub playlists: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            songs: "songs".to_string(),
            playlists: "playlist-info".to_string(),
        }
    }
}
