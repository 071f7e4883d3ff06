use std::sync::Arc;

use crate::error::AppError;
use crate::shared::SearchIndex;
use log::{debug, warn};
use model::search::{SearchHit, SearchRequest};

#[derive(Debug, Clone, PartialEq)]
enum CursorState {
    /// 尚未向索引发起请求
    Fresh,
    Open(String),
    /// 终止状态，只能通过 `reset` 重新开始
    Exhausted,
}

/// 基于索引 scroll 的有限分页游标
///
/// 每次 `next_page` 返回一页命中；索引返回空页后游标进入终止状态并释放服务端 scroll 上下文。
/// 请求失败时状态不变，调用方可以再次调用 `next_page` 重试当前页。
pub struct DocumentCursor {
    search_index: Arc<dyn SearchIndex>,
    index: String,
    request: SearchRequest,
    keep_alive: String,
    state: CursorState,
}

impl DocumentCursor {
    pub fn new(
        search_index: Arc<dyn SearchIndex>,
        index: &str,
        request: SearchRequest,
        keep_alive: &str,
    ) -> Self {
        Self {
            search_index,
            index: index.to_string(),
            request,
            keep_alive: keep_alive.to_string(),
            state: CursorState::Fresh,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// 下一页；游标耗尽后始终返回 `None`
    pub async fn next_page(&mut self) -> Result<Option<Vec<SearchHit>>, AppError> {
        let page = match &self.state {
            CursorState::Exhausted => return Ok(None),
            CursorState::Fresh => {
                self.search_index
                    .open_scroll(&self.index, &self.request, &self.keep_alive)
                    .await?
            }
            CursorState::Open(scroll_id) => {
                self.search_index
                    .scroll(scroll_id, &self.keep_alive)
                    .await?
            }
        };

        if page.hits.is_empty() {
            let previous = page.scroll_id.or_else(|| self.open_scroll_id());
            self.finish(previous).await;
            return Ok(None);
        }

        self.state = match page.scroll_id {
            Some(id) => CursorState::Open(id),
            // 没有 scroll id 时无法继续翻页，本页即最后一页
            None => CursorState::Exhausted,
        };
        debug!("cursor over {} returned {} hits", self.index, page.hits.len());
        Ok(Some(page.hits))
    }

    /// 最多读取 `max_pages` 页
    pub async fn take_pages(&mut self, max_pages: usize) -> Result<Vec<Vec<SearchHit>>, AppError> {
        let mut pages = Vec::new();
        while pages.len() < max_pages {
            match self.next_page().await? {
                Some(hits) => pages.push(hits),
                None => break,
            }
        }
        Ok(pages)
    }

    /// 读取全部剩余命中
    pub async fn drain(&mut self) -> Result<Vec<SearchHit>, AppError> {
        let mut hits = Vec::new();
        while let Some(page) = self.next_page().await? {
            hits.extend(page);
        }
        Ok(hits)
    }

    /// 释放当前 scroll 并回到初始状态，下次 `next_page` 从第一页开始
    pub async fn reset(&mut self) {
        let open = self.open_scroll_id();
        if let Some(id) = open {
            self.release(&id).await;
        }
        self.state = CursorState::Fresh;
    }

    fn open_scroll_id(&self) -> Option<String> {
        match &self.state {
            CursorState::Open(id) => Some(id.clone()),
            _ => None,
        }
    }

    async fn finish(&mut self, scroll_id: Option<String>) {
        if let Some(id) = scroll_id {
            self.release(&id).await;
        }
        self.state = CursorState::Exhausted;
    }

    async fn release(&self, scroll_id: &str) {
        if let Err(e) = self.search_index.clear_scroll(scroll_id).await {
            warn!("failed to clear scroll {}: {}", scroll_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use model::search::Query;
    use serde_json::json;

    fn index_with_docs(n: usize) -> Arc<FakeSearchIndex> {
        let index = Arc::new(FakeSearchIndex::with_default_indices());
        for i in 0..n {
            index.put("songs", &i.to_string(), json!({ "id": i.to_string() }));
        }
        index
    }

    fn cursor(index: &Arc<FakeSearchIndex>, page_size: u32) -> DocumentCursor {
        DocumentCursor::new(
            index.clone(),
            "songs",
            SearchRequest::new(Query::MatchAll, page_size),
            "1m",
        )
    }

    #[tokio::test]
    async fn test_pages_until_exhausted_then_clears_scroll() {
        let index = index_with_docs(5);
        let mut cursor = cursor(&index, 2);

        let sizes: Vec<usize> = cursor
            .take_pages(10)
            .await
            .unwrap()
            .iter()
            .map(|p| p.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(cursor.is_exhausted());
        assert_eq!(index.open_scrolls(), 0);

        // 终止状态是确定的
        assert!(cursor.next_page().await.unwrap().is_none());
        assert!(cursor.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_restarts_from_first_page() {
        let index = index_with_docs(3);
        let mut cursor = cursor(&index, 2);

        let first = cursor.next_page().await.unwrap().unwrap();
        cursor.reset().await;
        assert_eq!(index.open_scrolls(), 0);

        let again = cursor.next_page().await.unwrap().unwrap();
        assert_eq!(first, again);
        assert_eq!(cursor.drain().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_take_pages_stops_at_limit() {
        let index = index_with_docs(10);
        let mut cursor = cursor(&index, 3);

        assert_eq!(cursor.take_pages(2).await.unwrap().len(), 2);
        assert!(!cursor.is_exhausted());
        assert_eq!(index.open_scrolls(), 1);
    }

    #[tokio::test]
    async fn test_empty_index_is_immediately_exhausted() {
        let index = index_with_docs(0);
        let mut cursor = cursor(&index, 100);
        assert!(cursor.next_page().await.unwrap().is_none());
        assert!(cursor.is_exhausted());
        assert_eq!(index.open_scrolls(), 0);
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let index = Arc::new(FakeSearchIndex::default());
        let mut cursor = cursor(&index, 10);
        assert!(matches!(
            cursor.next_page().await,
            Err(AppError::NotFound(..))
        ));
        assert!(!cursor.is_exhausted());
    }
}
