pub mod error;
pub mod index;
pub mod playlists;
pub mod recommendations;
pub mod search;
pub mod songs;

use crate::consts;
use actix_web::web;
use application::error::AppError;
use application::query::cursor::DocumentCursor;
use error::ApiError;
use model::search::SearchHit;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 所有 /api 路由；`curate` 必须先于 `{id}` 注册
pub fn configure_service(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/playlists")
            .route("", web::post().to(playlists::create))
            .route("", web::get().to(playlists::list))
            .route("/curate", web::post().to(playlists::curate))
            .route("/{id}", web::get().to(playlists::get))
            .route("/{id}", web::delete().to(playlists::delete))
            .route("/{id}/songs/{song_id}", web::patch().to(playlists::add_song))
            .route("/{id}/songs/{song_id}", web::delete().to(playlists::remove_song)),
    )
    .service(
        web::scope("/songs")
            .route("", web::get().to(songs::list))
            .route("/{id}", web::get().to(songs::get))
            .route("/{id}/rating", web::put().to(songs::rate))
            .route("/{id}/share", web::post().to(songs::share)),
    )
    .route("/search", web::post().to(search::search))
    .route("/recommendations", web::get().to(recommendations::recommend))
    .route("/index/songs/rebuild", web::post().to(index::rebuild_songs));
}

/// 路径或请求体中的字符串 id
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ApiError(AppError::InvalidArgument(format!("invalid {} id: {}", what, raw))))
}

/// 客户端指定的结果数必须落在 1..=MAX_RESULT_SIZE
pub(crate) fn check_size(size: Option<u32>) -> Result<Option<u32>, ApiError> {
    match size {
        Some(n) if n == 0 || n > consts::MAX_RESULT_SIZE => Err(ApiError(AppError::InvalidArgument(
            format!("size must be between 1 and {}, got {}", consts::MAX_RESULT_SIZE, n),
        ))),
        other => Ok(other),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub max_pages: Option<usize>,
}

impl PageQuery {
    pub fn max_pages(&self) -> usize {
        self.max_pages
            .unwrap_or(consts::DEFAULT_MAX_PAGES)
            .clamp(1, consts::MAX_PAGES_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct PagedHits {
    pub pages: Vec<Vec<SearchHit>>,
    /// 游标是否已读完全部结果
    pub exhausted: bool,
}

/// 读取至多 `max_pages` 页，未读完时释放服务端 scroll
pub(crate) async fn collect_pages(
    mut cursor: DocumentCursor,
    max_pages: usize,
) -> Result<PagedHits, ApiError> {
    let pages = match cursor.take_pages(max_pages).await {
        Ok(pages) => pages,
        Err(e) => {
            cursor.reset().await;
            return Err(e.into());
        }
    };
    let exhausted = cursor.is_exhausted();
    if !exhausted {
        cursor.reset().await;
    }
    Ok(PagedHits { pages, exhausted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::value::SongId;

    #[test]
    fn test_max_pages_is_clamped() {
        assert_eq!(PageQuery::default().max_pages(), consts::DEFAULT_MAX_PAGES);
        assert_eq!(PageQuery { max_pages: Some(0) }.max_pages(), 1);
        assert_eq!(
            PageQuery { max_pages: Some(10_000) }.max_pages(),
            consts::MAX_PAGES_LIMIT
        );
    }

    #[test]
    fn test_result_size_is_bounded() {
        assert_eq!(check_size(None).unwrap(), None);
        assert_eq!(check_size(Some(25)).unwrap(), Some(25));
        assert_eq!(
            check_size(Some(consts::MAX_RESULT_SIZE)).unwrap(),
            Some(consts::MAX_RESULT_SIZE)
        );
        for bad in [0, consts::MAX_RESULT_SIZE + 1, u32::MAX] {
            let err = check_size(Some(bad)).unwrap_err();
            assert!(matches!(err.0, AppError::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_parse_id() {
        let id: SongId = parse_id("42", "song").unwrap();
        assert_eq!(id.as_i64(), 42);
        assert!(parse_id::<i64>("abc", "song").is_err());
    }
}
