use super::check_size;
use super::error::ApiError;
use crate::middleware::jwt_verify::AuthUser;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub size: Option<u32>,
}

/// 歌曲全文搜索
pub async fn search(
    state: web::Data<AppState>,
    _user: AuthUser,
    body: web::Json<SearchRequest>,
) -> Result<HttpResponse, ApiError> {
    let size = check_size(body.size)?;
    let hits = state.song_search.search(&body.query, size).await?;
    Ok(HttpResponse::Ok().json(hits))
}
