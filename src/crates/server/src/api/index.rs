use super::error::ApiError;
use crate::consts;
use crate::middleware::jwt_verify::AuthUser;
use crate::AppState;
use actix_web::{web, HttpResponse};
use log::info;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub indexed: u64,
}

/// 从关系库重建歌曲索引文档
pub async fn rebuild_songs(
    state: web::Data<AppState>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    info!("user {} requested song index rebuild", user.id());
    let indexed = state
        .index_maintenance
        .reindex_songs(consts::REINDEX_BATCH_SIZE)
        .await?;
    Ok(HttpResponse::Ok().json(RebuildResponse { indexed }))
}
