use super::error::ApiError;
use crate::middleware::jwt_verify::AuthUser;
use crate::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendQuery {
    #[serde(default)]
    pub aggregate: bool,
}

pub async fn recommend(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<RecommendQuery>,
) -> Result<HttpResponse, ApiError> {
    let recommendation = state.recommender.recommend(user.id(), query.aggregate).await?;
    Ok(HttpResponse::Ok().json(recommendation))
}
