use super::error::ApiError;
use super::{collect_pages, parse_id, PageQuery};
use crate::middleware::jwt_verify::AuthUser;
use crate::AppState;
use actix_web::{web, HttpResponse};
use application::command::song_rating::{RateSongCmd, RatingResult, ShareSongCmd};
use domain::activity::RatingOutcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub outcome: &'static str,
    pub total_ratings: f64,
}

impl From<RatingResult> for RatingResponse {
    fn from(r: RatingResult) -> Self {
        Self {
            outcome: match r.outcome {
                RatingOutcome::Added => "added",
                RatingOutcome::Updated => "updated",
            },
            total_ratings: r.total_ratings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub to_user_id: String,
}

pub async fn list(
    state: web::Data<AppState>,
    _user: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let paged = collect_pages(state.song_search.songs_cursor(), query.max_pages()).await?;
    Ok(HttpResponse::Ok().json(paged))
}

pub async fn get(
    state: web::Data<AppState>,
    _user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let song_id: i64 = parse_id(&path, "song")?;
    let song = state.song_search.get_song(song_id).await?;
    Ok(HttpResponse::Ok().json(song))
}

pub async fn rate(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<RatingRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = state
        .activity
        .rate_song(RateSongCmd {
            user_id: user.id(),
            song_id: parse_id(&path, "song")?,
            rating: body.rating,
        })
        .await?;
    Ok(HttpResponse::Ok().json(RatingResponse::from(result)))
}

pub async fn share(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<ShareRequest>,
) -> Result<HttpResponse, ApiError> {
    state
        .activity
        .share_song(ShareSongCmd {
            from_user_id: user.id(),
            to_user_id: parse_id(&body.to_user_id, "user")?,
            song_id: parse_id(&path, "song")?,
        })
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_response_outcome_names() {
        let resp = RatingResponse::from(RatingResult {
            outcome: RatingOutcome::Updated,
            total_ratings: 3.5,
        });
        assert_eq!(resp.outcome, "updated");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["total_ratings"], 3.5);
    }
}
