use crate::api::error::ApiError;
use crate::AppState;
use actix_web::{web, HttpResponse, Scope};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
}

pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = state.auth.signup(&body.username, &body.password).await?;
    Ok(HttpResponse::Ok().json(SignupResponse { id: id.to_string() }))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    let result = state.auth.login(&body.username, &body.password).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        token: result.token,
        user_id: result.user_id.to_string(),
        username: result.username,
    }))
}

pub fn configure_service() -> Scope {
    web::scope("/auth")
        .route("/signup", web::post().to(signup))
        .route("/login", web::post().to(login))
}
