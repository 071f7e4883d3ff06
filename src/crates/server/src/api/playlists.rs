use super::error::ApiError;
use super::{check_size, collect_pages, parse_id, PageQuery};
use crate::middleware::jwt_verify::AuthUser;
use crate::AppState;
use actix_web::{web, HttpResponse};
use application::command::playlist::{
    CreatePlaylistCmd, CuratePlaylistCmd, DeletePlaylistCmd, PlaylistSongCmd,
};
use application::query::query_builder::CurationFilter;
use chrono::NaiveDateTime;
use domain::playlist::Playlist;
use domain::value::{AlbumId, ArtistId, GenreId};
use model::document::SongDocument;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct PlaylistView {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub song_ids: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl From<Playlist> for PlaylistView {
    fn from(p: Playlist) -> Self {
        Self {
            id: p.id.to_string(),
            song_ids: p.entries.iter().map(|e| e.song_id.to_string()).collect(),
            name: p.name,
            owner_id: p.owner_id.to_string(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CurateRequest {
    pub name: String,
    pub artist_ids: Vec<String>,
    pub genre_ids: Vec<String>,
    pub album_ids: Vec<String>,
    pub size: Option<u32>,
}

impl CurateRequest {
    fn filter(&self) -> Result<CurationFilter, ApiError> {
        Ok(CurationFilter {
            artist_ids: parse_all::<ArtistId>(&self.artist_ids, "artist")?,
            genre_ids: parse_all::<GenreId>(&self.genre_ids, "genre")?,
            album_ids: parse_all::<AlbumId>(&self.album_ids, "album")?,
        })
    }
}

fn parse_all<T: std::str::FromStr>(raw: &[String], what: &str) -> Result<Vec<T>, ApiError> {
    raw.iter().map(|s| parse_id(s, what)).collect()
}

#[derive(Debug, Serialize)]
pub struct CuratedView {
    pub id: String,
    pub songs: Vec<SongDocument>,
}

pub async fn create(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CreatePlaylistRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = state
        .playlists
        .create_playlist(CreatePlaylistCmd {
            owner_id: user.id(),
            name: body.into_inner().name,
        })
        .await?;
    Ok(HttpResponse::Ok().json(IdResponse { id: id.to_string() }))
}

pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let cursor = state.song_search.playlists_cursor(user.id());
    let paged = collect_pages(cursor, query.max_pages()).await?;
    Ok(HttpResponse::Ok().json(paged))
}

pub async fn get(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id: i64 = parse_id(&path, "playlist")?;
    let playlist = state.get_playlist.get_by_id(playlist_id, user.id()).await?;
    Ok(HttpResponse::Ok().json(PlaylistView::from(playlist)))
}

pub async fn delete(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let playlist_id: i64 = parse_id(&path, "playlist")?;
    state
        .playlists
        .delete_playlist(DeletePlaylistCmd {
            playlist_id,
            requester_id: user.id(),
        })
        .await?;
    Ok(HttpResponse::Ok().finish())
}

fn song_cmd(path: &(String, String), user: &AuthUser) -> Result<PlaylistSongCmd, ApiError> {
    Ok(PlaylistSongCmd {
        playlist_id: parse_id(&path.0, "playlist")?,
        song_id: parse_id(&path.1, "song")?,
        requester_id: user.id(),
    })
}

pub async fn add_song(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    state.playlists.add_song(song_cmd(&path, &user)?).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn remove_song(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    state.playlists.remove_song(song_cmd(&path, &user)?).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn curate(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<CurateRequest>,
) -> Result<HttpResponse, ApiError> {
    let filter = body.filter()?;
    let size = check_size(body.size)?.unwrap_or_else(|| state.app_cfg.curate_size());
    let body = body.into_inner();
    let curated = state
        .playlists
        .curate_playlist(CuratePlaylistCmd {
            owner_id: user.id(),
            name: body.name,
            filter,
            size,
        })
        .await?;
    Ok(HttpResponse::Ok().json(CuratedView {
        id: curated.playlist_id.to_string(),
        songs: curated.songs,
    }))
}
