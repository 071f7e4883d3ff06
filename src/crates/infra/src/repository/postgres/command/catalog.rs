use super::db_data::{album, artist, genre, song};
use crate::repository::postgres::StoreFailure;
use async_trait::async_trait;
use domain::catalog::{
    Album, Artist, CatalogError, CatalogRepository, Genre, Song, SongDetail,
};
use domain::value::{AlbumId, ArtistId, GenreId, SongId};
use log::warn;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::collections::{HashMap, HashSet};

fn catalog_err(e: DbErr) -> CatalogError {
    match StoreFailure::from(e) {
        StoreFailure::Unavailable(msg) => CatalogError::Unavailable(msg),
        StoreFailure::UniqueViolation(msg)
        | StoreFailure::ForeignKeyViolation(msg)
        | StoreFailure::Other(msg) => CatalogError::DbErr(msg),
    }
}

/// 曲库只读仓储
#[derive(Clone)]
pub struct CatalogRepositoryImpl {
    db: DbConn,
}

impl CatalogRepositoryImpl {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// 批量补齐艺术家/流派/专辑，避免逐首查询
    async fn load_details(&self, songs: Vec<song::Model>) -> Result<Vec<SongDetail>, CatalogError> {
        if songs.is_empty() {
            return Ok(Vec::new());
        }
        let artist_ids: HashSet<i64> = songs.iter().map(|s| s.artist_id).collect();
        let genre_ids: HashSet<i64> = songs.iter().map(|s| s.genre_id).collect();
        let album_ids: HashSet<i64> = songs.iter().map(|s| s.album_id).collect();

        let artists: HashMap<i64, Artist> = artist::Entity::find()
            .filter(artist::Column::Id.is_in(artist_ids))
            .all(&self.db)
            .await
            .map_err(catalog_err)?
            .into_iter()
            .map(|m| (m.id, m.into()))
            .collect();
        let genres: HashMap<i64, Genre> = genre::Entity::find()
            .filter(genre::Column::Id.is_in(genre_ids))
            .all(&self.db)
            .await
            .map_err(catalog_err)?
            .into_iter()
            .map(|m| (m.id, m.into()))
            .collect();
        let albums: HashMap<i64, Album> = album::Entity::find()
            .filter(album::Column::Id.is_in(album_ids))
            .all(&self.db)
            .await
            .map_err(catalog_err)?
            .into_iter()
            .map(|m| (m.id, m.into()))
            .collect();

        let mut details = Vec::with_capacity(songs.len());
        for model in &songs {
            let song = Song::from(model);
            match (
                artists.get(&model.artist_id),
                genres.get(&model.genre_id),
                albums.get(&model.album_id),
            ) {
                (Some(artist), Some(genre), Some(album)) => details.push(SongDetail {
                    song,
                    artist: artist.clone(),
                    genre: genre.clone(),
                    album: album.clone(),
                }),
                _ => warn!(
                    "song {} references missing artist {}, genre {} or album {}",
                    song.id,
                    ArtistId::from(model.artist_id),
                    GenreId::from(model.genre_id),
                    AlbumId::from(model.album_id)
                ),
            }
        }
        Ok(details)
    }
}

#[async_trait]
impl CatalogRepository for CatalogRepositoryImpl {
    async fn song_exists(&self, id: &SongId) -> Result<bool, CatalogError> {
        let count = song::Entity::find_by_id(id.as_i64())
            .count(&self.db)
            .await
            .map_err(catalog_err)?;
        Ok(count > 0)
    }

    async fn find_song_detail(&self, id: &SongId) -> Result<Option<SongDetail>, CatalogError> {
        let Some(model) = song::Entity::find_by_id(id.as_i64())
            .one(&self.db)
            .await
            .map_err(catalog_err)?
        else {
            return Ok(None);
        };
        Ok(self.load_details(vec![model]).await?.into_iter().next())
    }

    async fn random_song_ids(&self, limit: u64) -> Result<Vec<SongId>, CatalogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = song::Entity::find()
            .select_only()
            .column(song::Column::Id)
            .order_by(Expr::cust("RANDOM()"), Order::Asc)
            .limit(limit)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(catalog_err)?;
        Ok(ids.into_iter().map(SongId::from).collect())
    }

    async fn list_song_details(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SongDetail>, CatalogError> {
        let songs = song::Entity::find()
            .order_by_asc(song::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(catalog_err)?;
        self.load_details(songs).await
    }

    async fn count_songs(&self) -> Result<u64, CatalogError> {
        song::Entity::find()
            .count(&self.db)
            .await
            .map_err(catalog_err)
    }
}
