use super::db_data::{
    playlist::{self, ActiveModel, Entity, Model},
    playlist_song::{self, ActiveModel as EntryActiveModel, Entity as EntryEntity},
};
use crate::repository::postgres::StoreFailure;
use async_trait::async_trait;
use domain::playlist::{Playlist, PlaylistEntry, PlaylistError, PlaylistRepository};
use domain::value::{PlaylistId, PlaylistSongId, SongId, UserId};
use log::debug;
use sea_orm::*;

/// 与迁移中的外键名一致
const FK_ENTRY_SONG: &str = "fk_playlist_song_song";

fn playlist_err(e: DbErr) -> PlaylistError {
    match StoreFailure::from(e) {
        StoreFailure::Unavailable(msg) => PlaylistError::Unavailable(msg),
        StoreFailure::UniqueViolation(msg)
        | StoreFailure::ForeignKeyViolation(msg)
        | StoreFailure::Other(msg) => PlaylistError::DbErr(msg),
    }
}

#[derive(Clone)]
pub struct PlaylistRepositoryImpl {
    db: DbConn,
}

impl PlaylistRepositoryImpl {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    async fn load_entries(&self, playlist_id: i64) -> Result<Vec<PlaylistEntry>, PlaylistError> {
        let entries = EntryEntity::find()
            .filter(playlist_song::Column::PlaylistId.eq(playlist_id))
            .order_by_asc(playlist_song::Column::AddedAt)
            .order_by_asc(playlist_song::Column::Id)
            .all(&self.db)
            .await
            .map_err(playlist_err)?;

        Ok(entries.into_iter().map(|m| m.into()).collect())
    }
}

#[async_trait]
impl PlaylistRepository for PlaylistRepositoryImpl {
    async fn find_by_id(&self, id: &PlaylistId) -> Result<Option<Playlist>, PlaylistError> {
        let result: Option<Model> = Entity::find_by_id(id.as_i64())
            .one(&self.db)
            .await
            .map_err(playlist_err)?;

        match result {
            Some(model) => {
                let mut playlist: Playlist = model.into();
                playlist.entries = self.load_entries(id.as_i64()).await?;
                Ok(Some(playlist))
            }
            None => Ok(None),
        }
    }

    async fn exists_by_owner_and_name(
        &self,
        owner_id: &UserId,
        name: &str,
    ) -> Result<bool, PlaylistError> {
        let count = Entity::find()
            .filter(playlist::Column::OwnerId.eq(owner_id.as_i64()))
            .filter(playlist::Column::Name.eq(name.trim()))
            .count(&self.db)
            .await
            .map_err(playlist_err)?;
        Ok(count > 0)
    }

    /// 播放列表行与成员行在同一事务中写入
    async fn insert(&self, playlist: &Playlist) -> Result<(), PlaylistError> {
        let txn = self.db.begin().await.map_err(playlist_err)?;

        let active_model: ActiveModel = playlist.into();
        if let Err(e) = Entity::insert(active_model).exec(&txn).await {
            return Err(match StoreFailure::from(e) {
                // (owner_id, name) 唯一索引
                StoreFailure::UniqueViolation(_) => {
                    PlaylistError::DuplicateName(playlist.name.clone())
                }
                StoreFailure::Unavailable(msg) => PlaylistError::Unavailable(msg),
                StoreFailure::ForeignKeyViolation(msg) | StoreFailure::Other(msg) => {
                    PlaylistError::DbErr(msg)
                }
            });
        }

        let entries: Vec<EntryActiveModel> = playlist
            .entries
            .iter()
            .map(|e| EntryActiveModel::new_entry(&e.id, &playlist.id, &e.song_id))
            .collect();
        if !entries.is_empty() {
            EntryEntity::insert_many(entries)
                .exec(&txn)
                .await
                .map_err(playlist_err)?;
        }

        txn.commit().await.map_err(playlist_err)?;
        debug!(
            "playlist {} inserted with {} songs",
            playlist.id,
            playlist.entries.len()
        );
        Ok(())
    }

    async fn delete(&self, id: &PlaylistId) -> Result<bool, PlaylistError> {
        let txn = self.db.begin().await.map_err(playlist_err)?;

        // 删除成员
        EntryEntity::delete_many()
            .filter(playlist_song::Column::PlaylistId.eq(id.as_i64()))
            .exec(&txn)
            .await
            .map_err(playlist_err)?;

        // 删除播放列表
        let result = Entity::delete_by_id(id.as_i64())
            .exec(&txn)
            .await
            .map_err(playlist_err)?;

        txn.commit().await.map_err(playlist_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn add_song(
        &self,
        entry_id: PlaylistSongId,
        id: &PlaylistId,
        song_id: &SongId,
    ) -> Result<(), PlaylistError> {
        let entry = EntryActiveModel::new_entry(&entry_id, id, song_id);
        match EntryEntity::insert(entry).exec(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) => Err(match StoreFailure::from(e) {
                StoreFailure::UniqueViolation(_) => PlaylistError::SongAlreadyPresent {
                    playlist_id: id.clone(),
                    song_id: song_id.clone(),
                },
                StoreFailure::ForeignKeyViolation(msg) if msg.contains(FK_ENTRY_SONG) => {
                    PlaylistError::DbErr(msg)
                }
                // 播放列表在检查之后被删除
                StoreFailure::ForeignKeyViolation(_) => PlaylistError::NotFound(id.clone()),
                StoreFailure::Unavailable(msg) => PlaylistError::Unavailable(msg),
                StoreFailure::Other(msg) => PlaylistError::DbErr(msg),
            }),
        }
    }

    async fn remove_song(&self, id: &PlaylistId, song_id: &SongId) -> Result<bool, PlaylistError> {
        let result = EntryEntity::delete_many()
            .filter(playlist_song::Column::PlaylistId.eq(id.as_i64()))
            .filter(playlist_song::Column::SongId.eq(song_id.as_i64()))
            .exec(&self.db)
            .await
            .map_err(playlist_err)?;
        Ok(result.rows_affected > 0)
    }
}
