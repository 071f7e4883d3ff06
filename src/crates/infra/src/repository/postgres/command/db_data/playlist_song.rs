use chrono::Utc;
use domain::playlist::PlaylistEntry;
use domain::value::{PlaylistId, PlaylistSongId, SongId};
use sea_orm::{entity::prelude::*, ActiveValue::Set};

/// 播放列表成员，(playlist_id, song_id) 上有唯一索引
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "playlist_song")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub playlist_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub song_id: i64,
    pub added_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Playlist,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Playlist => Entity::belongs_to(super::playlist::Entity)
                .from(Column::PlaylistId)
                .to(super::playlist::Column::Id)
                .into(),
        }
    }
}

impl Related<super::playlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Playlist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new_entry(id: &PlaylistSongId, playlist_id: &PlaylistId, song_id: &SongId) -> Self {
        ActiveModel {
            id: Set(id.as_i64()),
            playlist_id: Set(playlist_id.as_i64()),
            song_id: Set(song_id.as_i64()),
            added_at: Set(Utc::now().naive_utc()),
        }
    }
}

impl From<Model> for PlaylistEntry {
    fn from(model: Model) -> Self {
        PlaylistEntry {
            id: PlaylistSongId::from(model.id),
            song_id: SongId::from(model.song_id),
        }
    }
}
