use domain::playlist::Playlist;
use domain::value::{PlaylistId, UserId};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "playlist")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_type = "BigInteger")]
    pub owner_id: i64,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    PlaylistSong,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::PlaylistSong => Entity::has_many(super::playlist_song::Entity)
                .from(Column::Id)
                .to(super::playlist_song::Column::PlaylistId)
                .into(),
        }
    }
}

impl Related<super::playlist_song::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaylistSong.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Playlist> for ActiveModel {
    fn from(playlist: &Playlist) -> Self {
        Self {
            id: Set(playlist.id.as_i64()),
            name: Set(playlist.name.clone()),
            owner_id: Set(playlist.owner_id.as_i64()),
            created_at: Set(playlist.created_at),
        }
    }
}

impl From<Model> for Playlist {
    fn from(model: Model) -> Self {
        Playlist {
            id: PlaylistId::from(model.id),
            name: model.name,
            owner_id: UserId::from(model.owner_id),
            entries: Vec::new(),
            created_at: model.created_at,
        }
    }
}
