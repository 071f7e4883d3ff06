use domain::activity::SongShare;
use sea_orm::entity::prelude::*;
use sea_orm::Set;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "song_share")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[sea_orm(column_type = "BigInteger")]
    pub id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub from_user_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub to_user_id: i64,
    #[sea_orm(column_type = "BigInteger")]
    pub song_id: i64,
    pub shared_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SongShare> for ActiveModel {
    fn from(share: &SongShare) -> Self {
        Self {
            id: Set(share.id.as_i64()),
            from_user_id: Set(share.from_user_id.as_i64()),
            to_user_id: Set(share.to_user_id.as_i64()),
            song_id: Set(share.song_id.as_i64()),
            shared_at: Set(share.shared_at),
        }
    }
}
