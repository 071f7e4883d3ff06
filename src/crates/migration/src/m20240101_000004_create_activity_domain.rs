use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SongRating::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SongRating::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SongRating::UserId).big_integer().not_null())
                    .col(ColumnDef::new(SongRating::SongId).big_integer().not_null())
                    .col(ColumnDef::new(SongRating::Rating).integer().not_null())
                    .col(ColumnDef::new(SongRating::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_rating_user")
                            .from(SongRating::Table, SongRating::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_rating_song")
                            .from(SongRating::Table, SongRating::SongId)
                            .to(Song::Table, Song::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // upsert 依赖该唯一索引作为冲突目标
        manager
            .create_index(
                Index::create()
                    .name("uq_song_rating_user_song")
                    .table(SongRating::Table)
                    .col(SongRating::UserId)
                    .col(SongRating::SongId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_song_rating_song_id")
                    .table(SongRating::Table)
                    .col(SongRating::SongId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SongShare::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SongShare::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SongShare::FromUserId).big_integer().not_null())
                    .col(ColumnDef::new(SongShare::ToUserId).big_integer().not_null())
                    .col(ColumnDef::new(SongShare::SongId).big_integer().not_null())
                    .col(ColumnDef::new(SongShare::SharedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_share_from_user")
                            .from(SongShare::Table, SongShare::FromUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_share_to_user")
                            .from(SongShare::Table, SongShare::ToUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_song_share_song")
                            .from(SongShare::Table, SongShare::SongId)
                            .to(Song::Table, Song::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SongShare::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SongRating::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum SongRating {
    Table,
    Id,
    UserId,
    SongId,
    Rating,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SongShare {
    Table,
    Id,
    FromUserId,
    ToUserId,
    SongId,
    SharedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Song {
    Table,
    Id,
}
