pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_user_domain;
mod m20240101_000002_create_catalog_domain;
mod m20240101_000003_create_playlist_domain;
mod m20240101_000004_create_activity_domain;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_user_domain::Migration),
            Box::new(m20240101_000002_create_catalog_domain::Migration),
            Box::new(m20240101_000003_create_playlist_domain::Migration),
            Box::new(m20240101_000004_create_activity_domain::Migration),
        ]
    }
}
