pub mod api;
pub mod auth;
pub mod consts;
pub mod middleware;

use application::auth::{AuthService, PasswordHasher, TokenService};
use application::command::index::IndexMaintenanceService;
use application::command::playlist::PlaylistAppService;
use application::command::shared::IdGenerator;
use application::command::song_rating::SongActivityAppService;
use application::error::AppError;
use application::query::get_playlist::GetPlaylist;
use application::query::recommend::SongRecommender;
use application::query::search::SongSearch;
use application::shared::SearchIndex;
use domain::activity::{SongRatingRepository, SongShareRepository};
use domain::catalog::CatalogRepository;
use domain::playlist::PlaylistRepository;
use domain::user::UserRepository;
use infra::auth::{AuthConfig, BcryptPasswordHasher, JwtTokenService};
use infra::config::AppConfigImpl;
use infra::repository::{
    CatalogRepositoryImpl, PlaylistRepositoryImpl, SongRatingRepositoryImpl,
    SongShareRepositoryImpl, UserRepositoryImpl,
};
use infra::{ElasticSearchIndex, SnowflakeIdGenerator};
use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement};
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub app_cfg: AppConfigImpl,
    pub db: DatabaseConnection,
    pub id_generator: Arc<dyn IdGenerator>,
    pub search_index: Arc<dyn SearchIndex>,
    pub token_svc: Arc<dyn TokenService>,
    pub auth: AuthService,
    pub playlists: PlaylistAppService,
    pub activity: SongActivityAppService,
    pub index_maintenance: IndexMaintenanceService,
    pub song_search: SongSearch,
    pub recommender: SongRecommender,
    pub get_playlist: GetPlaylist,
}

impl AppState {
    pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(32)
            .min_connections(4)
            .connect_timeout(Duration::from_secs(3))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(300))
            .sqlx_logging(false)
            .sqlx_logging_level(log::LevelFilter::Info);

        let db = Database::connect(opt).await?;

        db.execute(Statement::from_string(
            DbBackend::Postgres,
            "SELECT 1".to_owned(),
        ))
        .await?;

        info!("Database connection pool initialized successfully");
        Ok(db)
    }

    pub fn new(db: DatabaseConnection, app_cfg: AppConfigImpl) -> Result<Self, AppError> {
        let id_generator: Arc<dyn IdGenerator> =
            Arc::new(SnowflakeIdGenerator::new(app_cfg.node_id())?);
        let search_index: Arc<dyn SearchIndex> =
            Arc::new(ElasticSearchIndex::new(&app_cfg.search())?);

        let user_repo: Arc<dyn UserRepository> = Arc::new(UserRepositoryImpl::new(db.clone()));
        let catalog_repo: Arc<dyn CatalogRepository> =
            Arc::new(CatalogRepositoryImpl::new(db.clone()));
        let playlist_repo: Arc<dyn PlaylistRepository> =
            Arc::new(PlaylistRepositoryImpl::new(db.clone()));
        let rating_repo: Arc<dyn SongRatingRepository> =
            Arc::new(SongRatingRepositoryImpl::new(db.clone()));
        let share_repo: Arc<dyn SongShareRepository> =
            Arc::new(SongShareRepositoryImpl::new(db.clone()));

        let hasher: Arc<dyn PasswordHasher> =
            Arc::new(BcryptPasswordHasher::new(app_cfg.salt_cost()));
        let token_svc: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
            app_cfg.jwt_secret(),
            app_cfg.jwt_expire_secs(),
        ));

        let indices = app_cfg.index_names();
        let retry = app_cfg.retry_policy();

        let auth = AuthService::new(
            user_repo.clone(),
            hasher,
            token_svc.clone(),
            id_generator.clone(),
        );
        let playlists = PlaylistAppService::new(
            playlist_repo.clone(),
            catalog_repo.clone(),
            search_index.clone(),
            id_generator.clone(),
            indices.clone(),
            retry,
        );
        let activity = SongActivityAppService::new(
            rating_repo.clone(),
            share_repo,
            catalog_repo.clone(),
            user_repo,
            search_index.clone(),
            id_generator.clone(),
            indices.clone(),
            app_cfg.rating_range(),
            retry,
        );
        let index_maintenance = IndexMaintenanceService::new(
            search_index.clone(),
            catalog_repo.clone(),
            rating_repo,
            indices.clone(),
            retry,
        );
        let song_search = SongSearch::new(
            search_index.clone(),
            indices.clone(),
            app_cfg.search_settings(),
        );
        let recommender = SongRecommender::new(
            search_index.clone(),
            catalog_repo,
            indices,
            app_cfg.recommendation(),
        );
        let get_playlist = GetPlaylist::new(playlist_repo);

        Ok(Self {
            app_cfg,
            db,
            id_generator,
            search_index,
            token_svc,
            auth,
            playlists,
            activity,
            index_maintenance,
            song_search,
            recommender,
            get_playlist,
        })
    }
}
