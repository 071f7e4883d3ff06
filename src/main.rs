use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use std::io;

use infra::config::AppConfigImpl;
use log::{error, info};
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use server::middleware::{jwt_verify::JwtVerifier, other};

fn init_logging() -> io::Result<()> {
    // 日志同时输出到控制台和文件
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {m}{n}",
        )))
        .build("app.log")?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .appender(Appender::builder().build("stdout", Box::new(ConsoleAppender::builder().build())))
        .build(
            Root::builder()
                .appender("file")
                .appender("stdout")
                .build(log_level.parse().unwrap_or(log::LevelFilter::Info)),
        )
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    log4rs::init_config(config).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    init_logging()?;

    let cfg = AppConfigImpl::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let server_cfg = cfg.server();
    let db = server::AppState::init_db(&cfg.database_url())
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;

    let app_state = server::AppState::new(db, cfg)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    // 索引缺失时创建；搜索服务不可用不阻止启动
    match app_state.index_maintenance.ensure_indices().await {
        Ok(created) if !created.is_empty() => info!("created search indices: {:?}", created),
        Ok(_) => {}
        Err(e) => error!("failed to ensure search indices: {}", e),
    }

    let token_svc = app_state.token_svc.clone();
    let app_state = web::Data::new(app_state);
    info!("listening on {}:{}", server_cfg.host, server_cfg.port);
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            // 注册与登录不需要 JWT 验证
            .service(server::auth::configure_service())
            .service(
                web::scope("/api")
                    .configure(server::api::configure_service)
                    .wrap(JwtVerifier::new(token_svc.clone())),
            )
            .wrap(other::cors())
    })
    .bind((server_cfg.host.as_str(), server_cfg.port))?
    .run()
    .await
}
