#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod autofill;
mod config;
mod cover;
mod db;
mod env;
mod error;
mod models;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::sync::{Arc, Mutex};

use api::account::{
    api_get_profile, api_login, api_logout, api_me, api_signup, api_update_profile,
};
use api::admin::api_list_accounts;
use api::catalog::{api_cover_types, api_courses, api_departments, api_teachers};
use api::cover::api_cover_preview;
use api::export::{api_export_group, api_export_single};
use api::form::{api_form_commit, api_form_edit, api_form_initial, api_form_suggestions};
use api::groups::{
    api_create_group, api_delete_group, api_get_group, api_get_groups, api_update_group,
};
use api::health;
use api::history::{api_add_history, api_delete_history, api_get_history, api_reopen_history};
use api::memory::{api_get_memory, api_save_form_snapshot};
use api::pairings::{api_get_pairings, api_put_pairing};
use auth::{forbidden_api, not_found_api, unauthorized_api};
use config::AppConfig;
use cover::{ChromeRasterizer, Exporter};
use db::{clean_expired_sessions, clean_stale_device_cache};
use error::AppError;
use once_cell::sync::Lazy;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, tokio};
use sqlx::SqlitePool;
use telemetry::{OtelGuard, TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::{error, info};

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

async fn prepare() -> Result<(SqlitePool, AppConfig), Error> {
    let config: AppConfig = rocket::Config::figment().extract()?;

    let pool = SqlitePool::connect(&config.database_url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(AppError::from)?;
    info!("Migrations completed successfully");

    Ok((pool, config))
}

#[launch]
async fn rocket() -> _ {
    if let Err(e) = env::load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    if let Ok(mut slot) = TELEMETRY_GUARD.lock() {
        *slot = init_tracing();
    }

    let (pool, config) = match prepare().await {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("Start-up failed: {}", e);
            panic!("Start-up failed: {}", e);
        }
    };

    let pool_clone = pool.clone();
    let device_cache_ttl = chrono::Duration::days(config.device_cache_days);

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            let cutoff = (chrono::Utc::now() - device_cache_ttl).naive_utc();
            match clean_stale_device_cache(&pool_clone, cutoff).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Removed {} stale device cache rows", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean device cache: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    let rasterizer = ChromeRasterizer::detect(config.chrome_path.clone()).await;
    let exporter = Exporter::new(Arc::new(rasterizer), config.settle_delay());

    init_rocket(pool, config, exporter).await
}

pub async fn init_rocket(pool: SqlitePool, config: AppConfig, exporter: Exporter) -> Rocket<Build> {
    info!("Starting cover page generator");

    rocket::build()
        .manage(pool)
        .manage(config)
        .manage(exporter)
        .mount(
            "/api",
            routes![
                api_signup,
                api_login,
                api_logout,
                api_me,
                api_get_profile,
                api_update_profile,
                api_get_groups,
                api_get_group,
                api_create_group,
                api_update_group,
                api_delete_group,
                api_get_history,
                api_add_history,
                api_delete_history,
                api_reopen_history,
                api_get_pairings,
                api_put_pairing,
                api_list_accounts,
                api_form_edit,
                api_form_commit,
                api_form_suggestions,
                api_form_initial,
                api_get_memory,
                api_save_form_snapshot,
                api_departments,
                api_cover_types,
                api_teachers,
                api_courses,
                api_cover_preview,
                api_export_single,
                api_export_group,
            ],
        )
        .register(
            "/api",
            catchers![unauthorized_api, forbidden_api, not_found_api],
        )
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async { shutdown_telemetry() })
        }))
}
