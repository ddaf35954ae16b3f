use rocket::State;
use sqlx::{Pool, Sqlite};

use crate::auth::{AuthContext, Device};
use crate::autofill::DeviceStore;
use crate::db::get_group;
use crate::error::AppError;
use crate::models::Group;
use crate::validation::{ApiError, AppErrorExt, ToValidationResponse};

pub mod account;
pub mod admin;
pub mod catalog;
pub mod cover;
pub mod export;
pub mod form;
pub mod groups;
pub mod history;
pub mod memory;
pub mod pairings;

/// The browser-local memory namespace for this request.
pub(crate) fn device_store(db: &State<Pool<Sqlite>>, device: &Device) -> DeviceStore {
    DeviceStore::new(db.inner().clone(), device.id.clone())
}

/// Loads the group a form request refers to. Groups belong to accounts, so
/// naming one while signed out is an authentication error.
pub(crate) async fn requested_group(
    db: &Pool<Sqlite>,
    auth: &AuthContext,
    group_id: Option<i64>,
) -> Result<Option<Group>, ApiError> {
    let Some(group_id) = group_id else {
        return Ok(None);
    };

    let Some(user) = auth.user() else {
        return Err(
            AppError::Authentication("Sign in to use groups".to_string()).to_validation_response(),
        );
    };

    get_group(db, user.id, group_id)
        .await
        .map(Some)
        .validate_custom()
}

#[get("/health")]
pub async fn health() -> &'static str {
    "OK"
}
