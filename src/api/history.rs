use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use tracing::warn;

use crate::auth::{Permission, User};
use crate::db::{add_history, delete_history, get_group, get_history, get_history_entry};
use crate::models::{FormData, GroupTag, HistoryEntry};
use crate::validation::{AppErrorExt, ValidationResponse};

/// History is a convenience record: a failed write is logged and dropped.
pub(crate) async fn record_best_effort(
    db: &Pool<Sqlite>,
    user: Option<&User>,
    form: &FormData,
    group: Option<&GroupTag>,
) {
    let Some(user) = user else {
        return;
    };

    if let Err(err) = add_history(db, user.id, form, group).await {
        warn!(user_id = %user.id, error = %err, "Could not record history entry");
    }
}

#[get("/history")]
pub async fn api_get_history(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<HistoryEntry>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnHistory)
        .validate_custom()?;

    get_history(db, user.id).await.validate_custom().map(Json)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    form: FormData,
    group_id: Option<i64>,
}

#[derive(Serialize)]
pub struct HistoryCreated {
    pub id: i64,
}

/// The print action: records what was printed without producing a file.
#[post("/history", data = "<request>")]
pub async fn api_add_history(
    request: Json<HistoryRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<HistoryCreated>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnHistory)
        .validate_custom()?;

    let request = request.into_inner();
    let tag = match request.group_id {
        Some(group_id) => {
            let group = get_group(db, user.id, group_id).await.validate_custom()?;
            Some(GroupTag {
                group_id: group.id,
                group_name: group.name,
                member_count: group.members.len() as i64,
            })
        }
        None => None,
    };

    let id = add_history(db, user.id, &request.form, tag.as_ref())
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(HistoryCreated { id })))
}

#[delete("/history/<id>")]
pub async fn api_delete_history(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnHistory)
        .validate_custom()?;

    delete_history(db, user.id, id).await.validate_custom()?;
    Ok(Status::NoContent)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReopenResponse {
    pub form: FormData,
    pub group_id: Option<i64>,
}

/// What the form should load to regenerate an earlier cover.
#[get("/history/<id>/reopen")]
pub async fn api_reopen_history(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ReopenResponse>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnHistory)
        .validate_custom()?;

    let entry = get_history_entry(db, user.id, id).await.validate_custom()?;

    Ok(Json(ReopenResponse {
        group_id: entry.group_id.filter(|_| entry.is_group),
        form: entry.form,
    }))
}
