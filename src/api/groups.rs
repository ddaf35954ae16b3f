use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, json::Json};
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::autofill::roll::section_from_roll;
use crate::db::{create_group, delete_group, get_group, get_groups, update_group};
use crate::models::{Group, Member};
use crate::validation::{AppErrorExt, ValidationResponse};

/// Trims members, drops rows with neither name nor roll and lets the roll
/// decide the section when it can. Order is kept.
pub fn normalize_members(members: Vec<Member>) -> Vec<Member> {
    members
        .into_iter()
        .map(|m| Member {
            name: m.name.trim().to_string(),
            roll: m.roll.trim().to_string(),
            section: m.section.trim().to_string(),
        })
        .filter(|m| !m.name.is_empty() || !m.roll.is_empty())
        .map(|mut m| {
            // A section the user typed is a correction and is kept.
            if m.section.is_empty() {
                if let Some(section) = section_from_roll(&m.roll) {
                    m.section = section.to_string();
                }
            }
            m
        })
        .collect()
}

fn blank_name() -> Custom<Json<ValidationResponse>> {
    Custom(
        Status::UnprocessableEntity,
        Json(ValidationResponse::with_error("name", "Group name is required")),
    )
}

#[get("/groups")]
pub async fn api_get_groups(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Group>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnGroups)
        .validate_custom()?;

    get_groups(db, user.id).await.validate_custom().map(Json)
}

#[get("/groups/<id>")]
pub async fn api_get_group(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Group>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnGroups)
        .validate_custom()?;

    get_group(db, user.id, id).await.validate_custom().map(Json)
}

#[derive(Deserialize)]
pub struct NewGroupRequest {
    name: String,
}

#[post("/groups", data = "<group>")]
pub async fn api_create_group(
    group: Json<NewGroupRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Group>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnGroups)
        .validate_custom()?;

    let name = group.name.trim();
    if name.is_empty() {
        return Err(blank_name());
    }

    let created = create_group(db, user.id, name).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(created)))
}

#[derive(Deserialize)]
pub struct GroupUpdateRequest {
    name: Option<String>,
    members: Option<Vec<Member>>,
}

#[put("/groups/<id>", data = "<update>")]
pub async fn api_update_group(
    id: i64,
    update: Json<GroupUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Group>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnGroups)
        .validate_custom()?;

    let update = update.into_inner();
    let name = update.name.as_deref().map(str::trim);
    if name.is_some_and(str::is_empty) {
        return Err(blank_name());
    }

    let members = update.members.map(normalize_members);

    update_group(db, user.id, id, name, members.as_deref())
        .await
        .validate_custom()
        .map(Json)
}

#[delete("/groups/<id>")]
pub async fn api_delete_group(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnGroups)
        .validate_custom()?;

    delete_group(db, user.id, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
