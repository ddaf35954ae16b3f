use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{get_teacher_courses, upsert_teacher_course};
use crate::models::TeacherCoursePairing;
use crate::validation::{AppErrorExt, JsonValidateExt, ValidationResponse};

#[get("/pairings")]
pub async fn api_get_pairings(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<TeacherCoursePairing>>, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnPairings)
        .validate_custom()?;

    get_teacher_courses(db, user.id)
        .await
        .validate_custom()
        .map(Json)
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PairingRequest {
    #[validate(length(min = 1, message = "Course code is required"))]
    course_code: String,
    #[validate(length(min = 1, message = "Teacher name is required"))]
    teacher_name: String,
}

#[put("/pairings", data = "<pairing>")]
pub async fn api_put_pairing(
    pairing: Json<PairingRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ManageOwnPairings)
        .validate_custom()?;

    let validated = pairing.validate_custom()?;

    upsert_teacher_course(
        db,
        user.id,
        validated.course_code.trim(),
        validated.teacher_name.trim(),
    )
    .await
    .validate_custom()?;

    Ok(Status::Ok)
}
