use rocket::State;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};

use super::device_store;
use crate::auth::Device;
use crate::autofill::LocalMemory;
use crate::autofill::memory::{SavedCourse, SavedPairing, SavedStudent};
use crate::config::AppConfig;
use crate::models::FormData;
use crate::validation::{AppErrorExt, ValidationResponse};

#[derive(Serialize)]
pub struct MemoryResponse {
    pub courses: Vec<SavedCourse>,
    pub students: Vec<SavedStudent>,
    pub pairings: Vec<SavedPairing>,
}

#[get("/memory")]
pub async fn api_get_memory(
    device: Device,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Json<MemoryResponse> {
    let store = device_store(db, &device);
    let memory = LocalMemory::new(&store, config.memory_cap);

    Json(MemoryResponse {
        courses: memory.courses().await,
        students: memory.students().await,
        pairings: memory.pairings().await,
    })
}

#[derive(Deserialize)]
pub struct SnapshotRequest {
    form: FormData,
}

#[derive(Serialize)]
pub struct SnapshotResponse {
    pub saved: bool,
}

/// Keeps the in-progress form for the next visit from this browser.
#[put("/memory/form", data = "<request>")]
pub async fn api_save_form_snapshot(
    request: Json<SnapshotRequest>,
    device: Device,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<SnapshotResponse>, Custom<Json<ValidationResponse>>> {
    let store = device_store(db, &device);
    let memory = LocalMemory::new(&store, config.memory_cap);

    let saved = memory
        .save_form_snapshot(&request.form)
        .await
        .validate_custom()?;

    Ok(Json(SnapshotResponse { saved }))
}
