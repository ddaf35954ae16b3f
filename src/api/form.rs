use std::collections::HashMap;

use rocket::State;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, json::Json};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

use super::{device_store, requested_group};
use crate::auth::{AuthContext, Device};
use crate::autofill::form::initial_form;
use crate::autofill::providers::RemotePairingProvider;
use crate::autofill::reconcile::{Committed, Reconciled, persist};
use crate::autofill::suggest::{candidate_pool, filter_suggestions};
use crate::autofill::{LocalMemory, Reconciler};
use crate::config::AppConfig;
use crate::db::get_profile;
use crate::models::{Field, FormData};
use crate::validation::ValidationResponse;

async fn remote_pairings(db: &Pool<Sqlite>, auth: &AuthContext) -> RemotePairingProvider {
    match auth.user() {
        Some(user) => RemotePairingProvider::load(db, user.id).await,
        None => RemotePairingProvider::default(),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    form: FormData,
    field: Field,
    #[serde(default)]
    value: String,
    group_id: Option<i64>,
}

/// One keystroke-level edit: the edited field takes `value` and every field
/// that depends on it is brought back in line.
#[post("/form/edit", data = "<request>")]
pub async fn api_form_edit(
    request: Json<EditRequest>,
    auth: AuthContext,
    device: Device,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<Reconciled>, Custom<Json<ValidationResponse>>> {
    let request = request.into_inner();
    let group = requested_group(db, &auth, request.group_id).await?;

    let store = device_store(db, &device);
    let memory = LocalMemory::new(&store, config.memory_cap);

    let mut reconciler =
        Reconciler::new(memory).with_remote_pairings(remote_pairings(db, &auth).await);
    if let Some(group) = &group {
        reconciler = reconciler.in_group(&group.members);
    }

    Ok(Json(
        reconciler
            .apply_edit(&request.form, request.field, &request.value)
            .await,
    ))
}

#[derive(Deserialize)]
pub struct CommitRequest {
    form: FormData,
    field: Field,
}

/// The blur step. Memory writes are best-effort, so the formatted form always
/// comes back.
#[post("/form/commit", data = "<request>")]
pub async fn api_form_commit(
    request: Json<CommitRequest>,
    auth: AuthContext,
    device: Device,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Json<Committed> {
    let store = device_store(db, &device);
    let memory = LocalMemory::new(&store, config.memory_cap);

    let committed = Reconciler::new(memory).commit(&request.form, request.field);
    let remote = auth.user().map(|user| (db.inner(), user.id));

    persist(&committed.actions, &memory, remote).await;

    Json(committed)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    form: FormData,
    field: Field,
    #[serde(default)]
    query: String,
    group_id: Option<i64>,
}

#[post("/form/suggestions", data = "<request>")]
pub async fn api_form_suggestions(
    request: Json<SuggestionRequest>,
    auth: AuthContext,
    device: Device,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<Vec<String>>, Custom<Json<ValidationResponse>>> {
    let request = request.into_inner();
    let group = requested_group(db, &auth, request.group_id).await?;

    let store = device_store(db, &device);
    let memory = LocalMemory::new(&store, config.memory_cap);

    let mut reconciler = Reconciler::new(memory);
    if let Some(group) = &group {
        reconciler = reconciler.in_group(&group.members);
    }
    let filter = reconciler.filter(&request.form);

    let pool = candidate_pool(request.field, &request.form, filter.as_ref(), &memory).await;
    Ok(Json(filter_suggestions(&pool, &request.query)))
}

/// The form a session opens with. Query fields named after form fields
/// (for example `courseCode=EEE%203100`) override everything else.
#[get("/form/initial?<overrides..>")]
pub async fn api_form_initial(
    overrides: HashMap<String, String>,
    auth: AuthContext,
    device: Device,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Json<FormData> {
    let store = device_store(db, &device);
    let memory = LocalMemory::new(&store, config.memory_cap);
    let snapshot = memory.form_snapshot().await;

    let profile = match auth.user() {
        Some(user) => match get_profile(db, user.id).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "Profile unavailable for initial form");
                None
            }
        },
        None => None,
    };

    info!(
        has_snapshot = snapshot.is_some(),
        has_profile = profile.is_some(),
        overrides = overrides.len(),
        "Building initial form"
    );

    Json(initial_form(snapshot, profile.as_ref(), &overrides))
}
