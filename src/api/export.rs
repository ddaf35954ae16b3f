use rocket::Responder;
use rocket::State;
use rocket::http::{ContentType, Header};
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, json::Json};
use sqlx::{Pool, Sqlite};
use tracing::info;

use super::history::record_best_effort;
use crate::auth::{AuthContext, Permission, User};
use crate::cover::export::bundle_zip;
use crate::cover::sheet::export_filename;
use crate::cover::{ExportFile, Exporter};
use crate::db::get_group;
use crate::error::AppError;
use crate::models::{FormData, GroupTag};
use crate::validation::{AppErrorExt, ValidationResponse};

#[derive(Responder)]
pub enum ExportResponse {
    File(Vec<u8>, ContentType, Header<'static>),
    #[response(status = 204)]
    Empty(()),
}

impl ExportResponse {
    fn attachment(bytes: Vec<u8>, content_type: ContentType, filename: &str) -> Self {
        ExportResponse::File(
            bytes,
            content_type,
            Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        )
    }

    fn pdf(file: ExportFile) -> Self {
        Self::attachment(file.bytes, ContentType::PDF, &file.filename)
    }
}

#[derive(Deserialize)]
pub struct SingleExportRequest {
    form: FormData,
}

#[post("/export/single", data = "<request>")]
pub async fn api_export_single(
    request: Json<SingleExportRequest>,
    auth: AuthContext,
    exporter: &State<Exporter>,
    db: &State<Pool<Sqlite>>,
) -> Result<ExportResponse, Custom<Json<ValidationResponse>>> {
    let form = request.into_inner().form;

    let file = exporter
        .export_single(&form)
        .await
        .map_err(AppError::from)
        .validate_custom()?;

    record_best_effort(db, auth.user(), &form, None).await;

    Ok(match file {
        Some(file) => ExportResponse::pdf(file),
        None => ExportResponse::Empty(()),
    })
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    #[default]
    Merged,
    Separate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExportRequest {
    form: FormData,
    group_id: i64,
    #[serde(default)]
    mode: ExportMode,
}

/// Covers for every member of a group, as one merged PDF or a zip of
/// per-member PDFs. The batch is recorded as a single history entry.
#[post("/export/group", data = "<request>")]
pub async fn api_export_group(
    request: Json<GroupExportRequest>,
    user: User,
    exporter: &State<Exporter>,
    db: &State<Pool<Sqlite>>,
) -> Result<ExportResponse, Custom<Json<ValidationResponse>>> {
    user.require_permission(Permission::ExportCovers)
        .validate_custom()?;

    let request = request.into_inner();
    let group = get_group(db, user.id, request.group_id)
        .await
        .validate_custom()?;

    if group.members.is_empty() {
        info!(group_id = group.id, "Group has no members, nothing to export");
        return Ok(ExportResponse::Empty(()));
    }

    let response = match request.mode {
        ExportMode::Merged => exporter
            .export_group_merged(&request.form, &group)
            .await
            .map_err(AppError::from)
            .validate_custom()?
            .map(ExportResponse::pdf),
        ExportMode::Separate => {
            let files = exporter
                .export_group_separate(&request.form, &group)
                .await
                .map_err(AppError::from)
                .validate_custom()?;

            if files.is_empty() {
                None
            } else {
                let archive = bundle_zip(&files)
                    .map_err(AppError::from)
                    .validate_custom()?;
                let name = format!(
                    "{}.zip",
                    export_filename(&request.form, &group.name).trim_end_matches(".pdf")
                );
                Some(ExportResponse::attachment(archive, ContentType::ZIP, &name))
            }
        }
    };

    let tag = GroupTag {
        group_id: group.id,
        group_name: group.name.clone(),
        member_count: group.members.len() as i64,
    };
    record_best_effort(db, Some(&user), &request.form, Some(&tag)).await;

    Ok(response.unwrap_or(ExportResponse::Empty(())))
}
