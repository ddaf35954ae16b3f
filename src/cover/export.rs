use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::pdf::A4Document;
use super::sheet::{CoverSheet, export_filename, render_html, roll_label};
use crate::error::AppError;
use crate::models::{FormData, Group, Member};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("rasterizer unavailable: {0}")]
    RasterizerUnavailable(String),

    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("image conversion failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("pdf assembly failed: {0}")]
    Pdf(String),

    #[error("archive failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExportError> for AppError {
    fn from(error: ExportError) -> Self {
        match error {
            ExportError::RasterizerUnavailable(_) | ExportError::Rasterize(_) => {
                AppError::ExternalService(error.to_string())
            }
            _ => AppError::Internal(error.to_string()),
        }
    }
}

/// One rendered cover as a baseline JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Turns cover HTML into a page image.
///
/// `Ok(None)` means there was nothing to capture; that page is skipped
/// rather than failing the whole export.
#[rocket::async_trait]
pub trait CoverRasterizer: Send + Sync {
    async fn rasterize(&self, html: &str) -> Result<Option<PageImage>, ExportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Everything printed for a member: the shared form with their identity swapped in.
pub fn member_form(form: &FormData, member: &Member) -> FormData {
    let mut substituted = form.clone();
    substituted.student_name = member.name.clone();
    substituted.student_roll = member.roll.clone();
    if !member.section.is_empty() {
        substituted.section = member.section.clone();
    }
    substituted
}

/// Owner of the render cycle. One export at a time; within an export,
/// members are rendered strictly in their stored order.
pub struct Exporter {
    rasterizer: Arc<dyn CoverRasterizer>,
    render_slot: Mutex<()>,
    settle_delay: Duration,
}

impl Exporter {
    pub fn new(rasterizer: Arc<dyn CoverRasterizer>, settle_delay: Duration) -> Self {
        Self {
            rasterizer,
            render_slot: Mutex::new(()),
            settle_delay,
        }
    }

    async fn render_page(&self, form: &FormData) -> Result<Option<PageImage>, ExportError> {
        let html = render_html(&CoverSheet::from_form(form));
        tokio::time::sleep(self.settle_delay).await;
        self.rasterizer.rasterize(&html).await
    }

    #[instrument(skip_all, fields(course_code = %form.course_code))]
    pub async fn export_single(&self, form: &FormData) -> Result<Option<ExportFile>, ExportError> {
        let _slot = self.render_slot.lock().await;

        let Some(page) = self.render_page(form).await? else {
            warn!("Cover render target missing, no file produced");
            return Ok(None);
        };

        let bytes = A4Document::from_pages(vec![page]).to_bytes()?;
        Ok(Some(ExportFile {
            filename: export_filename(form, roll_label(form)),
            bytes,
        }))
    }

    #[instrument(skip_all, fields(group_id = group.id, members = group.members.len()))]
    pub async fn export_group_merged(
        &self,
        form: &FormData,
        group: &Group,
    ) -> Result<Option<ExportFile>, ExportError> {
        if group.members.is_empty() {
            return Ok(None);
        }

        let _slot = self.render_slot.lock().await;
        let mut document = A4Document::new();

        for (position, member) in group.members.iter().enumerate() {
            match self.render_page(&member_form(form, member)).await? {
                Some(page) => document.push(page),
                None => warn!(position, roll = %member.roll, "Skipping member with no rendered page"),
            }
        }

        if document.page_count() == 0 {
            return Ok(None);
        }

        info!(pages = document.page_count(), "Merged group cover assembled");
        Ok(Some(ExportFile {
            filename: export_filename(form, &group.name),
            bytes: document.to_bytes()?,
        }))
    }

    #[instrument(skip_all, fields(group_id = group.id, members = group.members.len()))]
    pub async fn export_group_separate(
        &self,
        form: &FormData,
        group: &Group,
    ) -> Result<Vec<ExportFile>, ExportError> {
        let _slot = self.render_slot.lock().await;
        let mut files = Vec::with_capacity(group.members.len());

        for (position, member) in group.members.iter().enumerate() {
            let substituted = member_form(form, member);
            match self.render_page(&substituted).await? {
                Some(page) => files.push(ExportFile {
                    filename: export_filename(&substituted, roll_label(&substituted)),
                    bytes: A4Document::from_pages(vec![page]).to_bytes()?,
                }),
                None => warn!(position, roll = %member.roll, "Skipping member with no rendered page"),
            }
        }

        Ok(files)
    }
}

/// Zips per-member PDFs. Repeated names get a numeric suffix.
pub fn bundle_zip(files: &[ExportFile]) -> Result<Vec<u8>, ExportError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut used = HashSet::new();

    for file in files {
        let mut name = file.filename.clone();
        let mut n = 2;
        while !used.insert(name.clone()) {
            let stem = file.filename.trim_end_matches(".pdf");
            name = format!("{}_{}.pdf", stem, n);
            n += 1;
        }

        writer.start_file(name, options)?;
        writer.write_all(&file.bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}
