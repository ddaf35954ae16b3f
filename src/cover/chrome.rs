use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::export::{CoverRasterizer, ExportError, PageImage};

/// A4 at 96 dpi, in CSS pixels.
const VIEWPORT: (u32, u32) = (794, 1123);
const SCALE: u32 = 3;
const JPEG_QUALITY: u8 = 98;

const CANDIDATES: [&str; 5] = [
    "google-chrome",
    "chrome",
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
];

/// Screenshots cover HTML with a headless Chrome or Chromium.
pub struct ChromeRasterizer {
    binary: Option<String>,
    scratch_dir: PathBuf,
}

impl ChromeRasterizer {
    /// Uses `configured` when given, otherwise the first browser on `PATH`
    /// that answers `--version`.
    pub async fn detect(configured: Option<String>) -> Self {
        if configured.is_some() {
            return Self::with_binary(configured);
        }

        for candidate in CANDIDATES {
            let version = Command::new(candidate)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if matches!(version, Ok(status) if status.success()) {
                info!(browser = %candidate, "Using headless browser for cover export");
                return Self::with_binary(Some(candidate.to_string()));
            }
        }

        warn!("No Chrome/Chromium found; PDF export is unavailable");
        Self::with_binary(None)
    }

    fn with_binary(binary: Option<String>) -> Self {
        Self {
            binary,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Where the HTML and screenshot files live while a page is captured.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn scratch_path(&self, extension: &str) -> PathBuf {
        self.scratch_dir
            .join(format!("labcover_{}.{}", Uuid::new_v4(), extension))
    }

    /// Writes the page, runs the browser and reads the screenshot back.
    async fn capture(
        &self,
        binary: &str,
        html: &str,
        html_path: &Path,
        png_path: &Path,
    ) -> Result<Option<Vec<u8>>, ExportError> {
        tokio::fs::write(html_path, html).await?;
        self.screenshot(binary, html_path, png_path).await?;

        match tokio::fs::read(png_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Browser produced no screenshot");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn screenshot(&self, binary: &str, html: &Path, png: &Path) -> Result<(), ExportError> {
        let status = Command::new(binary)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--hide-scrollbars")
            .arg("--run-all-compositor-stages-before-draw")
            .arg(format!("--force-device-scale-factor={}", SCALE))
            .arg(format!("--window-size={},{}", VIEWPORT.0, VIEWPORT.1))
            .arg(format!("--screenshot={}", png.display()))
            .arg(format!("file://{}", html.display()))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ExportError::RasterizerUnavailable(format!(
                    "{} is not installed",
                    binary
                )),
                _ => ExportError::Rasterize(e.to_string()),
            })?;

        if !status.success() {
            return Err(ExportError::Rasterize(format!(
                "{} exited with {}",
                binary, status
            )));
        }
        Ok(())
    }
}

/// PNG screenshot to RGB JPEG.
pub fn png_to_jpeg(png: &[u8]) -> Result<PageImage, ExportError> {
    let decoded = image::load_from_memory_with_format(png, ImageFormat::Png)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode(
        rgb.as_raw(),
        width,
        height,
        image::ColorType::Rgb8,
    )?;

    Ok(PageImage {
        jpeg,
        width,
        height,
    })
}

#[rocket::async_trait]
impl CoverRasterizer for ChromeRasterizer {
    async fn rasterize(&self, html: &str) -> Result<Option<PageImage>, ExportError> {
        let Some(binary) = self.binary.as_deref() else {
            return Err(ExportError::RasterizerUnavailable(
                "no Chrome/Chromium browser configured".to_string(),
            ));
        };

        let html_path = self.scratch_path("html");
        let png_path = self.scratch_path("png");

        let captured = self.capture(binary, html, &html_path, &png_path).await;
        for path in [&html_path, &png_path] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Could not remove scratch file");
                }
            }
        }

        captured?.map(|png| png_to_jpeg(&png)).transpose()
    }
}
