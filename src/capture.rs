use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::Serialize;
use serde_json::json;

use crate::error_codes::{CodedError, UNKNOWN_EXPORT_FORMAT};
use crate::fonts::sha256_hex;
use crate::view::ChatView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// The bare chat container.
    ChatContainer,
    /// The chat inside a phone-shaped frame on a light matte.
    MobileFrame,
}

impl Region {
    pub fn for_view(view: &ChatView) -> Self {
        if view.mobile {
            Region::MobileFrame
        } else {
            Region::ChatContainer
        }
    }

    pub fn file_tag(self) -> &'static str {
        match self {
            Region::ChatContainer => "desktop",
            Region::MobileFrame => "mobile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    /// Straight (non-premultiplied) RGBA8.
    pub rgba: Vec<u8>,
}

impl CapturedImage {
    pub fn encode(&self, format: ExportFormat) -> Result<Vec<u8>> {
        let image = RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or_else(|| {
                anyhow!(
                    "failed to construct image buffer for {}x{} RGBA capture",
                    self.width,
                    self.height
                )
            })?;

        let mut out = Cursor::new(Vec::new());
        match format {
            ExportFormat::Png => DynamicImage::ImageRgba8(image)
                .write_to(&mut out, ImageFormat::Png)
                .context("failed to encode png")?,
            ExportFormat::Jpeg => {
                let flattened = flatten_onto_white(&image);
                DynamicImage::ImageRgb8(flattened)
                    .write_to(&mut out, ImageFormat::Jpeg)
                    .context("failed to encode jpeg")?
            }
        }
        Ok(out.into_inner())
    }
}

fn flatten_onto_white(image: &RgbaImage) -> image::RgbImage {
    image::RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let over = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

/// A supplier of raster snapshots for a chat view.
pub trait Capture {
    fn capture_region(&mut self, view: &ChatView, region: Region) -> Result<CapturedImage>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CodedError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            _ => Err(CodedError::usage(
                UNKNOWN_EXPORT_FORMAT,
                format!("unknown export format '{raw}'. Supported: png, jpeg"),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExportTarget {
    File(PathBuf),
    /// `{platform}-{desktop|mobile}-{unix_millis}.{ext}` inside the directory.
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub target: ExportTarget,
    pub format: Option<ExportFormat>,
    pub region: Region,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub region: Region,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    pub sha256: String,
}

pub fn export_conversation(
    capture: &mut dyn Capture,
    view: &ChatView,
    request: &ExportRequest,
) -> Result<ExportSummary> {
    let (path, format) = resolve_target(view, request)?;

    let captured = capture
        .capture_region(view, request.region)
        .map_err(|error| export_failure(&error, request.region))?;
    let encoded = captured
        .encode(format)
        .map_err(|error| export_failure(&error, request.region))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    fs::write(&path, &encoded)
        .with_context(|| format!("failed to write image {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        width = captured.width,
        height = captured.height,
        bytes = encoded.len(),
        "exported conversation image"
    );

    Ok(ExportSummary {
        path,
        region: request.region,
        format,
        width: captured.width,
        height: captured.height,
        bytes: encoded.len(),
        sha256: sha256_hex(&encoded),
    })
}

fn resolve_target(view: &ChatView, request: &ExportRequest) -> Result<(PathBuf, ExportFormat)> {
    match &request.target {
        ExportTarget::File(path) => {
            let format = request
                .format
                .or_else(|| ExportFormat::from_path(path))
                .unwrap_or_default();
            Ok((path.clone(), format))
        }
        ExportTarget::Directory(dir) => {
            let format = request.format.unwrap_or_default();
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .context("system clock is before the unix epoch")?
                .as_millis();
            let name = format!(
                "{}-{}-{}.{}",
                view.platform.slug(),
                request.region.file_tag(),
                millis,
                format.extension()
            );
            Ok((dir.join(name), format))
        }
    }
}

fn export_failure(error: &anyhow::Error, region: Region) -> anyhow::Error {
    let cause = format!("{error:#}");
    tracing::warn!(error = %cause, ?region, "conversation capture failed");
    CodedError::export(format!(
        "failed to capture conversation image ({cause}). Please try again."
    ))
    .with_details(json!({ "region": region }))
    .into()
}
