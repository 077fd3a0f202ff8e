use crate::types::{ApiError, ValidationError};
use chrono::Utc;
use log::{info, warn};
use rocket::fs::TempFile;
use rocket::http::ContentType;
use rocket::request::{self, FlashMessage, FromRequest, Outcome, Request};
use rocket::response::Redirect;
use std::path::Path;

/// Flash message as handed to the templates.
#[derive(Debug, Serialize)]
pub struct FlashView {
    pub kind: String,
    pub message: String,
}

impl FlashView {
    pub fn from_flash(flash: Option<FlashMessage<'_>>) -> Option<FlashView> {
        flash.map(|flash| FlashView {
            kind: flash.kind().to_string(),
            message: flash.message().to_string(),
        })
    }
}

/// Where "redirect back" goes: the `Referer` of the request, or the site root.
pub fn back(req: &Request) -> String {
    req.headers()
        .get_one("Referer")
        .filter(|referer| !referer.is_empty())
        .unwrap_or("/")
        .to_string()
}

/// Request guard carrying the page the request came from.
pub struct Back(pub String);

impl Back {
    pub fn redirect(self) -> Redirect {
        Redirect::to(self.0)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Back {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        Outcome::Success(Back(back(request)))
    }
}

/// File extension for the image types we serve back. Anything else, SVG
/// included, could be rendered as an active document.
fn image_extension(content_type: Option<&ContentType>) -> Option<&'static str> {
    match content_type {
        Some(ct) if ct.is_png() => Some("png"),
        Some(ct) if ct.is_jpeg() => Some("jpg"),
        Some(ct) if ct.is_gif() => Some("gif"),
        Some(ct) if ct.is_webp() => Some("webp"),
        _ => None,
    }
}

/// Copies an uploaded image into `upload_dir` and returns the public path it
/// is served under. An empty file field yields `None`.
pub async fn relocate_upload(
    file: &mut TempFile<'_>,
    upload_dir: &Path,
    owner_id: i32,
) -> Result<Option<String>, ApiError> {
    if file.len() == 0 {
        return Ok(None);
    }

    let extension = image_extension(file.content_type()).ok_or_else(|| {
        ValidationError::from("image", "Image must be a PNG, JPEG, GIF or WebP file!")
    })?;
    let file_name = format!("{}-{}.{}", owner_id, Utc::now().timestamp_millis(), extension);

    file.copy_to(upload_dir.join(&file_name)).await?;
    info!("stored upload {} for user {}", file_name, owner_id);
    Ok(Some(format!("/upload/{}", file_name)))
}

/// Removes an upload stored by `relocate_upload` whose record was never saved.
pub async fn discard_upload(upload_dir: &Path, public_path: &str) {
    let file_name = match public_path.strip_prefix("/upload/") {
        Some(name) if !name.is_empty() && !name.contains('/') => name,
        _ => return,
    };
    if let Err(e) = rocket::tokio::fs::remove_file(upload_dir.join(file_name)).await {
        warn!("could not remove upload {}: {}", file_name, e);
    }
}
