//! Content reader: bounded text and scaled image previews

use crate::error::{BrowseError, Result};
use crate::job::{JobOutcome, JobToken};
use crate::view::PreviewImage;
use crate::PreviewConfig;
use app_fs::{Entry, EncodingHint, FileType};
use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;

/// Longest UTF-8 encoding of one character
const MAX_CHAR_BYTES: usize = 4;

/// Read the first `max_chars` characters of a file
pub fn read_text(entry: &Entry, max_chars: usize, hint: EncodingHint, token: &JobToken) -> Result<String> {
    token.check()?;
    let head = app_fs::read_head(entry, max_chars.saturating_mul(MAX_CHAR_BYTES)).map_err(BrowseError::read)?;
    token.check()?;
    Ok(app_fs::decode_preview(&head, max_chars, hint))
}

/// Decode a whole image and scale it to a `size`×`size` square
pub fn read_image(entry: &Entry, size: u32, token: &JobToken) -> Result<PreviewImage> {
    token.check()?;
    let data = app_fs::read_all(entry).map_err(BrowseError::read)?;
    token.check()?;

    tracing::debug!("Decoding image preview: {} ({} bytes)", entry, data.len());
    let img = ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .map_err(|e| BrowseError::Read(e.to_string()))?
        .decode()?;
    token.check()?;

    let scaled = img.resize_exact(size, size, FilterType::Triangle).to_rgba8();
    let (width, height) = scaled.dimensions();

    Ok(PreviewImage {
        width,
        height,
        data: scaled.into_raw(),
    })
}

/// Classify the entry and read whichever preview fits its type
pub fn preview(entry: &Entry, config: &PreviewConfig, hint: EncodingHint, token: &JobToken) -> Result<JobOutcome> {
    token.check()?;
    let file_type = app_fs::classify_with_limit(entry, config.sniff_bytes);
    tracing::debug!("Preview of {} as {}", entry, file_type);

    match file_type {
        FileType::Text => read_text(entry, config.text_chars, hint, token).map(JobOutcome::Text),
        FileType::Image => read_image(entry, config.image_size, token).map(JobOutcome::Image),
        FileType::Directory | FileType::Unknown => Ok(JobOutcome::NoPreview),
    }
}
