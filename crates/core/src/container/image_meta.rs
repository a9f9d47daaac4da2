//! Embedded text in still images.
//!
//! PNG text chunks carry the workflow directly under `workflow` / `prompt`.
//! WebP (and some JPEG) savers stash it in the EXIF `Make` / `Model` strings
//! with a short prefix such as `workflow:`, so the JSON object is cut out of
//! those values with a regex.
//!
//! Chunk layouts:
//! - PNG: 8-byte signature, then `length (u32 BE) | type | data | crc`.
//!   `tEXt` is `keyword\0text`; `iTXt` is
//!   `keyword\0 flag method language\0 translated\0 text`.
//! - WebP: `RIFF size WEBP`, then `fourcc | size (u32 LE) | data` padded to
//!   even length.
//! - JPEG: `FF D8`, then `FF marker | length (u16 BE, includes itself) | data`
//!   until start-of-scan.

use std::collections::HashMap;
use std::sync::LazyLock;

use image::ImageFormat;
use regex::Regex;

use super::ContainerError;

/// Text keys searched in order.
const TEXT_KEYS: &[&str] = &["workflow", "prompt"];

const PNG_SIGNATURE_LEN: usize = 8;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// TIFF tag ids in IFD0.
const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;

/// TIFF field types that carry byte strings.
const TIFF_ASCII: u16 = 2;
const TIFF_UNDEFINED: u16 = 7;

/// Outermost JSON object in a free-form string.
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Text tags and the raw EXIF (TIFF) block found in an image.
#[derive(Debug, Default)]
struct ImageMetadata {
    text: HashMap<String, String>,
    exif: Option<Vec<u8>>,
}

impl ImageMetadata {
    fn workflow_text(&self) -> Option<String> {
        let tagged = TEXT_KEYS
            .iter()
            .find_map(|key| self.text.get(*key).filter(|v| !v.is_empty()));
        if let Some(text) = tagged {
            return Some(text.clone());
        }

        let exif = self.exif.as_deref()?;
        let source = exif_string(exif, TAG_MAKE)
            .filter(|s| !s.is_empty())
            .or_else(|| exif_string(exif, TAG_MODEL).filter(|s| !s.is_empty()))?;
        JSON_OBJECT_RE
            .find(&source)
            .map(|m| m.as_str().to_string())
    }
}

/// Sniff the image format and return the embedded workflow text, if any.
pub fn read_workflow_text(bytes: &[u8]) -> Result<Option<String>, ContainerError> {
    let format = image::guess_format(bytes).map_err(|_| ContainerError::UnknownImageFormat)?;
    let metadata = match format {
        ImageFormat::Png => png_metadata(bytes)?,
        ImageFormat::WebP => webp_metadata(bytes)?,
        ImageFormat::Jpeg => jpeg_metadata(bytes)?,
        other => {
            tracing::debug!(format = ?other, "Image format carries no workflow metadata");
            return Ok(None);
        }
    };
    Ok(metadata.workflow_text())
}

// ---------------------------------------------------------------------------
// PNG
// ---------------------------------------------------------------------------

fn png_metadata(bytes: &[u8]) -> Result<ImageMetadata, ContainerError> {
    let mut metadata = ImageMetadata::default();
    let mut offset = PNG_SIGNATURE_LEN;

    while offset + 8 <= bytes.len() {
        let length = read_u32_be(bytes, offset).ok_or(ContainerError::Truncated("PNG"))? as usize;
        let chunk_type = &bytes[offset + 4..offset + 8];
        let data_start = offset + 8;
        let data = bytes
            .get(data_start..data_start + length)
            .ok_or(ContainerError::Truncated("PNG"))?;

        match chunk_type {
            b"tEXt" => parse_text_chunk(data, &mut metadata.text),
            b"iTXt" => parse_itxt_chunk(data, &mut metadata.text),
            b"eXIf" => metadata.exif = Some(data.to_vec()),
            b"IEND" => break,
            _ => {}
        }

        // Data plus the 4-byte CRC.
        offset = data_start + length + 4;
    }

    Ok(metadata)
}

fn parse_text_chunk(data: &[u8], text: &mut HashMap<String, String>) {
    let Some(nul) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let keyword = String::from_utf8_lossy(&data[..nul]).into_owned();
    if !keyword.is_empty() {
        text.insert(keyword, String::from_utf8_lossy(&data[nul + 1..]).into_owned());
    }
}

fn parse_itxt_chunk(data: &[u8], text: &mut HashMap<String, String>) {
    let Some(keyword_end) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let keyword = String::from_utf8_lossy(&data[..keyword_end]).into_owned();
    // Flag and method bytes follow the keyword.
    let Some(&compressed) = data.get(keyword_end + 1) else {
        return;
    };
    if keyword.is_empty() || compressed != 0 {
        return;
    }

    let mut offset = keyword_end + 3;
    // Language tag, then translated keyword.
    for _ in 0..2 {
        let Some(nul) = data.get(offset..).and_then(|rest| rest.iter().position(|&b| b == 0))
        else {
            return;
        };
        offset += nul + 1;
    }

    if let Some(value) = data.get(offset..) {
        text.insert(keyword, String::from_utf8_lossy(value).into_owned());
    }
}

// ---------------------------------------------------------------------------
// WebP
// ---------------------------------------------------------------------------

fn webp_metadata(bytes: &[u8]) -> Result<ImageMetadata, ContainerError> {
    let mut metadata = ImageMetadata::default();
    // "RIFF" size "WEBP"
    let mut offset = 12;

    while offset + 8 <= bytes.len() {
        let fourcc = &bytes[offset..offset + 4];
        let length = read_u32_le(bytes, offset + 4).ok_or(ContainerError::Truncated("WebP"))? as usize;
        let data_start = offset + 8;
        let data = bytes
            .get(data_start..data_start + length)
            .ok_or(ContainerError::Truncated("WebP"))?;

        if fourcc == b"EXIF" {
            metadata.exif = Some(data.strip_prefix(EXIF_HEADER).unwrap_or(data).to_vec());
        }

        offset = data_start + length + (length & 1);
    }

    Ok(metadata)
}

// ---------------------------------------------------------------------------
// JPEG
// ---------------------------------------------------------------------------

fn jpeg_metadata(bytes: &[u8]) -> Result<ImageMetadata, ContainerError> {
    const APP1: u8 = 0xE1;
    const START_OF_SCAN: u8 = 0xDA;
    const END_OF_IMAGE: u8 = 0xD9;

    let mut metadata = ImageMetadata::default();
    // Skip SOI.
    let mut offset = 2;

    while offset + 4 <= bytes.len() {
        if bytes[offset] != 0xFF {
            return Err(ContainerError::Truncated("JPEG"));
        }
        let marker = bytes[offset + 1];
        if marker == START_OF_SCAN || marker == END_OF_IMAGE {
            break;
        }
        // Fill bytes and standalone markers carry no length.
        if marker == 0xFF || (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            offset += if marker == 0xFF { 1 } else { 2 };
            continue;
        }

        let length = read_u16_be(bytes, offset + 2).ok_or(ContainerError::Truncated("JPEG"))? as usize;
        if length < 2 {
            return Err(ContainerError::Truncated("JPEG"));
        }
        let data = bytes
            .get(offset + 4..offset + 2 + length)
            .ok_or(ContainerError::Truncated("JPEG"))?;

        if marker == APP1 && metadata.exif.is_none() {
            if let Some(tiff) = data.strip_prefix(EXIF_HEADER) {
                metadata.exif = Some(tiff.to_vec());
            }
        }

        offset += 2 + length;
    }

    Ok(metadata)
}

// ---------------------------------------------------------------------------
// EXIF (TIFF IFD0)
// ---------------------------------------------------------------------------

/// Read a byte-string field from IFD0 of a TIFF block.
fn exif_string(tiff: &[u8], tag: u16) -> Option<String> {
    let little_endian = match tiff.get(..4)? {
        [b'I', b'I', 42, 0] => true,
        [b'M', b'M', 0, 42] => false,
        _ => return None,
    };
    let u16_at = |offset: usize| {
        if little_endian {
            read_u16_le(tiff, offset)
        } else {
            read_u16_be(tiff, offset)
        }
    };
    let u32_at = |offset: usize| {
        if little_endian {
            read_u32_le(tiff, offset)
        } else {
            read_u32_be(tiff, offset)
        }
    };

    let ifd = u32_at(4)? as usize;
    let count = u16_at(ifd)? as usize;

    for index in 0..count {
        let entry = ifd + 2 + index * 12;
        if u16_at(entry)? != tag {
            continue;
        }
        let field_type = u16_at(entry + 2)?;
        if field_type != TIFF_ASCII && field_type != TIFF_UNDEFINED {
            return None;
        }
        let len = u32_at(entry + 4)? as usize;
        let value = if len <= 4 {
            tiff.get(entry + 8..entry + 8 + len)?
        } else {
            let start = u32_at(entry + 8)? as usize;
            tiff.get(start..start.checked_add(len)?)?
        };
        let value = String::from_utf8_lossy(value);
        return Some(value.trim_end_matches('\0').to_string());
    }

    None
}

// ---------------------------------------------------------------------------
// Byte helpers
// ---------------------------------------------------------------------------

fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_be_bytes(bytes.get(offset..offset + 2)?.try_into().ok()?))
}

fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(offset..offset + 2)?.try_into().ok()?))
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(offset..offset + 4)?.try_into().ok()?))
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(offset..offset + 4)?.try_into().ok()?))
}
