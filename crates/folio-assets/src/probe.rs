//! Media type and pixel size sniffing.
//!
//! Only headers are read; nothing is decoded.

/// What the bytes turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub media_type: String,
    pub size: Option<(u32, u32)>,
}

/// Identify bytes by magic number, falling back to the filename extension.
pub fn probe(bytes: &[u8], filename: &str) -> MediaInfo {
    if let Some((media_type, size)) = sniff(bytes) {
        return MediaInfo {
            media_type: media_type.to_string(),
            size,
        };
    }
    MediaInfo {
        media_type: media_type_for_extension(filename).to_string(),
        size: None,
    }
}

fn sniff(bytes: &[u8]) -> Option<(&'static str, Option<(u32, u32)>)> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(("image/png", png_size(bytes)))
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(("image/gif", gif_size(bytes)))
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        Some(("image/jpeg", jpeg_size(bytes)))
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(("image/webp", webp_size(bytes)))
    } else if bytes.starts_with(b"%PDF-") {
        Some(("application/pdf", None))
    } else {
        None
    }
}

/// Media type guessed from a filename extension.
pub fn media_type_for_extension(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn be_u16(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 2)?;
    Some(u32::from(u16::from_be_bytes([s[0], s[1]])))
}

fn le_u16(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 2)?;
    Some(u32::from(u16::from_le_bytes([s[0], s[1]])))
}

fn be_u32(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 4)?;
    Some(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
}

fn le_u24(b: &[u8], at: usize) -> Option<u32> {
    let s = b.get(at..at + 3)?;
    Some(u32::from(s[0]) | u32::from(s[1]) << 8 | u32::from(s[2]) << 16)
}

fn nonzero(w: u32, h: u32) -> Option<(u32, u32)> {
    (w > 0 && h > 0).then_some((w, h))
}

fn png_size(b: &[u8]) -> Option<(u32, u32)> {
    // IHDR is always the first chunk.
    if b.get(12..16)? != b"IHDR" {
        return None;
    }
    nonzero(be_u32(b, 16)?, be_u32(b, 20)?)
}

fn gif_size(b: &[u8]) -> Option<(u32, u32)> {
    nonzero(le_u16(b, 6)?, le_u16(b, 8)?)
}

fn jpeg_size(b: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 <= b.len() {
        if b[i] != 0xFF {
            return None;
        }
        let marker = b[i + 1];
        // Fill bytes and standalone markers carry no length.
        if marker == 0xFF {
            i += 1;
            continue;
        }
        if matches!(marker, 0x01 | 0xD0..=0xD7) {
            i += 2;
            continue;
        }
        let len = be_u16(b, i + 2)? as usize;
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let h = be_u16(b, i + 5)?;
            let w = be_u16(b, i + 7)?;
            return nonzero(w, h);
        }
        if len < 2 {
            return None;
        }
        i += 2 + len;
    }
    None
}

fn webp_size(b: &[u8]) -> Option<(u32, u32)> {
    match b.get(12..16)? {
        b"VP8 " => {
            let w = le_u16(b, 26)? & 0x3FFF;
            let h = le_u16(b, 28)? & 0x3FFF;
            nonzero(w, h)
        }
        b"VP8L" => {
            let s = b.get(21..25)?;
            let (b0, b1, b2, b3) = (u32::from(s[0]), u32::from(s[1]), u32::from(s[2]), u32::from(s[3]));
            let w = 1 + (((b1 & 0x3F) << 8) | b0);
            let h = 1 + (((b3 & 0x0F) << 10) | (b2 << 2) | ((b1 & 0xC0) >> 6));
            nonzero(w, h)
        }
        b"VP8X" => nonzero(1 + le_u24(b, 24)?, 1 + le_u24(b, 27)?),
        _ => None,
    }
}
