/// Image format name from magic bytes, for logging only.
pub fn detect_image_format(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("png"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("webp"),
        _ => None,
    }
}
