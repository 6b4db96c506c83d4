pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Current time as an RFC 3339 string (browser clock, UTC).
pub(crate) fn now_iso() -> String {
    String::from(js_sys::Date::new_0().to_iso_string())
}

pub(crate) fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Convert a UTF-16 offset (DOM range unit) into a byte index on a char boundary.
pub(crate) fn utf16_to_byte_idx(s: &str, pos_utf16: u32) -> usize {
    if pos_utf16 == 0 {
        return 0;
    }
    let mut acc: u32 = 0;
    for (i, ch) in s.char_indices() {
        let w = ch.len_utf16() as u32;
        if acc + w > pos_utf16 {
            return i;
        }
        acc += w;
        if acc == pos_utf16 {
            return i + ch.len_utf8();
        }
    }
    s.len()
}

/// Parse a CSS pixel length such as `18px` or `17.5px`.
pub(crate) fn parse_px(s: &str) -> Option<f32> {
    let v: f32 = s.trim().strip_suffix("px")?.trim().parse().ok()?;
    (v.is_finite() && v > 0.0).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_offsets_land_on_char_boundaries() {
        let s = "a😀b";
        assert_eq!(utf16_to_byte_idx(s, 0), 0);
        assert_eq!(utf16_to_byte_idx(s, 1), 1);
        // Inside the surrogate pair: snap back to the start of the emoji.
        assert_eq!(utf16_to_byte_idx(s, 2), 1);
        assert_eq!(utf16_to_byte_idx(s, 3), 5);
        assert_eq!(utf16_to_byte_idx(s, 99), s.len());
        assert_eq!(utf16_len(s), 4);
    }

    #[test]
    fn parses_pixel_lengths() {
        assert_eq!(parse_px("18px"), Some(18.0));
        assert_eq!(parse_px(" 17.5px "), Some(17.5));
        assert_eq!(parse_px("1em"), None);
        assert_eq!(parse_px("-2px"), None);
    }
}
