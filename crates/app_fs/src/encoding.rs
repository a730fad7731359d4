//! Character encoding detection for legacy archive names and text previews

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Locale preference used when bytes are not UTF-8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingHint {
    /// Prefer Shift_JIS
    Japanese,
    /// Prefer GBK
    ChineseSimplified,
    /// Prefer Big5
    ChineseTraditional,
    /// Prefer EUC-KR
    Korean,
    /// Prefer IBM866, the DOS default for Cyrillic ZIP tools
    Cyrillic,
    None,
}

impl EncodingHint {
    fn tld(self) -> Option<&'static [u8]> {
        match self {
            EncodingHint::Japanese => Some(b"jp"),
            EncodingHint::ChineseSimplified => Some(b"cn"),
            EncodingHint::ChineseTraditional => Some(b"tw"),
            EncodingHint::Korean => Some(b"kr"),
            EncodingHint::Cyrillic => Some(b"ru"),
            EncodingHint::None => None,
        }
    }

    /// Used when the detector falls back to its Western default
    fn fallback(self) -> Option<&'static Encoding> {
        match self {
            EncodingHint::Japanese => Some(encoding_rs::SHIFT_JIS),
            EncodingHint::ChineseSimplified => Some(encoding_rs::GBK),
            EncodingHint::ChineseTraditional => Some(encoding_rs::BIG5),
            EncodingHint::Korean => Some(encoding_rs::EUC_KR),
            EncodingHint::Cyrillic => Some(encoding_rs::IBM866),
            EncodingHint::None => None,
        }
    }
}

/// Detect the most likely encoding of a byte sequence
pub fn detect_encoding(bytes: &[u8], hint: EncodingHint) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return encoding_rs::UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let detected = detector.guess(hint.tld(), true);

    match hint.fallback() {
        Some(fallback) if detected == encoding_rs::WINDOWS_1252 => fallback,
        _ => detected,
    }
}

/// Decode bytes to a UTF-8 string.
///
/// Returns the decoded string and whether replacement characters were needed.
pub fn decode_bytes(bytes: &[u8], hint: EncodingHint) -> (String, bool) {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return (s.to_string(), false);
    }

    let encoding = detect_encoding(bytes, hint);
    let (result, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("Lossy decode with {}", encoding.name());
    }
    (result.into_owned(), had_errors)
}

/// Decode the head of a file and keep at most `max_chars` characters.
///
/// The head was cut at an arbitrary byte, so a UTF-8 sequence truncated at
/// the very end still counts as UTF-8.
pub fn decode_preview(bytes: &[u8], max_chars: usize, hint: EncodingHint) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => decode_bytes(bytes, hint).0,
    };
    text.chars().take(max_chars).collect()
}

/// Get the system default encoding hint based on locale
#[cfg(windows)]
pub fn system_encoding_hint() -> EncodingHint {
    use windows::Win32::Globalization::GetUserDefaultLCID;

    let lcid = unsafe { GetUserDefaultLCID() };

    match lcid & 0x3FF {
        0x11 => EncodingHint::Japanese,
        0x04 => EncodingHint::ChineseSimplified,
        0x12 => EncodingHint::Korean,
        0x19 | 0x22 | 0x23 => EncodingHint::Cyrillic,
        _ => EncodingHint::None,
    }
}

#[cfg(not(windows))]
pub fn system_encoding_hint() -> EncodingHint {
    std::env::var("LANG")
        .map(|lang| hint_from_locale(&lang))
        .unwrap_or(EncodingHint::None)
}

#[cfg_attr(windows, allow(dead_code))]
fn hint_from_locale(lang: &str) -> EncodingHint {
    let lang = lang.to_lowercase();
    if lang.starts_with("ja") {
        EncodingHint::Japanese
    } else if lang.starts_with("zh_cn") || lang.starts_with("zh-cn") {
        EncodingHint::ChineseSimplified
    } else if lang.starts_with("zh_tw") || lang.starts_with("zh-tw") {
        EncodingHint::ChineseTraditional
    } else if lang.starts_with("ko") {
        EncodingHint::Korean
    } else if lang.starts_with("ru") || lang.starts_with("uk") || lang.starts_with("be") {
        EncodingHint::Cyrillic
    } else {
        EncodingHint::None
    }
}
