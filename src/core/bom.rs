use encoding_rs::Encoding;

/// UTF-8 BOM bytes.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
/// UTF-16 little-endian BOM bytes.
pub const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
/// UTF-16 big-endian BOM bytes.
pub const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
/// UTF-32 little-endian BOM bytes.
pub const UTF32_LE_BOM: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
/// UTF-32 big-endian BOM bytes.
pub const UTF32_BE_BOM: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];

/// The byte-order marks recognised at the start of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrderMark {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl ByteOrderMark {
    /// Detects the byte-order mark at the start of `bytes`.
    ///
    /// UTF-32LE is checked before UTF-16LE since the latter is a prefix of the former.
    pub fn detect(bytes: &[u8]) -> Option<ByteOrderMark> {
        if bytes.starts_with(&UTF8_BOM) {
            Some(ByteOrderMark::Utf8)
        } else if bytes.starts_with(&UTF32_LE_BOM) {
            Some(ByteOrderMark::Utf32Le)
        } else if bytes.starts_with(&UTF32_BE_BOM) {
            Some(ByteOrderMark::Utf32Be)
        } else if bytes.starts_with(&UTF16_LE_BOM) {
            Some(ByteOrderMark::Utf16Le)
        } else if bytes.starts_with(&UTF16_BE_BOM) {
            Some(ByteOrderMark::Utf16Be)
        } else {
            None
        }
    }

    /// Returns the byte representation of the BOM.
    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            ByteOrderMark::Utf8 => &UTF8_BOM,
            ByteOrderMark::Utf16Le => &UTF16_LE_BOM,
            ByteOrderMark::Utf16Be => &UTF16_BE_BOM,
            ByteOrderMark::Utf32Le => &UTF32_LE_BOM,
            ByteOrderMark::Utf32Be => &UTF32_BE_BOM,
        }
    }

    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns the decodable encoding this mark announces, `None` for UTF-32.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        match self {
            ByteOrderMark::Utf8 => Some(encoding_rs::UTF_8),
            ByteOrderMark::Utf16Le => Some(encoding_rs::UTF_16LE),
            ByteOrderMark::Utf16Be => Some(encoding_rs::UTF_16BE),
            ByteOrderMark::Utf32Le | ByteOrderMark::Utf32Be => None,
        }
    }

    /// Returns the mark a writer prefixes for `encoding`, if it has one.
    pub fn for_encoding(encoding: &'static Encoding) -> Option<ByteOrderMark> {
        if encoding == encoding_rs::UTF_8 {
            Some(ByteOrderMark::Utf8)
        } else if encoding == encoding_rs::UTF_16LE {
            Some(ByteOrderMark::Utf16Le)
        } else if encoding == encoding_rs::UTF_16BE {
            Some(ByteOrderMark::Utf16Be)
        } else {
            None
        }
    }
}

/// Whether `encoding` is a single-byte ISO-8859 encoding.
///
/// `ISO-8859-1` labels resolve to windows-1252, so that one counts as well.
pub fn is_iso_8859_family(encoding: &'static Encoding) -> bool {
    encoding == encoding_rs::WINDOWS_1252 || encoding.name().starts_with("ISO-8859")
}
