//! Codepage conversion between narrow names and the wide representation
//!
//! A narrow name is ambiguous: it may have been produced in the configured
//! encoding or in UTF-8. Conversion to the wide form is therefore tried in
//! two attempts, primary then secondary, and callers retry with the second
//! before giving up.

use crate::{native, FsError, Result, WideString};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// The process-wide narrow encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncodingMode {
    /// UTF-8
    #[default]
    #[serde(rename = "utf8")]
    Universal,
    /// The system ANSI codepage
    #[serde(rename = "ansi")]
    SystemLegacy,
    /// The OEM console codepage
    #[serde(rename = "oem")]
    OemLegacy,
}

/// A Windows codepage number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Codepage(pub u32);

impl Codepage {
    /// The system ANSI codepage, whatever its number
    pub const ACP: Codepage = Codepage(0);
    /// The OEM codepage, whatever its number
    pub const OEMCP: Codepage = Codepage(1);
    pub const UTF8: Codepage = Codepage(65001);
}

/// Codepage argument of [`NameCodec::wide_to_narrow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodepageSelector {
    /// The codepage implied by the encoding mode
    Default,
    Explicit(Codepage),
}

impl From<Codepage> for CodepageSelector {
    fn from(codepage: Codepage) -> Self {
        Self::Explicit(codepage)
    }
}

/// Which of the two candidate codepages to convert with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attempt {
    Primary,
    Secondary,
}

impl Attempt {
    /// Candidates in the order they are tried
    pub const ALL: [Attempt; 2] = [Attempt::Primary, Attempt::Secondary];

    pub fn index(self) -> usize {
        match self {
            Attempt::Primary => 0,
            Attempt::Secondary => 1,
        }
    }
}

/// Result of a wide-to-narrow conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Converted text, `None` when conversion failed
    pub text: Option<Vec<u8>>,
    /// A character was replaced by the default character, or the
    /// conversion failed. Only tracked when requested.
    pub substituted: bool,
}

impl Conversion {
    /// The text, only if it represents the wide string exactly
    pub fn into_faithful(self) -> Option<Vec<u8>> {
        if self.substituted {
            None
        } else {
            self.text
        }
    }
}

static GLOBAL_CODEC: OnceCell<NameCodec> = OnceCell::new();

/// Converter bound to an encoding mode and concrete legacy codepages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameCodec {
    mode: EncodingMode,
    system: u32,
    oem: u32,
}

impl NameCodec {
    /// Codec using the host's legacy codepages
    pub fn new(mode: EncodingMode) -> Self {
        let (system, oem) = native::host_codepages();
        Self { mode, system, oem }
    }

    /// Codec with explicit legacy codepage numbers
    pub fn with_codepages(mode: EncodingMode, system: u32, oem: u32) -> Result<Self> {
        for codepage in [system, oem] {
            if !native::is_codepage_supported(codepage) {
                return Err(FsError::UnsupportedCodepage(codepage));
            }
        }
        Ok(Self { mode, system, oem })
    }

    /// Install the process-wide codec. Only the first call succeeds.
    pub fn install(self) -> Result<()> {
        GLOBAL_CODEC
            .set(self)
            .map_err(|_| FsError::Config("name codec already installed".to_string()))?;
        tracing::debug!(
            "Name codec installed: {:?} (system {}, oem {})",
            self.mode,
            self.system,
            self.oem
        );
        Ok(())
    }

    /// The installed codec, or a UTF-8 codec when none was installed
    pub fn global() -> NameCodec {
        GLOBAL_CODEC
            .get()
            .copied()
            .unwrap_or_else(|| Self::new(EncodingMode::Universal))
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    pub fn system_codepage(&self) -> u32 {
        self.system
    }

    pub fn oem_codepage(&self) -> u32 {
        self.oem
    }

    /// The legacy codepage belonging to the mode
    fn legacy(&self) -> Codepage {
        match self.mode {
            EncodingMode::OemLegacy => Codepage::OEMCP,
            EncodingMode::Universal | EncodingMode::SystemLegacy => Codepage::ACP,
        }
    }

    /// Codepage implied by the mode
    pub fn default_codepage(&self) -> Codepage {
        match self.mode {
            EncodingMode::Universal => Codepage::UTF8,
            _ => self.legacy(),
        }
    }

    /// Codepage used by an attempt: the mode's own codepage first, then the
    /// other side of the UTF-8 / legacy pair
    pub fn attempt_codepage(&self, attempt: Attempt) -> Codepage {
        let primary_is_utf8 = self.mode == EncodingMode::Universal;
        let use_utf8 = match attempt {
            Attempt::Primary => primary_is_utf8,
            Attempt::Secondary => !primary_is_utf8,
        };
        if use_utf8 {
            Codepage::UTF8
        } else {
            self.legacy()
        }
    }

    /// Concrete codepage number for the placeholders
    pub fn resolve(&self, codepage: Codepage) -> u32 {
        match codepage {
            Codepage::ACP => self.system,
            Codepage::OEMCP => self.oem,
            Codepage(number) => number,
        }
    }

    /// Convert a narrow name to the wide form using one attempt's codepage.
    ///
    /// Invalid sequences fail the attempt; nothing is replaced.
    pub fn narrow_to_wide(&self, text: &[u8], attempt: Attempt) -> Option<WideString> {
        let codepage = self.resolve(self.attempt_codepage(attempt));
        let wide = native::decode_codepage(codepage, text).map(WideString::from_vec);
        if wide.is_none() {
            tracing::trace!(
                "Name is not valid in codepage {} (attempt {})",
                codepage,
                attempt.index()
            );
        }
        wide
    }

    /// Convert a wide name to narrow text.
    ///
    /// With `report_substitution`, the result records whether a default
    /// character replaced something (always false for UTF-8) or the
    /// conversion failed.
    pub fn wide_to_narrow(
        &self,
        wide: &[u16],
        codepage: CodepageSelector,
        report_substitution: bool,
    ) -> Conversion {
        let codepage = match codepage {
            CodepageSelector::Default => self.default_codepage(),
            CodepageSelector::Explicit(codepage) => codepage,
        };
        let number = self.resolve(codepage);

        match native::encode_codepage(number, wide) {
            Some((text, used_default)) => Conversion {
                text: Some(text),
                substituted: report_substitution && number != Codepage::UTF8.0 && used_default,
            },
            None => {
                tracing::trace!("Wide name cannot be converted to codepage {}", number);
                Conversion {
                    text: None,
                    substituted: report_substitution,
                }
            }
        }
    }

    /// Convert a wide name using the mode's codepage, without tracking
    pub fn wide_to_narrow_default(&self, wide: &[u16]) -> Option<Vec<u8>> {
        self.wide_to_narrow(wide, CodepageSelector::Default, false).text
    }

    /// Re-encode narrow text given in the active encoding as UTF-8
    pub fn narrow_to_utf8(&self, text: &[u8]) -> Option<String> {
        if self.mode == EncodingMode::Universal {
            return std::str::from_utf8(text).ok().map(str::to_owned);
        }

        let wide = self.narrow_to_wide(text, Attempt::Primary)?;
        let utf8 = self.wide_to_narrow(&wide, Codepage::UTF8.into(), false).text?;
        String::from_utf8(utf8).ok()
    }
}

impl Default for NameCodec {
    fn default() -> Self {
        Self::new(EncodingMode::default())
    }
}

/// Convert UTF-8 text to the wide form; always succeeds
pub fn utf8_to_wide(text: &str) -> WideString {
    WideString::from(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(mode: EncodingMode) -> NameCodec {
        NameCodec::with_codepages(mode, 1251, 866).unwrap()
    }

    #[test]
    fn test_attempt_order() {
        let utf8 = codec(EncodingMode::Universal);
        assert_eq!(utf8.attempt_codepage(Attempt::Primary), Codepage::UTF8);
        assert_eq!(utf8.attempt_codepage(Attempt::Secondary), Codepage::ACP);

        let ansi = codec(EncodingMode::SystemLegacy);
        assert_eq!(ansi.attempt_codepage(Attempt::Primary), Codepage::ACP);
        assert_eq!(ansi.attempt_codepage(Attempt::Secondary), Codepage::UTF8);

        let oem = codec(EncodingMode::OemLegacy);
        assert_eq!(oem.attempt_codepage(Attempt::Primary), Codepage::OEMCP);
        assert_eq!(oem.attempt_codepage(Attempt::Secondary), Codepage::UTF8);
        assert_eq!(oem.resolve(Codepage::OEMCP), 866);
    }

    #[test]
    fn test_round_trip_in_every_mode() {
        let samples: [(EncodingMode, &[u8]); 3] = [
            (EncodingMode::Universal, "Привет, мир.txt".as_bytes()),
            // "Привет" in windows-1251
            (EncodingMode::SystemLegacy, &[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]),
            // "Привет" in cp866
            (EncodingMode::OemLegacy, &[0x8F, 0xE0, 0xA8, 0xA2, 0xA5, 0xE2]),
        ];

        for (mode, narrow) in samples {
            let codec = codec(mode);
            let wide = codec.narrow_to_wide(narrow, Attempt::Primary).unwrap();
            let back = codec.wide_to_narrow(&wide, CodepageSelector::Default, true);
            assert_eq!(back.text.as_deref(), Some(narrow), "mode {:?}", mode);
            assert!(!back.substituted);
        }
    }

    #[test]
    fn test_invalid_utf8_needs_second_attempt() {
        let codec = codec(EncodingMode::Universal);
        // "Мир" in windows-1251 is not valid UTF-8
        let legacy = [0xCC, 0xE8, 0xF0];
        assert_eq!(codec.narrow_to_wide(&legacy, Attempt::Primary), None);

        let wide = codec.narrow_to_wide(&legacy, Attempt::Secondary).unwrap();
        assert_eq!(wide.to_string(), "Мир");
    }

    #[test]
    fn test_substitution_reported_for_legacy_only() {
        let codec = codec(EncodingMode::SystemLegacy);
        let wide = utf8_to_wide("日本");

        let legacy = codec.wide_to_narrow(&wide, CodepageSelector::Default, true);
        assert_eq!(legacy.text.as_deref(), Some(&b"??"[..]));
        assert!(legacy.substituted);
        assert_eq!(legacy.into_faithful(), None);

        let untracked = codec.wide_to_narrow(&wide, CodepageSelector::Default, false);
        assert!(!untracked.substituted);

        let utf8 = codec.wide_to_narrow(&wide, Codepage::UTF8.into(), true);
        assert_eq!(utf8.text.as_deref(), Some("日本".as_bytes()));
        assert!(!utf8.substituted);
    }

    #[test]
    fn test_failed_conversion_sets_flag_when_requested() {
        let codec = codec(EncodingMode::Universal);
        let lone_surrogate = [0xD800];

        let reported = codec.wide_to_narrow(&lone_surrogate, CodepageSelector::Default, true);
        assert_eq!(reported.text, None);
        assert!(reported.substituted);

        let silent = codec.wide_to_narrow(&lone_surrogate, CodepageSelector::Default, false);
        assert_eq!(silent.text, None);
        assert!(!silent.substituted);
    }

    #[test]
    fn test_empty_string() {
        let codec = codec(EncodingMode::OemLegacy);
        let wide = codec.narrow_to_wide(b"", Attempt::Primary).unwrap();
        assert!(wide.is_empty());
        assert_eq!(codec.wide_to_narrow_default(&wide), Some(Vec::new()));
    }

    #[test]
    fn test_narrow_to_utf8() {
        let ansi = codec(EncodingMode::SystemLegacy);
        assert_eq!(ansi.narrow_to_utf8(&[0xCC, 0xE8, 0xF0]).as_deref(), Some("Мир"));

        let utf8 = codec(EncodingMode::Universal);
        assert_eq!(utf8.narrow_to_utf8("Мир".as_bytes()).as_deref(), Some("Мир"));
        assert_eq!(utf8.narrow_to_utf8(&[0xCC, 0xE8, 0xF0]), None);
    }

    #[test]
    fn test_install_keeps_first_codec() {
        let first = codec(EncodingMode::OemLegacy);
        first.install().unwrap();

        let err = codec(EncodingMode::SystemLegacy).install().unwrap_err();
        assert!(matches!(err, FsError::Config(_)));
        assert_eq!(NameCodec::global(), first);
    }

    #[test]
    fn test_unsupported_codepage_rejected() {
        let err = NameCodec::with_codepages(EncodingMode::SystemLegacy, 1252, 999_999).unwrap_err();
        assert!(matches!(err, FsError::UnsupportedCodepage(999_999)));
    }

    #[test]
    fn test_encoding_mode_serde_names() {
        #[derive(Deserialize)]
        struct Holder {
            mode: EncodingMode,
        }

        let holder: Holder = toml::from_str("mode = \"oem\"").unwrap();
        assert_eq!(holder.mode, EncodingMode::OemLegacy);
    }
}
