//! Export file naming.
//!
//! Titles scraped from chat pages arrive with arbitrary Unicode, path
//! separators and whitespace; the delivered file name must be ASCII-safe,
//! avoid OS-reserved names and stay under a fixed length.

use chrono::{DateTime, Utc};

use crate::domain::{DateStampMode, ExportOptions, LabelLanguage};

const FALLBACK_BASENAME: &str = "chat_export";
const MAX_BASENAME_LEN: usize = 80;

/// Windows device names that cannot be used as file stems.
const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Turkish characters folded to ASCII before the generic pass.
const TURKISH_FOLD: &[(char, char)] = &[
    ('ç', 'c'),
    ('Ç', 'C'),
    ('ğ', 'g'),
    ('Ğ', 'G'),
    ('ı', 'i'),
    ('İ', 'I'),
    ('ö', 'o'),
    ('Ö', 'O'),
    ('ş', 's'),
    ('Ş', 'S'),
    ('ü', 'u'),
    ('Ü', 'U'),
];

/// Sanitize a title into a safe file stem.
#[must_use]
pub fn safe_filename(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return FALLBACK_BASENAME.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut last_was_underscore = false;
    for ch in trimmed.chars() {
        let ch = TURKISH_FOLD
            .iter()
            .find(|(from, _)| *from == ch)
            .map_or(ch, |(_, to)| *to);

        let mapped = match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => Some('_'),
            c if c.is_whitespace() => Some('_'),
            c if c.is_control() => None,
            c if !c.is_ascii() => None,
            c => Some(c),
        };

        match mapped {
            Some('_') => {
                if !last_was_underscore {
                    out.push('_');
                    last_was_underscore = true;
                }
            }
            Some(c) => {
                out.push(c);
                last_was_underscore = false;
            }
            None => {}
        }
    }

    let mut out: String = out.trim_matches(|c| c == '_' || c == '.' || c == ' ').to_string();

    if out.len() < 2 {
        out = FALLBACK_BASENAME.to_string();
    }
    if RESERVED_NAMES.contains(&out.to_lowercase().as_str()) {
        out = format!("export_{out}");
    }
    out.truncate(MAX_BASENAME_LEN);
    out
}

/// `YYYY-MM-DD_HH-MM` stamp for file names.
#[must_use]
pub fn filename_date_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d_%H-%M").to_string()
}

/// Base name for an export: sanitized title plus an optional date stamp
/// suffix depending on the stamp mode.
#[must_use]
pub fn build_export_basename(title: &str, options: &ExportOptions) -> String {
    let base = safe_filename(title);
    if !options.date_stamp_mode.stamps_filename() {
        return base;
    }
    format!("{base}_{}", filename_date_stamp(options.exported_at))
}

const TR_MONTHS: &[&str] = &[
    "Ocak", "Subat", "Mart", "Nisan", "Mayis", "Haziran", "Temmuz", "Agustos", "Eylul", "Ekim",
    "Kasim", "Aralik",
];

/// Human-readable localized stamp for use inside document content.
#[must_use]
pub fn human_date_stamp(at: DateTime<Utc>, language: LabelLanguage) -> String {
    match language {
        LabelLanguage::En => at.format("%B %d, %Y %H:%M").to_string(),
        LabelLanguage::Tr => {
            let month = TR_MONTHS
                .get(at.format("%m").to_string().parse::<usize>().unwrap_or(1) - 1)
                .unwrap_or(&"Ocak");
            format!("{} {} {} {}", at.format("%d"), month, at.format("%Y"), at.format("%H:%M"))
        }
    }
}

/// Title with the content date stamp appended when the mode asks for one.
#[must_use]
pub fn with_content_date_stamp(title: &str, options: &ExportOptions) -> String {
    if !options.date_stamp_mode.stamps_content() {
        return title.to_string();
    }
    format!(
        "{title} - {}",
        human_date_stamp(options.exported_at, options.label_language)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_safe_filename_basic() {
        assert_eq!(safe_filename("My Chat: Q&A?"), "My_Chat_Q&A");
        assert_eq!(safe_filename("  "), "chat_export");
        assert_eq!(safe_filename("a"), "chat_export");
    }

    #[test]
    fn test_safe_filename_turkish_fold() {
        assert_eq!(safe_filename("Sohbet Özeti"), "Sohbet_Ozeti");
    }

    #[test]
    fn test_safe_filename_reserved_names() {
        assert_eq!(safe_filename("con"), "export_con");
        assert_eq!(safe_filename("COM1"), "export_COM1");
    }

    #[test]
    fn test_safe_filename_length_cap() {
        let long = "x".repeat(200);
        assert_eq!(safe_filename(&long).len(), 80);
    }

    #[test]
    fn test_safe_filename_strips_non_ascii() {
        assert_eq!(safe_filename("chat 🚀 export"), "chat_export");
    }

    #[test]
    fn test_basename_with_stamp() {
        let options = ExportOptions {
            date_stamp_mode: DateStampMode::Filename,
            exported_at: Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap(),
            ..ExportOptions::default()
        };
        assert_eq!(
            build_export_basename("My Chat", &options),
            "My_Chat_2026-03-05_14-30"
        );
    }

    #[test]
    fn test_content_stamp_localized() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 0).unwrap();
        assert_eq!(human_date_stamp(at, LabelLanguage::En), "March 05, 2026 14:30");
        assert_eq!(human_date_stamp(at, LabelLanguage::Tr), "05 Mart 2026 14:30");
    }
}
