//! Field text, both the measuring stand-in and the painted value.

use crate::layout::info::{BookmarkMap, FieldInfos};
use crate::model::{DocumentInfo, FieldKind, InfoField, NumberFormat};

/// Stand-in for page-dependent values while the final numbers are unknown.
const NUMBER_PLACEHOLDER: &str = "00";

/// Whether the value depends on where pagination puts things.
pub fn is_page_dependent(kind: &FieldKind) -> bool {
    !matches!(kind, FieldKind::Date { .. } | FieldKind::Info { .. })
}

/// Text used to measure a field during line breaking.
pub fn measuring_text(kind: &FieldKind, info: &DocumentInfo, date: chrono::NaiveDateTime) -> String {
    match kind {
        FieldKind::Date { format } => format_date(date, format),
        FieldKind::Info { info: which } => info_text(info, *which).to_string(),
        _ => NUMBER_PLACEHOLDER.to_string(),
    }
}

/// Final text of a field on a given page.
pub fn resolve(
    kind: &FieldKind,
    infos: &FieldInfos,
    bookmarks: &BookmarkMap,
    info: &DocumentInfo,
) -> String {
    match kind {
        FieldKind::Page { format } => format_number(infos.shown_page, *format),
        FieldKind::NumPages { format } => format_number(infos.num_pages as u32, *format),
        FieldKind::SectionNumber { format } => format_number(infos.section as u32, *format),
        FieldKind::SectionPages { format } => format_number(infos.section_pages as u32, *format),
        FieldKind::Date { format } => format_date(infos.date, format),
        FieldKind::PageRef { name, format } => match bookmarks.get(name) {
            Some(page) => format_number(page.shown, *format),
            None => {
                log::warn!("Page reference to unknown bookmark '{name}'");
                "<??>".to_string()
            }
        },
        FieldKind::Info { info: which } => info_text(info, *which).to_string(),
    }
}

fn info_text(info: &DocumentInfo, which: InfoField) -> &str {
    match which {
        InfoField::Title => &info.title,
        InfoField::Author => &info.author,
        InfoField::Subject => &info.subject,
    }
}

fn format_date(date: chrono::NaiveDateTime, format: &str) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    // chrono reports malformed format strings through fmt::Error
    if write!(out, "{}", date.format(format)).is_err() {
        log::warn!("Invalid date format '{format}'");
        return date.format("%d.%m.%Y").to_string();
    }
    out
}

pub fn format_number(n: u32, format: NumberFormat) -> String {
    match format {
        NumberFormat::Arabic => n.to_string(),
        NumberFormat::RomanLower => to_roman(n).to_lowercase(),
        NumberFormat::RomanUpper => to_roman(n),
        NumberFormat::AlphaLower => to_alpha(n).to_lowercase(),
        NumberFormat::AlphaUpper => to_alpha(n),
    }
}

fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    if n == 0 {
        return "0".into();
    }
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// A..Z, then AA..ZZ, AAA..: the letter repeats once per pass through the alphabet.
fn to_alpha(n: u32) -> String {
    if n == 0 {
        return "0".into();
    }
    let letter = (b'A' + ((n - 1) % 26) as u8) as char;
    let repeat = (n - 1) / 26 + 1;
    std::iter::repeat_n(letter, repeat as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::info::PageNumber;

    fn infos() -> FieldInfos {
        FieldInfos {
            physical_page: 4,
            shown_page: 3,
            section: 2,
            section_pages: 5,
            num_pages: 9,
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 7)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap(),
        }
    }

    #[test]
    fn number_formats() {
        assert_eq!(format_number(14, NumberFormat::RomanUpper), "XIV");
        assert_eq!(format_number(1994, NumberFormat::RomanLower), "mcmxciv");
        assert_eq!(format_number(1, NumberFormat::AlphaLower), "a");
        assert_eq!(format_number(28, NumberFormat::AlphaUpper), "BB");
        assert_eq!(format_number(7, NumberFormat::Arabic), "7");
    }

    #[test]
    fn resolves_page_fields_from_infos() {
        let info = DocumentInfo {
            title: "Report".into(),
            ..Default::default()
        };
        let mut bookmarks = BookmarkMap::new();
        bookmarks.insert(
            "intro".into(),
            PageNumber {
                physical: 2,
                shown: 12,
            },
        );
        let i = infos();
        let page = FieldKind::Page {
            format: NumberFormat::Arabic,
        };
        assert_eq!(resolve(&page, &i, &bookmarks, &info), "3");
        let total = FieldKind::NumPages {
            format: NumberFormat::Arabic,
        };
        assert_eq!(resolve(&total, &i, &bookmarks, &info), "9");
        let pref = FieldKind::PageRef {
            name: "intro".into(),
            format: NumberFormat::Arabic,
        };
        assert_eq!(resolve(&pref, &i, &bookmarks, &info), "12");
        let title = FieldKind::Info {
            info: InfoField::Title,
        };
        assert_eq!(resolve(&title, &i, &bookmarks, &info), "Report");
        let date = FieldKind::Date {
            format: "%Y-%m-%d".into(),
        };
        assert_eq!(resolve(&date, &i, &bookmarks, &info), "2024-03-07");
    }

    #[test]
    fn measuring_uses_placeholder_for_page_numbers() {
        let page = FieldKind::Page {
            format: NumberFormat::Arabic,
        };
        assert!(is_page_dependent(&page));
        assert_eq!(
            measuring_text(&page, &DocumentInfo::default(), infos().date),
            NUMBER_PLACEHOLDER
        );
    }
}
