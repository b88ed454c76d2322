// Date parsing shared by claim documents and registry files
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse the date formats found in claim documents and registry extracts.
/// A trailing time component is accepted and dropped.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|dt| dt.date())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_date("2024-03-15"), expected);
        assert_eq!(parse_date("15/03/2024"), expected);
        assert_eq!(parse_date("2024-03-15 08:30"), expected);
        assert_eq!(parse_date(" 2024-03-15T08:30:00 "), expected);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date("yesterday"), None);
    }
}
