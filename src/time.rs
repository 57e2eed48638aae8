use chrono::{Local, NaiveDateTime, Offset, TimeZone, Utc};

use crate::error::LabelError;

/// Seconds local time is ahead of UTC right now.
pub fn local_utc_diff() -> i64 {
    Local::now().offset().fix().local_minus_utc() as i64
}

/// Seconds since the epoch of `datetime` read as UTC, e.g. with the format
/// `"%Y-%m-%dT%H:%M:%S"`.
pub fn utc_seconds_from_datetime(datetime: &str, format: &str) -> Result<i64, LabelError> {
    let naive = NaiveDateTime::parse_from_str(datetime.trim(), format)
        .map_err(|source| LabelError::BadTimestamp { value: datetime.to_string(), source })?;
    Ok(Utc.from_utc_datetime(&naive).timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_hour_zone_offset() {
        // Holds in every zone with a whole-hour offset.
        assert_eq!(local_utc_diff() % 3600, 0);
    }

    #[test]
    fn datetime_is_read_as_utc() {
        let s = utc_seconds_from_datetime("2016-12-08T20:40:49", "%Y-%m-%dT%H:%M:%S").unwrap();
        assert_eq!(s, 1481229649);
        let s = utc_seconds_from_datetime("11/3/2009 15:30", "%m/%d/%Y %H:%M").unwrap();
        assert_eq!(s, 1257262200);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(
            utc_seconds_from_datetime("yesterday", "%Y-%m-%dT%H:%M:%S"),
            Err(LabelError::BadTimestamp { .. })
        ));
    }
}
