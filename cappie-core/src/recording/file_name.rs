use chrono::{DateTime, Utc};

/// 2001-01-01T00:00:00Z as a Unix timestamp.
const REFERENCE_EPOCH: i64 = 978_307_200;

/// Default movie file name: `<prefix>-<seconds since 2001-01-01 UTC>.mov`.
pub fn generate_file_name(prefix: &str) -> String {
    generate_file_name_at(prefix, Utc::now())
}

pub fn generate_file_name_at(prefix: &str, at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis() - REFERENCE_EPOCH * 1000;
    let seconds = millis as f64 / 1000.0;
    format!("{}-{}.mov", prefix, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_seconds_from_reference_date() {
        let at = DateTime::from_timestamp(REFERENCE_EPOCH + 10, 500_000_000).unwrap();
        assert_eq!(generate_file_name_at("cappie", at), "cappie-10.5.mov");
    }

    #[test]
    fn whole_seconds_have_no_fraction() {
        let at = DateTime::from_timestamp(REFERENCE_EPOCH + 782_000_000, 0).unwrap();
        assert_eq!(generate_file_name_at("take", at), "take-782000000.mov");
    }

    #[test]
    fn current_time_name_has_prefix_and_extension() {
        let name = generate_file_name("cappie");
        assert!(name.starts_with("cappie-"));
        assert!(name.ends_with(".mov"));
    }
}
