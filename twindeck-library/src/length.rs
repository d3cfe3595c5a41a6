//! Track length and position formatting

/// Format a duration for display
///
/// Regular (per-tick) updates show `MM:SS:cc` with hundredths so the readout
/// visibly moves; everything else shows `HH:MM:SS`. Negative and non-finite
/// inputs display as zero.
pub fn format_length(seconds: f64, regular_update: bool) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };

    if regular_update {
        let hundredths = (seconds * 100.0).floor() as u64;
        let minutes = hundredths / 6000;
        let secs = (hundredths / 100) % 60;
        format!("{:02}:{:02}:{:02}", minutes, secs, hundredths % 100)
    } else {
        let whole = seconds.floor() as u64;
        format!("{:02}:{:02}:{:02}", whole / 3600, (whole / 60) % 60, whole % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_form() {
        assert_eq!(format_length(0.0, false), "00:00:00");
        assert_eq!(format_length(59.99, false), "00:00:59");
        assert_eq!(format_length(3725.0, false), "01:02:05");
    }

    #[test]
    fn test_regular_update_form() {
        assert_eq!(format_length(0.0, true), "00:00:00");
        assert_eq!(format_length(65.25, true), "01:05:25");
        assert_eq!(format_length(754.5, true), "12:34:50");
    }

    #[test]
    fn test_bad_input_is_zero() {
        assert_eq!(format_length(-3.0, false), "00:00:00");
        assert_eq!(format_length(f64::NAN, true), "00:00:00");
    }
}
