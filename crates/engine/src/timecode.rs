/// Format a time in seconds as `M:SS`, or `H:MM:SS` from one hour up.
///
/// The time is rounded up to a whole second. Unknown (`NaN`), infinite and
/// negative times render as `0:00`.
#[must_use]
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.ceil() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let mins = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}")
    } else {
        format!("{mins}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(0.0, "0:00")]
    #[case(0.2, "0:01")]
    #[case(5.0, "0:05")]
    #[case(59.2, "1:00")]
    #[case(61.0, "1:01")]
    #[case(600.0, "10:00")]
    #[case(3599.5, "1:00:00")]
    #[case(3661.0, "1:01:01")]
    #[case(36000.0, "10:00:00")]
    fn formats(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(format_time(input), expected);
    }

    #[test]
    fn unknown_durations_render_zero() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
