use chrono::Duration;

/// Renders a duration as `"1hr 1min 1s"`. Leading zero components are dropped,
/// seconds are always shown: 65s is `"1min 5s"`, 45s is `"45s"`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}hr {}min {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}min {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
