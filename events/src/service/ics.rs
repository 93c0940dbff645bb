use chrono::{TimeZone, Utc};

use common::default_timestamp;
use common::entities::event::Event;
use common::error::{self, AddCode};

const TWO_HOURS_MICROS: i64 = 2 * 60 * 60 * 1_000_000;
const DESCRIPTION_LIMIT: usize = 500;
const UID_SLUG_LIMIT: usize = 30;

/// Calendar-interchange document (VCALENDAR/VEVENT) for a single event,
/// offered as a download on the event detail page.
pub fn generate_ics(event: &Event) -> error::Result<String> {
    let dt_start = format_timestamp(event.start_at)?;
    let dt_end = match event.end_at {
        Some(end_at) => format_timestamp(end_at)?,
        // No announced end: assume two hours.
        None => format_timestamp(event.start_at + TWO_HOURS_MICROS)?,
    };

    let location = [event.location_name.as_deref(), event.address.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

    let mut description_parts: Vec<String> = Vec::new();
    if let Some(description) = &event.description {
        description_parts.push(description.chars().take(DESCRIPTION_LIMIT).collect());
    }
    if let Some(ticket_link) = &event.ticket_link {
        description_parts.push(format!("Anmeldung: {}", ticket_link));
    }
    let description = description_parts.join("\\n\\n");

    let title_slug: String = event
        .title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(UID_SLUG_LIMIT)
        .collect();
    let uid = format!("{}-{}@portal", dt_start, title_slug);

    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Portal//Events//DE".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", uid),
        format!("DTSTART:{}", dt_start),
        format!("DTEND:{}", dt_end),
        format!("SUMMARY:{}", event.title),
        if location.is_empty() {
            String::new()
        } else {
            format!("LOCATION:{}", location)
        },
        if description.is_empty() {
            String::new()
        } else {
            format!("DESCRIPTION:{}", description)
        },
        format!("DTSTAMP:{}", format_timestamp(default_timestamp())?),
        "END:VEVENT".to_string(),
        "END:VCALENDAR".to_string(),
    ];

    Ok(lines
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\r\n"))
}

/// UTC basic format, e.g. 20300101T100000Z.
fn format_timestamp(micros: i64) -> error::Result<String> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
    let timestamp = Utc
        .timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {}", micros).code(500))?;
    Ok(timestamp.format("%Y%m%dT%H%M%SZ").to_string())
}
