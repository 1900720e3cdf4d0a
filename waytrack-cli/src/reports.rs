use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use waytrack_engine::{
    Journey, ProgressSnapshot, ResolutionSource, ResolvedStop, StopOrigin, WaypointStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
    Csv,
}

/// Everything a report needs about one evaluation.
pub struct ReportInput<'a> {
    pub journey: &'a Journey,
    pub source: &'a ResolutionSource,
    pub stops: &'a [ResolvedStop],
    pub snapshot: &'a ProgressSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    journey: &'a Journey,
    route_source: &'a ResolutionSource,
    snapshot: &'a ProgressSnapshot,
}

pub fn write_report<W: Write + ?Sized>(
    out: &mut W,
    format: ReportFormat,
    input: &ReportInput<'_>,
) -> Result<()> {
    match format {
        ReportFormat::Console => generate_console_report(out, input),
        ReportFormat::Json => generate_json_report(out, input),
        ReportFormat::Markdown => generate_markdown_report(out, input),
        ReportFormat::Csv => generate_csv_report(out, input),
    }
}

/// Fixed-width text bar, e.g. `[#####-----]`.
#[must_use]
pub fn progress_bar(percentage: u8, width: usize) -> String {
    let filled = usize::from(percentage.min(100)) * width / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[must_use]
pub fn source_label(source: &ResolutionSource) -> String {
    match source {
        ResolutionSource::Remote => "remote checkpoints".to_string(),
        ResolutionSource::Fallback(reason) => format!("local table ({reason})"),
    }
}

const fn origin_label(origin: StopOrigin) -> &'static str {
    match origin {
        StopOrigin::Remote => "remote",
        StopOrigin::Table => "table",
        StopOrigin::Default => "default",
    }
}

fn origin_of(stops: &[ResolvedStop], idx: usize) -> &'static str {
    stops.get(idx).map_or("default", |s| origin_label(s.origin))
}

/// One-line status used while polling.
#[must_use]
pub fn watch_line(snapshot: &ProgressSnapshot) -> String {
    let position = match snapshot.current() {
        Some(waypoint) => format!("next {}", waypoint.city),
        None if snapshot.is_finished() => "arrived".to_string(),
        None => "not departed".to_string(),
    };
    format!(
        "{} {} {:>3}% {position}",
        snapshot.evaluated_at.format("%H:%M:%S"),
        progress_bar(snapshot.percentage, 20),
        snapshot.percentage
    )
}

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    input: &ReportInput<'_>,
) -> Result<()> {
    let snapshot = input.snapshot;
    writeln!(out, "{}", "🧭 Journey Progress".bright_cyan().bold())?;
    writeln!(out, "{}", "===================".cyan())?;
    writeln!(
        out,
        "Journey {}: {} → {}",
        input.journey.id(),
        input.journey.source(),
        input.journey.destination()
    )?;
    writeln!(
        out,
        "Scheduled: {} → {}",
        input.journey.departure_time().format("%Y-%m-%d %H:%M"),
        input.journey.arrival_time().format("%Y-%m-%d %H:%M")
    )?;
    writeln!(out, "Route data: {}", source_label(input.source))?;
    writeln!(
        out,
        "Evaluated at: {}",
        snapshot.evaluated_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        out,
        "Progress: {} {}%",
        progress_bar(snapshot.percentage, 30),
        snapshot.percentage
    )?;
    writeln!(out, "Distance: {:.1} km", snapshot.distance_km)?;
    writeln!(out)?;

    for (idx, waypoint) in snapshot.waypoints.iter().enumerate() {
        let marker = match waypoint.status {
            WaypointStatus::Completed => "✔ completed".green(),
            WaypointStatus::Current => "➤ current".yellow().bold(),
            WaypointStatus::Upcoming => "· upcoming".dimmed(),
        };
        writeln!(
            out,
            "  {:>2}. {:<16} {}  {}  ({:.4}, {:.4}, {})",
            idx + 1,
            waypoint.city,
            waypoint.scheduled_time.format("%H:%M:%S"),
            marker,
            waypoint.coordinates.lat,
            waypoint.coordinates.lng,
            origin_of(input.stops, idx)
        )?;
    }
    writeln!(out)?;

    if snapshot.ready_to_complete {
        writeln!(
            out,
            "{}",
            "✅ Ready to complete: rating and review can be submitted".green()
        )?;
    } else {
        writeln!(
            out,
            "⏳ Completion unlocks at the readiness threshold ({}% now)",
            snapshot.percentage
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(out: &mut W, input: &ReportInput<'_>) -> Result<()> {
    let report = JsonReport {
        journey: input.journey,
        route_source: input.source,
        snapshot: input.snapshot,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    input: &ReportInput<'_>,
) -> Result<()> {
    let snapshot = input.snapshot;
    writeln!(
        out,
        "# Journey {} ({} → {})\n",
        input.journey.id(),
        input.journey.source(),
        input.journey.destination()
    )?;
    writeln!(out, "- **Progress**: {}%", snapshot.percentage)?;
    writeln!(
        out,
        "- **Ready to complete**: {}",
        if snapshot.ready_to_complete { "yes" } else { "no" }
    )?;
    writeln!(out, "- **Route data**: {}", source_label(input.source))?;
    writeln!(
        out,
        "- **Evaluated at**: {}\n",
        snapshot.evaluated_at.to_rfc3339()
    )?;
    writeln!(out, "| # | City | Scheduled | Status |")?;
    writeln!(out, "|---|------|-----------|--------|")?;
    for (idx, waypoint) in snapshot.waypoints.iter().enumerate() {
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            idx + 1,
            waypoint.city,
            waypoint.scheduled_time.format("%H:%M:%S"),
            waypoint.status
        )?;
    }
    Ok(())
}

pub fn generate_csv_report<W: Write + ?Sized>(out: &mut W, input: &ReportInput<'_>) -> Result<()> {
    writeln!(out, "index,city,lat,lng,scheduled_time,status,origin")?;
    for (idx, waypoint) in input.snapshot.waypoints.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            idx,
            csv_field(&waypoint.city),
            waypoint.coordinates.lat,
            waypoint.coordinates.lng,
            waypoint.scheduled_time.to_rfc3339(),
            waypoint.status,
            origin_of(input.stops, idx)
        )?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use waytrack_engine::{CityTable, FallbackReason, ProgressEngine, synthesize};

    fn fixture() -> (Journey, Vec<ResolvedStop>, ProgressSnapshot) {
        let journey = Journey::new(
            "bk-9",
            "Dhaka",
            "Cox's Bazar",
            ["Dhaka", "Comilla", "Feni", "Chittagong", "Cox's Bazar"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 0).unwrap(),
        )
        .unwrap();
        let stops = synthesize(journey.route(), CityTable::bundled());
        let snapshot = ProgressEngine::default().snapshot(
            &journey,
            &stops,
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 15, 0).unwrap(),
        );
        (journey, stops, snapshot)
    }

    fn render(format: ReportFormat) -> String {
        let (journey, stops, snapshot) = fixture();
        let source = ResolutionSource::Fallback(FallbackReason::Empty);
        let input = ReportInput {
            journey: &journey,
            source: &source,
            stops: &stops,
            snapshot: &snapshot,
        };
        let mut buffer = Vec::new();
        write_report(&mut buffer, format, &input).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(progress_bar(0, 10), "[----------]");
        assert_eq!(progress_bar(50, 10), "[#####-----]");
        assert_eq!(progress_bar(100, 4), "[####]");
    }

    #[test]
    fn json_report_exposes_snapshot_fields() {
        let value: serde_json::Value = serde_json::from_str(&render(ReportFormat::Json)).unwrap();
        assert_eq!(value["snapshot"]["percentage"], 50);
        assert_eq!(value["snapshot"]["readyToComplete"], false);
        assert_eq!(value["snapshot"]["waypoints"][2]["status"], "current");
        assert_eq!(value["routeSource"]["fallback"]["reason"], "empty");
    }

    #[test]
    fn csv_report_quotes_cities_and_lists_every_stop() {
        let csv = render(ReportFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[3].starts_with("2,Feni,"));
        assert!(lines[3].ends_with(",current,table"));
        assert_eq!(csv_field("a,b"), "\"a,b\"");
    }

    #[test]
    fn markdown_and_console_mention_journey() {
        let md = render(ReportFormat::Markdown);
        assert!(md.contains("# Journey bk-9"));
        assert!(md.contains("| 3 | Feni | 11:15:00 | current |"));
        let console = render(ReportFormat::Console);
        assert!(console.contains("Progress: [###############---------------] 50%"));
    }

    #[test]
    fn watch_line_describes_position() {
        let (_, _, snapshot) = fixture();
        assert!(watch_line(&snapshot).ends_with(" 50% next Feni"));
    }
}
