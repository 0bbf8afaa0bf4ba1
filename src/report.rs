//! Report assembly, terminal rendering and JSON export.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use boardpulse_types::Timestamp;

use crate::data::names::UNASSIGNED;
use crate::data::{
    BoardTotals, DateRange, LabelCount, ListCount, MemberCount, MetricEngine, MetricError,
    RankingRow, TimelineRow,
};

/// Every metric for one board and one date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub board: String,
    pub fetched_at: Timestamp,
    pub range: RangeSummary,
    pub summary: Summary,
    pub totals: BoardTotals,
    pub timeline: Vec<TimelineRow>,
    pub by_member: Vec<MemberCount>,
    pub ranking: Vec<RankingRow>,
    pub by_label: Vec<LabelCount>,
    pub by_list: Vec<ListCount>,
    pub overdue: Vec<OverdueCard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: usize,
}

/// Headline figures for the range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub created: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub overdue: usize,
    /// `None` when nothing was created in the range.
    pub completion_rate: Option<f64>,
    pub average_cycle_time_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueCard {
    pub name: String,
    pub list: String,
    pub due: Option<Timestamp>,
    pub members: Vec<String>,
}

impl Report {
    /// Run every metric of `engine` over `range`.
    pub fn compute(
        engine: &MetricEngine<'_>,
        range: &DateRange,
        fetched_at: Timestamp,
    ) -> Result<Self, MetricError> {
        let overdue: Vec<OverdueCard> = engine
            .overdue_cards()?
            .into_iter()
            .map(|c| OverdueCard {
                name: c.name.clone(),
                list: c.current_list.clone(),
                due: c.due_at,
                members: c.members.clone(),
            })
            .collect();

        let summary = Summary {
            created: engine.created_count(range)?,
            completed: engine.completed_count(range)?,
            in_progress: engine.in_progress_count(),
            overdue: overdue.len(),
            completion_rate: engine.completion_rate(range)?,
            average_cycle_time_days: engine.average_cycle_time(range)?,
        };

        Ok(Self {
            board: engine.model().board().name.clone(),
            fetched_at,
            range: RangeSummary {
                start: range.start_date(),
                end: range.end_date(),
                days: range.day_count(),
            },
            summary,
            totals: engine.board_totals(),
            timeline: engine.timeline(range)?,
            by_member: engine.by_member(range)?,
            ranking: engine.productivity_ranking(range)?,
            by_label: engine.by_label(range)?,
            by_list: engine.by_list(),
            overdue,
        })
    }

    /// Plain-text rendering for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        let _ = writeln!(out, "Board: {}", self.board);
        let _ = writeln!(
            out,
            "Period: {} to {} ({} days), fetched {}",
            self.range.start, self.range.end, self.range.days, self.fetched_at
        );
        out.push('\n');

        let _ = writeln!(out, "Created      {:>8}", format_count(s.created));
        let _ = writeln!(out, "Completed    {:>8}", format_count(s.completed));
        let _ = writeln!(out, "In progress  {:>8}", format_count(s.in_progress));
        let _ = writeln!(out, "Overdue      {:>8}", format_count(s.overdue));
        let _ = writeln!(
            out,
            "Completion   {:>8}",
            s.completion_rate
                .map(|r| format!("{:.1}%", r))
                .unwrap_or_else(|| "N/A".to_string())
        );
        let cycle = if s.average_cycle_time_days > 0.0 {
            format!("{:.1} days", s.average_cycle_time_days)
        } else {
            "N/A".to_string()
        };
        let _ = writeln!(out, "Avg. cycle   {:>8}", cycle);

        section(&mut out, "Activity by day");
        let active: Vec<&TimelineRow> = self
            .timeline
            .iter()
            .filter(|r| r.created > 0 || r.completed > 0)
            .collect();
        if active.is_empty() {
            out.push_str("  No activity in this period.\n");
        } else {
            let _ = writeln!(out, "  {:<12} {:>8} {:>10}", "Date", "Created", "Completed");
            for row in active {
                let _ = writeln!(
                    out,
                    "  {:<12} {:>8} {:>10}",
                    row.date.to_string(),
                    row.created,
                    row.completed
                );
            }
        }

        section(&mut out, "Productivity ranking");
        if self.ranking.is_empty() {
            out.push_str("  No cards created in this period.\n");
        } else {
            let width = name_width(self.ranking.iter().map(|r| r.member.as_str()));
            let _ = writeln!(
                out,
                "  {:<width$} {:>8} {:>10} {:>7}",
                "Member", "Created", "Completed", "Rate"
            );
            for row in &self.ranking {
                let _ = writeln!(
                    out,
                    "  {:<width$} {:>8} {:>10} {:>6.1}%",
                    row.member, row.created, row.completed, row.completion_rate
                );
            }
        }

        section(&mut out, "Labels");
        if self.by_label.is_empty() {
            out.push_str("  No cards created in this period.\n");
        } else {
            let total: usize = self.by_label.iter().map(|l| l.count).sum();
            let width = name_width(self.by_label.iter().map(|l| l.label.as_str()));
            for row in &self.by_label {
                let share = row.count as f64 / total as f64 * 100.0;
                let _ = writeln!(out, "  {:<width$} {:>6} {:>6.1}%", row.label, row.count, share);
            }
        }

        section(&mut out, "Lists");
        let width = name_width(self.by_list.iter().map(|l| l.list.as_str()));
        for row in &self.by_list {
            let _ = writeln!(out, "  {:<width$} {:>6}", row.list, row.count);
        }

        section(&mut out, "Overdue cards");
        if self.overdue.is_empty() {
            out.push_str("  No overdue cards.\n");
        } else {
            for card in &self.overdue {
                let due = card
                    .due
                    .map(|d| d.date_in(None).format("%d/%m/%Y").to_string())
                    .unwrap_or_default();
                let members = if card.members.is_empty() {
                    UNASSIGNED.to_string()
                } else {
                    card.members.join(", ")
                };
                let _ = writeln!(out, "  {}  {} [{}] ({})", due, card.name, card.list, members);
            }
        }

        section(&mut out, "Board totals");
        let t = &self.totals;
        let _ = writeln!(
            out,
            "  Lists {}  Members {}  Cards {}  Labels {}",
            format_count(t.lists),
            format_count(t.members),
            format_count(t.cards),
            format_count(t.labels)
        );

        out
    }

    /// Write the report as pretty JSON.
    pub fn export_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file =
            fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

fn section(out: &mut String, title: &str) {
    let _ = write!(out, "\n{}\n{}\n", title, "-".repeat(title.chars().count()));
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(|n| n.chars().count()).max().unwrap_or(0).max(6)
}

/// `1234567` as `1,234,567`.
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BoardModel, ModelOptions};
    use boardpulse_types::{Action, Snapshot};
    use chrono::{DateTime, FixedOffset};
    use tempfile::NamedTempFile;

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn report() -> Report {
        let snapshot = Snapshot::builder()
            .fetched_at(ts("2024-01-10T12:00:00Z"))
            .board("b1", "Platform")
            .list("l-doing", "Doing")
            .list("l-done", "Done")
            .member("m1", "Ana")
            .card("c1", "Ship", |c| {
                c.list("l-done")
                    .member("m1")
                    .label("lb1", "bug")
                    .action(Action::created(ts("2024-01-01T10:00:00Z")))
                    .action(Action::moved(ts("2024-01-05T10:00:00Z"), "Doing", "Done"))
            })
            .card("c2", "Late", |c| {
                c.list("l-doing")
                    .due(ts("2023-12-31T00:00:00Z"))
                    .action(Action::created(ts("2024-01-02T10:00:00Z")))
            })
            .build();

        let options = ModelOptions::default()
            .with_now(DateTime::parse_from_rfc3339("2024-01-10T12:00:00Z").unwrap());
        let model = BoardModel::build(&snapshot, &options).unwrap();
        let engine = MetricEngine::new(&model);
        let range = DateRange::from_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();

        Report::compute(&engine, &range, snapshot.fetched_at).unwrap()
    }

    #[test]
    fn test_compute_summary() {
        let report = report();
        assert_eq!(report.board, "Platform");
        assert_eq!(
            report.summary,
            Summary {
                created: 2,
                completed: 1,
                in_progress: 1,
                overdue: 1,
                completion_rate: Some(50.0),
                average_cycle_time_days: 4.0,
            }
        );
        assert_eq!(report.range.days, 10);
        assert_eq!(report.overdue[0].name, "Late");
    }

    #[test]
    fn test_render_text() {
        let text = report().render_text();
        assert!(text.contains("Board: Platform"));
        assert!(text.contains("Completion      50.0%"));
        assert!(text.contains("4.0 days"));
        assert!(text.contains("31/12/2023  Late [Doing] (Unassigned)"));
        assert!(text.contains("Lists 2  Members 1  Cards 2  Labels 0"));
    }

    #[test]
    fn test_export_json() {
        let file = NamedTempFile::new().unwrap();
        report().export_json(file.path()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(json["board"], "Platform");
        assert_eq!(json["summary"]["created"], 2);
        assert_eq!(json["timeline"].as_array().unwrap().len(), 10);
        assert_eq!(json["timeline"][0]["date"], "2024-01-01");
        assert_eq!(json["ranking"][0]["completion_rate"], 100.0);
        assert_eq!(json["fetched_at"], "2024-01-10T12:00:00Z");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
