use std::io::{self, IsTerminal, Write};

use rota_timeline::config::LayoutConfig;
use rota_timeline::layout::{BarGeometry, TimelineLayout};
use rota_timeline::{Granularity, ItemKind};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal columns reserved for the lane label on the left.
pub const LABEL_COLUMNS: usize = 10;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    /// Layout sizes in character cells rather than pixels, so the
    /// shared geometry maps straight onto terminal columns.
    pub fn layout_config(granularity: Granularity) -> LayoutConfig {
        let cell_width = match granularity {
            Granularity::Day => 3.0,
            Granularity::Month => 5.0,
        };
        LayoutConfig {
            cell_width,
            label_width: LABEL_COLUMNS as f64,
            lane_height: 1.0,
            lane_gap: 0.0,
            header_height: 2.0,
            min_body_height: 1.0,
        }
    }

    #[tracing::instrument(skip(self, out, layout), fields(columns = layout.columns.len(), lanes = layout.lane_count))]
    pub fn write_timeline<W: Write>(
        &self,
        mut out: W,
        layout: &TimelineLayout,
        dropped: usize,
    ) -> anyhow::Result<()> {
        if layout.is_empty() {
            writeln!(out, "(empty window)")?;
            return Ok(());
        }

        let cell = cols(layout.cell_width).max(1);
        let row_end = LABEL_COLUMNS + cols(layout.grid_width);

        let mut line = fit("", LABEL_COLUMNS);
        for span in &layout.header {
            line.push_str(&self.paint(&fit(&span.label, cols(span.width)), "1"));
        }
        writeln!(out, "{}", line.trim_end())?;

        let mut ruler = fit("", LABEL_COLUMNS);
        let mut markers = fit("", LABEL_COLUMNS);
        for column in &layout.columns {
            let text = fit_right(&column.text, cell.saturating_sub(1));
            let text = format!("{text} ");
            ruler.push_str(&if column.is_today {
                self.paint(&text, "1;33")
            } else if column.is_weekend {
                self.paint(&text, "2")
            } else {
                text
            });
            let marker = if column.is_today {
                "▲"
            } else if column.is_weekend {
                "·"
            } else {
                ""
            };
            markers.push_str(&fit_right(marker, cell.saturating_sub(1)));
            markers.push(' ');
        }
        writeln!(out, "{}", ruler.trim_end())?;
        writeln!(out, "{}", markers.trim_end())?;

        for lane in 0..layout.lane_count {
            let mut bars = layout
                .bars
                .iter()
                .filter(|bar| bar.lane == lane)
                .collect::<Vec<_>>();
            bars.sort_by_key(|bar| bar.start_column);

            let mut row = fit(&format!("lane {}", lane + 1), LABEL_COLUMNS);
            for bar in bars {
                let target = LABEL_COLUMNS + cols(bar.left);
                let gap = target.saturating_sub(visible_width(&row));
                row.push_str(&" ".repeat(gap));
                let width = cols(bar.width).min(row_end.saturating_sub(target));
                row.push_str(&self.paint(&draw_bar(bar, width), bar_color(bar)));
            }
            writeln!(out, "{}", row.trim_end())?;
        }

        if let Some(overlay) = &layout.overlay {
            let width = cols(overlay.width);
            let mut band = "^".repeat(width);
            if overlay.clipped_start && width > 0 {
                band.replace_range(0..1, "<");
            }
            if overlay.clipped_end && width > 0 {
                band.replace_range(width - 1..width, ">");
            }
            writeln!(
                out,
                "{}{}{}  {} ({} days)",
                fit("selected", LABEL_COLUMNS),
                " ".repeat(cols(overlay.left)),
                self.paint(&band, "1;34"),
                overlay.range,
                overlay.range.day_count()
            )?;
        }

        let visible = layout.bars.len();
        writeln!(
            out,
            "{visible} item(s) in {} lane(s), {dropped} outside the window or undated",
            layout.lane_count
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn cols(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.round() as usize
    } else {
        0
    }
}

fn bar_color(bar: &BarGeometry) -> &'static str {
    if bar.cancelled {
        return "31";
    }
    match bar.kind {
        ItemKind::Booking => "36",
        ItemKind::Reservation => "35",
    }
}

/// `[label====]` with `<`/`>` for ends that run past the window.
fn draw_bar(bar: &BarGeometry, width: usize) -> String {
    let fill = if bar.cancelled {
        'x'
    } else {
        match bar.kind {
            ItemKind::Booking => '=',
            ItemKind::Reservation => '-',
        }
    };
    if width < 3 {
        return fill.to_string().repeat(width);
    }
    let open = if bar.clipped_start { '<' } else { '[' };
    let close = if bar.clipped_end { '>' } else { ']' };
    let inner = truncate(&bar.label, width - 2);
    let pad = (width - 2).saturating_sub(UnicodeWidthStr::width(inner.as_str()));
    format!("{open}{inner}{}{close}", fill.to_string().repeat(pad))
}

fn truncate(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let budget = width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    if width > 0 {
        out.push('…');
    }
    out
}

fn fit(text: &str, width: usize) -> String {
    let mut out = truncate(text, width);
    let used = UnicodeWidthStr::width(out.as_str());
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn fit_right(text: &str, width: usize) -> String {
    let out = truncate(text, width);
    let used = UnicodeWidthStr::width(out.as_str());
    format!("{}{out}", " ".repeat(width.saturating_sub(used)))
}

fn visible_width(s: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(s).as_str())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rota_timeline::{
        AxisOptions, Granularity, IntervalItem, SelectionRange, TimelineAxis, WeekendPolicy,
        allocate_lanes, compute_layout,
    };

    use super::{Renderer, fit, strip_ansi, truncate};

    fn render(granularity: Granularity, selection: Option<SelectionRange>) -> String {
        let options = AxisOptions {
            today: NaiveDate::from_ymd_opt(2025, 1, 15).expect("date"),
            weekend: WeekendPolicy::default(),
            max_days: 3_660,
        };
        let axis = TimelineAxis::build(granularity, "2025-01-01", "2025-01-31", &options);
        let items = vec![
            IntervalItem::booking("A", "2025-01-05", "2025-01-10", "Atlas"),
            IntervalItem::booking("B", "2025-01-08", "2025-01-12", "Borealis")
                .with_status("cancelled"),
            IntervalItem::reservation("T", "2025-01-28", "2025-02-05", "Trip"),
        ];
        let plan = allocate_lanes(&axis, &items);
        let layout = compute_layout(
            &axis,
            &plan,
            selection,
            &Renderer::layout_config(granularity),
        );
        let mut out = Vec::new();
        Renderer { color: true }
            .write_timeline(&mut out, &layout, plan.dropped_count())
            .expect("render");
        strip_ansi(&String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn draws_header_lanes_and_selection() {
        let selection = SelectionRange::parse("2025-01-03", "2025-01-04");
        let text = render(Granularity::Day, selection);
        let lines = text.lines().collect::<Vec<_>>();

        assert!(lines[0].contains("January"));
        assert!(lines[1].trim_start().starts_with("1  2  3"));
        assert!(lines[2].contains('▲'));
        assert!(lines[3].starts_with("lane 1"));
        assert!(lines[3].contains("[Atlas"));
        assert!(lines[3].contains("[Trip-"));
        assert!(lines[3].trim_end().ends_with('>'));
        assert!(lines[4].contains("[Borealis"));
        assert!(lines[4].contains('x'));
        assert!(lines[5].starts_with("selected"));
        assert!(lines[5].contains("^^^^^^"));
        assert!(lines[5].contains("2025-01-03 – 2025-01-04 (2 days)"));
        assert!(lines[6].starts_with("3 item(s) in 2 lane(s)"));
    }

    #[test]
    fn month_granularity_uses_short_labels() {
        let text = render(Granularity::Month, None);
        let lines = text.lines().collect::<Vec<_>>();
        assert!(lines[0].contains("2025"));
        assert!(lines[1].contains("Jan"));
        assert!(!text.contains("selected"));
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate("Borealis", 5), "Bore…");
        assert_eq!(truncate("東京出張", 5), "東京…");
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
