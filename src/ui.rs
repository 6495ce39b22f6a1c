pub mod charting;

use chrono::{Duration as DateDuration, Local};
use keypace::{
    ghost::{GhostPosition, Pace},
    session::TestMode,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
/// Words kept visible behind the cursor
const WORDS_BEHIND: usize = 10;
const WORDS_AHEAD: usize = 40;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Typing => render_typing(self, area, buf),
            Screen::Results => render_results(self, area, buf),
            Screen::Stats => render_stats(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let elapsed = session.elapsed_secs_at(app.now);
    let (cursor_word, cursor_char) = session.cursor();
    let ghost = app
        .ghost
        .as_ref()
        .filter(|_| session.is_running())
        .map(|g| g.position_at(elapsed))
        .filter(|p| p.is_active);

    let first = cursor_word.saturating_sub(WORDS_BEHIND);
    let last = (cursor_word + WORDS_AHEAD).min(session.words().len());

    let mut spans: Vec<Span> = Vec::new();
    for idx in first..last {
        let target: Vec<char> = session.words()[idx].chars().collect();
        let typed = session.typed(idx);
        let len = target.len().max(typed.len());
        for pos in 0..=len {
            let is_cursor = idx == cursor_word && pos == cursor_char;
            let is_ghost = ghost.is_some_and(|g: GhostPosition| {
                g.word_index == idx && g.char_index == pos
            });
            let (symbol, mut style) = match (typed.get(pos), target.get(pos)) {
                (Some(&t), Some(&e)) if t == e => (e.to_string(), bold().fg(Color::Green)),
                (Some(_), Some(&e)) => (e.to_string(), bold().fg(Color::Red)),
                (Some(&t), None) => (
                    t.to_string(),
                    bold().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
                ),
                (None, Some(&e)) => (e.to_string(), dim_bold()),
                (None, None) => (" ".to_string(), Style::default()),
            };
            if is_ghost {
                style = style.bg(Color::Magenta);
            }
            if is_cursor {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            spans.push(Span::styled(symbol, style));
        }
    }

    let prompt_width: usize = spans.iter().map(|s| s.content.width()).sum();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines = ((prompt_width as f64 / max_chars_per_line as f64).ceil() as u16).max(1);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(area.height.saturating_sub(prompt_lines + 4) / 2),
            Constraint::Length(2),
            Constraint::Length(prompt_lines),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let status = status_line(app, elapsed);
    Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Line::from(spans))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    let legend = if session.is_running() && session.config().mode == TestMode::Zen {
        "(esc) finish / (tab) new test"
    } else {
        "(tab) new test / (ctrl+s) stats / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, Style::default().add_modifier(Modifier::ITALIC)))
        .render(chunks[4], buf);
}

fn status_line(app: &App, elapsed: f64) -> Vec<Span<'static>> {
    let session = &app.session;
    if !session.is_running() {
        return vec![Span::styled(
            format!("{} - start typing", config_label(app)),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )];
    }

    let progress = match (session.config().mode, session.config().duration_secs) {
        (TestMode::Time, Some(limit)) => format!("{:.1}", (limit as f64 - elapsed).max(0.0)),
        (TestMode::Zen, _) => format!("{}", session.cursor().0 + 1),
        _ => format!("{}/{}", session.cursor().0 + 1, session.words().len()),
    };
    let mut spans = vec![
        Span::styled(progress, dim_bold()),
        Span::raw("   "),
        Span::styled(format!("{} wpm", session.current_wpm_at(app.now)), dim_bold()),
    ];

    let offset = session.char_offset();
    if let Some(pace) = app.ghost.as_ref().and_then(|g| g.compare_at(elapsed, offset)) {
        let (label, color) = match pace {
            Pace::Ahead => ("ahead of ghost", Color::Green),
            Pace::Level => ("level with ghost", Color::Yellow),
            Pace::Behind => ("behind ghost", Color::Magenta),
        };
        spans.push(Span::raw("   "));
        spans.push(Span::styled(label, Style::default().fg(color)));
    }
    spans
}

fn config_label(app: &App) -> String {
    let cfg = app.session.config();
    let base = match (cfg.mode, cfg.duration_secs) {
        (TestMode::Time, Some(secs)) => format!("time {secs}s"),
        (TestMode::Words, _) => format!("words {}", cfg.word_count),
        (mode, _) => mode.to_string(),
    };
    let mut extras = Vec::new();
    if app.config.punctuation {
        extras.push("punctuation");
    }
    if app.config.numbers {
        extras.push("numbers");
    }
    if extras.is_empty() {
        base
    } else {
        format!("{base} + {}", extras.join(" + "))
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(report) = &app.report else {
        return;
    };
    let result = &report.result;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // headline stats
            Constraint::Length(1), // pb / streak
            Constraint::Length(2), // achievements and goals
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let (overall_duration, highest_wpm) = charting::compute_chart_params(
        &result.samples,
        result.duration_secs.map(|s| s as f64),
    );
    let raw = charting::raw_points(&result.samples);
    let smoothed = charting::smoothed_points(&result.samples);
    let datasets = vec![
        Dataset::default()
            .name("wpm")
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&raw),
        Dataset::default()
            .name("smoothed")
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Cyan))
            .graph_type(GraphType::Line)
            .data(&smoothed),
    ];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(charting::format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm.max(1.0)])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(highest_wpm), bold()),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {} raw   {}% acc   {}% consistency   {} best streak",
            result.wpm, result.raw_wpm, result.accuracy, result.consistency, result.best_streak
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let mut notes = Vec::new();
    if result.is_personal_best {
        notes.push(Span::styled(
            "new personal best!   ",
            bold().fg(Color::Yellow),
        ));
    }
    let streak = app.tracker.streak();
    notes.push(Span::styled(
        format!("{} day streak (longest {})", streak.current, streak.longest),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ));
    Paragraph::new(Line::from(notes))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let mut unlocked: Vec<String> = report
        .unlocked
        .iter()
        .map(|u| format!("{} {}", u.icon, u.title))
        .collect();
    unlocked.extend(
        report
            .completed_goals
            .iter()
            .map(|g| format!("goal met: {} {} {}", g.period, g.kind, g.target)),
    );
    if !unlocked.is_empty() {
        Paragraph::new(unlocked.join("   "))
            .style(Style::default().fg(Color::Green))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);
    }

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (s)tats / (m)ode / (p)unctuation / (#) numbers / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[5], buf);
}

fn render_stats(app: &App, area: Rect, buf: &mut Buffer) {
    let tracker = &app.tracker;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // summary
            Constraint::Min(6),    // keys and achievements
            Constraint::Length(3), // activity
            Constraint::Length(1), // legend
        ])
        .split(area);

    let summary = tracker.history().summary();
    let today = Local::now().date_naive();
    Paragraph::new(format!(
        "{} tests   best {} wpm   avg {:.0} wpm   avg {:.0}% acc   streak {} (longest {})",
        summary.tests,
        summary.best_wpm,
        summary.average_wpm,
        summary.average_accuracy,
        tracker.streak().current_on(today),
        tracker.streak().longest
    ))
    .block(Block::default().borders(Borders::ALL).title("Stats"))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let header = Row::new(vec!["Key", "Hits", "Misses", "Miss rate"]).style(bold());
    let rows: Vec<Row> = tracker
        .heatmap()
        .weakest(columns[0].height.saturating_sub(3) as usize)
        .into_iter()
        .map(|(key, stats)| {
            let rate = stats.miss_rate() * 100.0;
            let rate_style = if rate > 10.0 {
                Style::default().fg(Color::Red)
            } else if rate > 5.0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Green)
            };
            Row::new(vec![
                Cell::from(key.to_string()),
                Cell::from(stats.hits.to_string()),
                Cell::from(stats.misses.to_string()),
                Cell::from(format!("{rate:.1}%")).style(rate_style),
            ])
        })
        .collect();
    Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Weakest keys"))
    .render(columns[0], buf);

    let achievements: Vec<Line> = tracker
        .achievements()
        .unlocked()
        .iter()
        .map(|u| Line::from(format!("{} {} - {}", u.icon, u.title, u.description)))
        .chain(tracker.goals().iter().map(|g| {
            Line::from(format!(
                "{} {} goal: {}/{}{}",
                g.period,
                g.kind,
                g.current,
                g.target,
                if g.completed { " done" } else { "" }
            ))
        }))
        .collect();
    Paragraph::new(achievements)
        .block(Block::default().borders(Borders::ALL).title("Achievements & goals"))
        .wrap(Wrap { trim: true })
        .render(columns[1], buf);

    let calendar = tracker.calendar();
    let days = calendar.range(today - DateDuration::days(13), today);
    let cells: Vec<Span> = days
        .iter()
        .map(|&(_, n)| {
            let color = match n {
                0 => Color::DarkGray,
                1 => Color::Green,
                2..=4 => Color::LightGreen,
                _ => Color::Yellow,
            };
            Span::styled("■ ", Style::default().fg(color))
        })
        .collect();
    Paragraph::new(Line::from(cells))
        .block(Block::default().borders(Borders::ALL).title("Last 14 days"))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        "(b)ack / (n)ew / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[3], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypace::config::Config;
    use keypace::input::InputAction;
    use keypace::tracker::Tracker;
    use keypace::words::BundledText;
    use std::time::{Duration, Instant};

    fn rendered(app: &App) -> String {
        let area = Rect::new(0, 0, 100, 30);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    fn words_app() -> App {
        let config = Config {
            mode: TestMode::Words,
            word_count: 5,
            ..Config::default()
        };
        App::new(config, Tracker::new("ui"), Box::new(BundledText::load().unwrap()))
    }

    #[test]
    fn test_idle_prompt_shows_label_and_words() {
        let app = words_app();
        let content = rendered(&app);
        assert!(content.contains("words 5 - start typing"));
        let first_word = app.session.words()[0].clone();
        assert!(content.contains(&first_word));
    }

    #[test]
    fn test_running_shows_word_progress() {
        let mut app = words_app();
        let now = Instant::now();
        let first = app.session.words()[0].clone();
        for c in first.chars() {
            app.session.apply_at(InputAction::Type(c), now);
        }
        app.now = now + Duration::from_secs(2);
        let content = rendered(&app);
        assert!(content.contains("1/5"));
        assert!(content.contains("wpm"));
    }

    #[test]
    fn test_results_and_stats_render() {
        let mut app = words_app();
        let now = Instant::now();
        let words = app.session.words().to_vec();
        for (i, word) in words.iter().enumerate() {
            for c in word.chars() {
                app.session.apply_at(InputAction::Type(c), now);
            }
            if i + 1 < words.len() {
                app.session.apply_at(InputAction::Advance, now);
            }
        }
        app.report = app.tracker.finish(&mut app.session, now + Duration::from_secs(5));
        app.screen = Screen::Results;
        let content = rendered(&app);
        assert!(content.contains("consistency"));
        assert!(content.contains("new personal best!"));
        assert!(content.contains("First Steps"));

        app.screen = Screen::Stats;
        let content = rendered(&app);
        assert!(content.contains("Weakest keys"));
        assert!(content.contains("1 tests"));
    }

    #[test]
    fn test_config_label_lists_extras() {
        let mut app = words_app();
        app.config.punctuation = true;
        app.config.numbers = true;
        assert_eq!(config_label(&app), "words 5 + punctuation + numbers");
    }
}
