use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::browse::lines::{tree_lines, viewport};
use crate::output::OutputLog;

/// Draw the whole frame: player output, command output, and the input
/// line on the left; the browse tree on the right.
pub fn render(app: &App, frame: &mut Frame) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(frame.area());
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(columns[0]);

    render_log(frame, left[0], &app.player_log, "player");
    render_log(frame, left[1], &app.log, "output");
    render_input(app, frame, left[2]);
    render_tree(app, frame, columns[1]);
}

/// Tail of an output log that fits the pane.
fn render_log(frame: &mut Frame, area: Rect, log: &OutputLog, title: &str) {
    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = log.tail(height).iter().map(|l| Line::raw(l.as_str())).collect();
    let pane = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(pane, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let title = if app.terminal.script_being_written() {
        "input (recording)"
    } else {
        "input"
    };
    let pane = Paragraph::new(app.terminal.line())
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(pane, area);
}

fn render_tree(app: &App, frame: &mut Frame, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let height = area.height.saturating_sub(2) as usize;
    let (lines, selected) = tree_lines(&app.tree, width);
    let window = viewport(lines.len(), selected, height);

    let rendered: Vec<Line> = lines[window]
        .iter()
        .map(|line| {
            let mut style = Style::default();
            if line.is_dir {
                style = style.add_modifier(Modifier::BOLD);
            }
            if line.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::styled(line.text.clone(), style)
        })
        .collect();

    let title = if app.tree.search().is_empty() {
        "browse".to_string()
    } else {
        format!("browse /{}", app.tree.search())
    };
    let pane =
        Paragraph::new(rendered).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(pane, area);
}
