//! Plain-terminal rendering of the three-column board.

use std::fmt::Write;

use console::style;

use planpilot_common::{Board, ColumnView, Priority, Task};

use super::icons;

/// One card: short id, priority glyph, title, optional due date.
pub fn render_task_line(task: &Task) -> String {
    let short_id: String = task.id.to_string().chars().take(8).collect();
    let title = match task.priority {
        Priority::High => style(task.title.as_str()).red().bold(),
        Priority::Medium => style(task.title.as_str()).yellow(),
        Priority::Low => style(task.title.as_str()),
    };
    let mut line = format!(
        "{} {} {}",
        style(short_id).dim(),
        icons::priority(task.priority),
        title
    );
    if let Some(due) = task.due_date {
        let _ = write!(line, "  {}{}", icons::CALENDAR, style(due).cyan());
    }
    line
}

fn render_column(out: &mut String, column: &ColumnView<'_>) {
    let _ = writeln!(
        out,
        "{}{} {}",
        icons::COLUMN,
        style(column.status.as_str()).bold().underlined(),
        style(format!("({})", column.tasks.len())).dim()
    );
    if column.tasks.is_empty() {
        let _ = writeln!(out, "    {}", style("no tasks").dim().italic());
    }
    for task in &column.tasks {
        let _ = writeln!(out, "  {:>3}  {}", task.position, render_task_line(task));
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "         {}", style(description).dim());
        }
    }
}

/// Render every column of `board`, separated by blank lines.
pub fn render_board(board: &Board<'_>) -> String {
    let mut out = String::new();
    for (i, column) in board.columns.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_column(&mut out, column);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use planpilot_common::{ColumnSort, TaskFilter, TaskStatus};
    use uuid::Uuid;

    fn task(title: &str, status: TaskStatus, position: u32) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            owner: Uuid::nil(),
            title: title.into(),
            description: None,
            due_date: None,
            status,
            priority: Priority::Low,
            position,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_render_board_lists_columns_in_order() {
        let mut ship = task("Ship it", TaskStatus::Done, 0);
        ship.description = Some("release v1".into());
        let tasks = vec![task("Plan", TaskStatus::ToDo, 0), ship];
        let board = Board::build(&tasks, &TaskFilter::default(), ColumnSort::Position);

        let out = console::strip_ansi_codes(&render_board(&board)).to_string();
        let todo = out.find("To Do").unwrap();
        let progress = out.find("In Progress").unwrap();
        let done = out.find("Done").unwrap();
        assert!(todo < progress && progress < done);
        assert!(out.contains("Plan"));
        assert!(out.contains("release v1"));
        assert!(out.contains("no tasks"));
    }

    #[test]
    fn test_task_line_shows_short_id_and_due_date() {
        let mut t = task("Taxes", TaskStatus::ToDo, 0);
        t.due_date = NaiveDate::from_ymd_opt(2025, 4, 15);
        let line = console::strip_ansi_codes(&render_task_line(&t)).to_string();
        assert!(line.starts_with(&t.id.to_string()[..8]));
        assert!(line.contains("Taxes"));
        assert!(line.contains("2025-04-15"));
    }
}
