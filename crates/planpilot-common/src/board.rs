//! Column grouping, search and priority filtering for display.

use std::str::FromStr;

use crate::ParseError;
use crate::task::{Priority, Task, TaskStatus};

/// Search/priority filter applied before grouping tasks into columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring matched against title and description.
    pub search: Option<String>,
    /// `None` means every priority.
    pub priority: Option<Priority>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                task.title.to_lowercase().contains(&term)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&term))
            }
        };
        let matches_priority = self.priority.is_none_or(|p| p == task.priority);
        matches_search && matches_priority
    }
}

/// Ordering of cards inside a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnSort {
    #[default]
    Position,
    /// Most urgent first, position as tie-breaker.
    Priority,
}

impl FromStr for ColumnSort {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "position" => Ok(Self::Position),
            "priority" => Ok(Self::Priority),
            _ => Err(ParseError::InvalidSort(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnView<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone)]
pub struct Board<'a> {
    pub columns: Vec<ColumnView<'a>>,
}

impl<'a> Board<'a> {
    pub fn build(tasks: &'a [Task], filter: &TaskFilter, sort: ColumnSort) -> Self {
        let columns = TaskStatus::ALL
            .iter()
            .map(|status| {
                let mut column: Vec<&Task> = tasks
                    .iter()
                    .filter(|t| t.status == *status && filter.matches(t))
                    .collect();
                match sort {
                    ColumnSort::Position => column.sort_by_key(|t| t.position),
                    ColumnSort::Priority => column.sort_by_key(|t| (t.priority.rank(), t.position)),
                }
                ColumnView {
                    status: *status,
                    tasks: column,
                }
            })
            .collect();
        Self { columns }
    }

    pub fn column(&self, status: TaskStatus) -> Option<&ColumnView<'a>> {
        self.columns.iter().find(|c| c.status == status)
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn task(title: &str, description: Option<&str>, status: TaskStatus, priority: Priority, position: u32) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            owner: Uuid::nil(),
            title: title.into(),
            description: description.map(String::from),
            due_date: None,
            status,
            priority,
            position,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("Fix login", Some("OAuth redirect loop"), TaskStatus::ToDo, Priority::High, 1),
            task("Write docs", None, TaskStatus::ToDo, Priority::Low, 0),
            task("Review PR", Some("login refactor"), TaskStatus::InProgress, Priority::Medium, 0),
            task("Ship", None, TaskStatus::Done, Priority::High, 0),
        ]
    }

    #[test]
    fn test_board_has_three_columns_in_order() {
        let tasks = sample();
        let board = Board::build(&tasks, &TaskFilter::default(), ColumnSort::Position);
        let statuses: Vec<_> = board.columns.iter().map(|c| c.status).collect();
        assert_eq!(statuses, TaskStatus::ALL.to_vec());
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn test_position_sort() {
        let tasks = sample();
        let board = Board::build(&tasks, &TaskFilter::default(), ColumnSort::Position);
        let todo = board.column(TaskStatus::ToDo).unwrap();
        assert_eq!(todo.tasks[0].title, "Write docs");
        assert_eq!(todo.tasks[1].title, "Fix login");
    }

    #[test]
    fn test_priority_sort_puts_urgent_first() {
        let tasks = sample();
        let board = Board::build(&tasks, &TaskFilter::default(), ColumnSort::Priority);
        let todo = board.column(TaskStatus::ToDo).unwrap();
        assert_eq!(todo.tasks[0].title, "Fix login");
    }

    #[test]
    fn test_search_matches_title_and_description_case_insensitively() {
        let tasks = sample();
        let filter = TaskFilter {
            search: Some("LOGIN".into()),
            priority: None,
        };
        let board = Board::build(&tasks, &filter, ColumnSort::Position);
        assert_eq!(board.len(), 2);
        assert_eq!(board.column(TaskStatus::InProgress).unwrap().tasks.len(), 1);
    }

    #[test]
    fn test_priority_filter() {
        let tasks = sample();
        let filter = TaskFilter {
            search: None,
            priority: Some(Priority::High),
        };
        let board = Board::build(&tasks, &filter, ColumnSort::Position);
        assert_eq!(board.len(), 2);
        assert!(board.column(TaskStatus::InProgress).unwrap().tasks.is_empty());
    }

    #[test]
    fn test_blank_search_matches_everything() {
        let tasks = sample();
        let filter = TaskFilter {
            search: Some("   ".into()),
            priority: None,
        };
        assert!(tasks.iter().all(|t| filter.matches(t)));
    }
}
