use anyhow::Result;
use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use todo_sync_core::{FilterMode, Task};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]/[month]/[year] [hour]:[minute]");

/// Plain-text rendering of task lists.
#[derive(Debug, Clone, Copy)]
pub struct TaskView {
    offset: UtcOffset,
}

impl TaskView {
    pub const fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Render a creation timestamp as `dd/mm/yyyy HH:MM` in the local offset.
    pub fn format_date(&self, millis: i64) -> String {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .ok()
            .and_then(|at| at.to_offset(self.offset).format(DATE_FORMAT).ok())
            .unwrap_or_else(|| "-".to_owned())
    }

    pub fn render_table(&self, tasks: &[Task], filter: FilterMode) -> String {
        if tasks.is_empty() {
            return if filter == FilterMode::All {
                "No tasks found".to_owned()
            } else {
                format!("No tasks matched the filter ({})", filter.label())
            };
        }

        let mut out = String::from("ID | Done | Title | Description | Date\n");
        out.push_str("-- | ---- | ----- | ----------- | ----\n");
        for task in tasks {
            let done = if task.completed { "[x]" } else { "[ ]" };
            let description = if task.description.is_empty() {
                "-"
            } else {
                task.description.as_str()
            };
            out.push_str(&format!(
                "{} | {done} | {} | {description} | {}\n",
                task.id,
                task.title,
                self.format_date(task.date)
            ));
        }
        out.pop();
        out
    }

    pub fn render_json(tasks: &[Task]) -> Result<String> {
        Ok(serde_json::to_string_pretty(tasks)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use todo_sync_core::TaskId;

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: TaskId::from(id),
            title: format!("title {id}"),
            description: String::new(),
            completed,
            date: 1_700_000_000_000,
        }
    }

    #[test]
    fn dates_render_day_first() {
        let view = TaskView::new(UtcOffset::UTC);
        assert_eq!(view.format_date(1_700_000_000_000), "14/11/2023 22:13");
        assert_eq!(view.format_date(0), "01/01/1970 00:00");
    }

    #[test]
    fn dates_follow_the_offset() -> Result<()> {
        let view = TaskView::new(UtcOffset::from_hms(2, 0, 0)?);
        assert_eq!(view.format_date(0), "01/01/1970 02:00");
        Ok(())
    }

    #[test]
    fn table_marks_completed_tasks() {
        let view = TaskView::new(UtcOffset::UTC);
        let table = view.render_table(&[task("a", true), task("b", false)], FilterMode::All);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "a | [x] | title a | - | 14/11/2023 22:13");
        assert_eq!(lines[3], "b | [ ] | title b | - | 14/11/2023 22:13");
    }

    #[test]
    fn empty_messages_depend_on_filter() {
        let view = TaskView::new(UtcOffset::UTC);
        assert_eq!(view.render_table(&[], FilterMode::All), "No tasks found");
        assert_eq!(
            view.render_table(&[], FilterMode::Completed),
            "No tasks matched the filter (Completed)"
        );
    }

    #[test]
    fn json_lists_records() -> Result<()> {
        let json = TaskView::render_json(&[task("a", false)])?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value[0]["id"], "a");
        assert_eq!(value[0]["completed"], false);
        Ok(())
    }
}
