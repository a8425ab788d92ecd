use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::{
    entry::{LogEntry, LogLevel},
    handlers::Handler,
};

/// Read-only queries over everything a handler has stored.
///
/// Each query fetches the full record set again, so entries persisted between
/// two calls are visible to the second one. Queries never fail: a handler
/// error is reported and treated as an empty record set.
pub struct Reader<'a> {
    handler: &'a dyn Handler,
}

impl<'a> Reader<'a> {
    pub fn new(handler: &'a dyn Handler) -> Self {
        Self { handler }
    }

    /// Every stored entry, in the order the handler returns them.
    pub fn all(&self) -> Vec<LogEntry> {
        match self.handler.retrieve_all() {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!(
                    target: crate::TARGET,
                    "failed to retrieve logs from {} handler: {}",
                    self.handler.name(),
                    err
                );
                Vec::new()
            }
        }
    }

    pub fn find_by_text(&self, text: &str, case_sensitive: bool) -> Vec<LogEntry> {
        let needle = if case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        };

        self.all()
            .into_iter()
            .filter(|entry| {
                if case_sensitive {
                    entry.message.contains(&needle)
                } else {
                    entry.message.to_lowercase().contains(&needle)
                }
            })
            .collect()
    }

    /// An unknown level name is reported and matches nothing.
    pub fn find_by_level(&self, level: &str) -> Vec<LogEntry> {
        let level = match level.parse::<LogLevel>() {
            Ok(level) => level,
            Err(err) => {
                log::warn!(target: crate::TARGET, "{}", err);
                return Vec::new();
            }
        };

        self.all()
            .into_iter()
            .filter(|entry| entry.level == level)
            .collect()
    }

    /// Both ends are inclusive.
    pub fn find_by_date_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<LogEntry> {
        self.all()
            .into_iter()
            .filter(|entry| start <= entry.timestamp && entry.timestamp <= end)
            .collect()
    }

    /// Has a key for each of the five levels, even the ones with no entries.
    pub fn group_by_level(&self) -> BTreeMap<LogLevel, Vec<LogEntry>> {
        let mut groups: BTreeMap<LogLevel, Vec<LogEntry>> =
            LogLevel::ALL.into_iter().map(|level| (level, Vec::new())).collect();

        for entry in self.all() {
            groups.entry(entry.level).or_default().push(entry);
        }

        groups
    }

    /// Stable: entries with equal timestamps keep their stored order either way.
    pub fn sort_by_date(&self, ascending: bool) -> Vec<LogEntry> {
        let mut entries = self.all();
        if ascending {
            entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        } else {
            entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct Fixed(Mutex<Vec<LogEntry>>);

    impl Handler for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn persist(&self, entry: &LogEntry) -> Result<()> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    struct Broken;

    impl Handler for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn persist(&self, _entry: &LogEntry) -> Result<()> {
            Ok(())
        }

        fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
            Err(Error::Corruption("unreadable".into()))
        }
    }

    fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn sample() -> Fixed {
        Fixed(Mutex::new(vec![
            LogEntry::new(ts(1, 10, 0), LogLevel::Info, "User logged in."),
            LogEntry::new(ts(1, 10, 5), LogLevel::Warning, "Low disk space."),
            LogEntry::new(ts(1, 10, 15), LogLevel::Info, "Application started successfully."),
            LogEntry::new(ts(2, 11, 0), LogLevel::Error, "Database connection failed."),
            LogEntry::new(ts(2, 11, 30), LogLevel::Debug, "System heartbeat check."),
        ]))
    }

    fn messages(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_find_by_text() {
        let handler = sample();
        let reader = Reader::new(&handler);

        assert_eq!(
            messages(&reader.find_by_text("user logged", false)),
            vec!["User logged in."]
        );
        assert!(reader.find_by_text("database", true).is_empty());
        assert_eq!(
            messages(&reader.find_by_text("Database", true)),
            vec!["Database connection failed."]
        );
        assert_eq!(reader.find_by_text("", false).len(), 5);
    }

    #[test]
    fn test_find_by_level() {
        let handler = sample();
        let reader = Reader::new(&handler);

        assert_eq!(
            messages(&reader.find_by_level("info")),
            vec!["User logged in.", "Application started successfully."]
        );
        assert_eq!(reader.find_by_level("ERROR").len(), 1);
        assert!(reader.find_by_level("CRITICAL").is_empty());
        assert!(reader.find_by_level("NOTICE").is_empty());
    }

    #[test]
    fn test_find_by_date_range_is_inclusive() {
        let handler = sample();
        let reader = Reader::new(&handler);

        let found = reader.find_by_date_range(ts(1, 10, 5), ts(2, 11, 0));
        assert_eq!(
            messages(&found),
            vec![
                "Low disk space.",
                "Application started successfully.",
                "Database connection failed."
            ]
        );
        assert!(reader.find_by_date_range(ts(3, 0, 0), ts(4, 0, 0)).is_empty());
    }

    #[test]
    fn test_group_by_level_has_every_level() {
        let handler = sample();
        let groups = Reader::new(&handler).group_by_level();

        assert_eq!(groups.len(), 5);
        assert_eq!(groups[&LogLevel::Info].len(), 2);
        assert!(groups[&LogLevel::Critical].is_empty());
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 5);
    }

    #[test]
    fn test_sort_by_date_is_stable() {
        let same = ts(5, 9, 0);
        let handler = Fixed(Mutex::new(vec![
            LogEntry::new(same, LogLevel::Info, "tie-1"),
            LogEntry::new(ts(4, 9, 0), LogLevel::Info, "earliest"),
            LogEntry::new(same, LogLevel::Error, "tie-2"),
            LogEntry::new(ts(6, 9, 0), LogLevel::Info, "latest"),
        ]));
        let reader = Reader::new(&handler);

        assert_eq!(
            messages(&reader.sort_by_date(true)),
            vec!["earliest", "tie-1", "tie-2", "latest"]
        );
        assert_eq!(
            messages(&reader.sort_by_date(false)),
            vec!["latest", "tie-1", "tie-2", "earliest"]
        );
    }

    #[test]
    fn test_queries_see_new_entries() {
        let handler = sample();
        let reader = Reader::new(&handler);
        assert_eq!(reader.find_by_level("critical").len(), 0);

        handler
            .persist(&LogEntry::new(ts(3, 12, 0), LogLevel::Critical, "Disk full."))
            .unwrap();
        assert_eq!(reader.find_by_level("critical").len(), 1);
    }

    #[test]
    fn test_retrieval_failure_yields_empty_results() {
        let reader = Reader::new(&Broken);

        assert!(reader.all().is_empty());
        assert!(reader.find_by_text("x", false).is_empty());
        assert!(reader.sort_by_date(true).is_empty());

        let groups = reader.group_by_level();
        assert_eq!(groups.len(), 5);
        assert!(groups.values().all(Vec::is_empty));
    }
}
