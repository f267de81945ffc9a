use std::ops::AddAssign;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counts {
    pub candidates: usize,
    /// Only set when the candidates were refined against a time window.
    pub refined: Option<usize>,
    pub previewed: usize,
    pub deleted: usize,
    pub parse_failures: usize,
}

impl AddAssign<&Counts> for Counts {
    fn add_assign(&mut self, other: &Counts) {
        self.candidates += other.candidates;
        self.refined = match (self.refined, other.refined) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        };
        self.previewed += other.previewed;
        self.deleted += other.deleted;
        self.parse_failures += other.parse_failures;
    }
}

impl Counts {
    fn details(&self) -> String {
        let mut parts = vec![format!("{} candidates", self.candidates)];
        if let Some(refined) = self.refined {
            parts.push(format!("{} in time range", refined));
            parts.push(format!("{} unparseable dates", self.parse_failures));
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderReport {
    pub folder: String,
    pub counts: Counts,
}

impl FolderReport {
    pub fn empty(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            counts: Counts::default(),
        }
    }

    pub fn summary_line(&self, dry_run: bool) -> String {
        if dry_run {
            format!(
                "Dry run: would delete {} messages from '{}' ({})",
                self.counts.previewed,
                self.folder,
                self.counts.details()
            )
        } else {
            format!(
                "Deleted {} messages from '{}' ({})",
                self.counts.deleted,
                self.folder,
                self.counts.details()
            )
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub dry_run: bool,
    pub folders: Vec<FolderReport>,
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn totals(&self) -> Counts {
        let mut totals = Counts::default();
        for folder in &self.folders {
            totals += &folder.counts;
        }
        totals
    }

    /// One line per processed folder, plus an aggregate line when several folders were targeted.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .folders
            .iter()
            .map(|f| f.summary_line(self.dry_run))
            .collect();
        for folder in &self.skipped {
            lines.push(format!("Skipped '{}'", folder));
        }
        if self.folders.len() + self.skipped.len() > 1 {
            let totals = self.totals();
            let mut aggregate = if self.dry_run {
                format!(
                    "Dry run summary: would delete {} messages from {} folders",
                    totals.previewed,
                    self.folders.len()
                )
            } else {
                format!(
                    "Total summary: deleted {} messages from {} folders",
                    totals.deleted,
                    self.folders.len()
                )
            };
            if !self.skipped.is_empty() {
                aggregate.push_str(&format!(" ({} skipped)", self.skipped.len()));
            }
            lines.push(aggregate);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::{Counts, FolderReport, RunReport};

    fn folder(name: &str, counts: Counts) -> FolderReport {
        FolderReport {
            folder: name.to_string(),
            counts,
        }
    }

    #[test]
    fn totals_sum_every_folder() {
        let mut report = RunReport::new(false);
        report.folders.push(folder(
            "INBOX",
            Counts {
                candidates: 5,
                refined: Some(3),
                previewed: 3,
                deleted: 2,
                parse_failures: 1,
            },
        ));
        report.folders.push(folder(
            "Archive",
            Counts {
                candidates: 2,
                refined: Some(2),
                previewed: 2,
                deleted: 2,
                parse_failures: 0,
            },
        ));
        let totals = report.totals();
        assert_eq!(totals.candidates, 7);
        assert_eq!(totals.refined, Some(5));
        assert_eq!(totals.deleted, 4);
        assert_eq!(totals.parse_failures, 1);
    }

    #[test]
    fn single_folder_has_no_aggregate_line() {
        let mut report = RunReport::new(true);
        report.folders.push(FolderReport::empty("INBOX"));
        let lines = report.summary_lines();
        assert_eq!(
            lines,
            vec!["Dry run: would delete 0 messages from 'INBOX' (0 candidates)".to_string()]
        );
    }

    #[test]
    fn aggregate_line_mentions_skipped_folders() {
        let mut report = RunReport::new(false);
        report.folders.push(folder(
            "INBOX",
            Counts {
                candidates: 3,
                refined: None,
                previewed: 3,
                deleted: 3,
                parse_failures: 0,
            },
        ));
        report.skipped.push("Missing".to_string());
        let lines = report.summary_lines();
        assert_eq!(lines[0], "Deleted 3 messages from 'INBOX' (3 candidates)");
        assert_eq!(lines[1], "Skipped 'Missing'");
        assert_eq!(lines[2], "Total summary: deleted 3 messages from 1 folders (1 skipped)");
    }
}
