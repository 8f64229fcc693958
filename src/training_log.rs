//! Append-only record of episode scores, one `"<episode>, <score>"` line per episode.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("training log i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("training log line {line} is malformed: {text:?}")]
    Malformed { line: usize, text: String },
}

/// A training log file.
#[derive(Debug, Clone)]
pub struct TrainingLog {
    path: PathBuf,
}

impl TrainingLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        TrainingLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one episode's score.
    pub fn append(&self, episode: u64, score: f64) -> Result<(), LogError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}, {}", episode, score)?;
        Ok(())
    }

    /// Number of the last logged episode, or 0 if nothing was logged yet.
    pub fn last_episode(&self) -> Result<u64, LogError> {
        Ok(self.records()?.last().map_or(0, |&(episode, _)| episode))
    }

    /// Every logged `(episode, score)` pair, in file order. A missing file holds no records.
    pub fn records(&self) -> Result<Vec<(u64, f64)>, LogError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        text.lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| {
                let mut fields = l.split(',').map(str::trim);
                let parsed = match (fields.next(), fields.next(), fields.next()) {
                    (Some(e), Some(s), None) => e.parse::<u64>().ok().zip(s.parse::<f64>().ok()),
                    _ => None,
                };
                parsed.ok_or_else(|| LogError::Malformed {
                    line: i + 1,
                    text: l.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_and_resumes_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let log = TrainingLog::new(dir.path().join("training_log.txt"));
        assert_eq!(log.last_episode().unwrap(), 0);
        assert!(log.records().unwrap().is_empty());

        log.append(1, 12.5).unwrap();
        log.append(2, -3.0).unwrap();
        assert_eq!(log.last_episode().unwrap(), 2);
        assert_eq!(
            fs::read_to_string(log.path()).unwrap(),
            "1, 12.5\n2, -3\n"
        );
        assert_eq!(log.records().unwrap(), vec![(1, 12.5), (2, -3.0)]);
    }

    #[test]
    fn malformed_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "1, 2.0\nbogus\n").unwrap();
        let log = TrainingLog::new(&path);
        assert!(matches!(
            log.last_episode(),
            Err(LogError::Malformed { line: 2, .. })
        ));
        assert!(log.records().is_err());
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "1, 2.5\n\n2, 4\n\n").unwrap();
        let log = TrainingLog::new(&path);
        assert_eq!(log.records().unwrap(), vec![(1, 2.5), (2, 4.0)]);
        assert_eq!(log.last_episode().unwrap(), 2);
    }
}
