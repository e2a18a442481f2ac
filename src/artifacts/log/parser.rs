use crate::artifacts::objects::commit::{CommitRecord, FIELD_SEPARATOR, LOCAL_BRANCH_PREFIX};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::GraphError;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Number of fields in a raw log record
const RECORD_FIELDS: usize = 4;

/// Decoration prefix git puts in front of the checked-out branch
const HEAD_DECORATION_PREFIX: &str = "HEAD -> ";

/// Source of the current time for records without a timestamp
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock frozen at a given instant, in milliseconds
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Commit records keyed by hash, in parse order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    records: Vec<CommitRecord>,
    positions: HashMap<ObjectId, usize>,
}

impl ParsedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless its hash is already present
    ///
    /// # Returns
    ///
    /// true if the record was inserted, false if an earlier record with the same hash wins
    pub fn insert(&mut self, record: CommitRecord) -> bool {
        if self.positions.contains_key(&record.hash) {
            return false;
        }

        self.positions
            .insert(record.hash.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, hash: &ObjectId) -> Option<&CommitRecord> {
        self.positions.get(hash).map(|&index| &self.records[index])
    }

    pub fn contains(&self, hash: &ObjectId) -> bool {
        self.positions.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommitRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<CommitRecord> {
        self.records
    }
}

impl FromIterator<CommitRecord> for ParsedLog {
    fn from_iter<T: IntoIterator<Item = CommitRecord>>(iter: T) -> Self {
        let mut log = ParsedLog::new();
        for record in iter {
            log.insert(record);
        }
        log
    }
}

impl Extend<CommitRecord> for ParsedLog {
    fn extend<T: IntoIterator<Item = CommitRecord>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

/// Parser for the raw graph log format
#[derive(Debug, Clone, Default)]
pub struct LogParser<C: Clock = SystemClock> {
    clock: C,
}

impl LogParser<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> LogParser<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Parse a whole log dump
    ///
    /// Blank lines are skipped, malformed records are dropped and the rest is kept in
    /// the order it was read. A hash seen twice keeps its first record.
    pub fn parse(&self, raw: &str) -> ParsedLog {
        let mut log = ParsedLog::new();

        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }

            match self.parse_line(line) {
                Ok(record) => {
                    if !log.insert(record) {
                        debug!("Skipping duplicate log record: {}", line);
                    }
                }
                Err(err) => debug!("Dropping log record: {}", err),
            }
        }

        log
    }

    /// Parse a single record
    pub fn parse_line(&self, line: &str) -> Result<CommitRecord, GraphError> {
        let fields = line.split(FIELD_SEPARATOR).collect::<Vec<_>>();
        if fields.len() < RECORD_FIELDS {
            return Err(GraphError::Parse(format!(
                "expected {} fields, found {}",
                RECORD_FIELDS,
                fields.len()
            )));
        }

        let hash = ObjectId::try_parse(fields[0].trim().to_string())
            .map_err(|err| GraphError::Parse(err.to_string()))?;

        let parents = fields[1]
            .split_whitespace()
            .filter_map(|token| match ObjectId::try_parse(token.to_string()) {
                Ok(parent) => Some(parent),
                Err(err) => {
                    debug!("Dropping parent of {}: {}", hash, err);
                    None
                }
            })
            .collect::<Vec<_>>();

        let timestamp = match fields[3].trim().parse::<i64>() {
            Ok(secs) => secs.saturating_mul(1000),
            Err(_) => self.clock.now_millis(),
        };

        Ok(CommitRecord {
            hash,
            parents,
            branches: local_branches(fields[2]),
            timestamp,
        })
    }
}

/// Extract local branch names from a comma-separated decoration list
///
/// Only `refs/heads/` references count. The `HEAD -> ` marker git puts in front of the
/// checked-out branch is stripped, tags and remotes are ignored.
pub fn local_branches(decorations: &str) -> BTreeSet<String> {
    decorations
        .split(',')
        .map(str::trim)
        .map(|decoration| {
            decoration
                .strip_prefix(HEAD_DECORATION_PREFIX)
                .unwrap_or(decoration)
        })
        .filter_map(|decoration| decoration.strip_prefix(LOCAL_BRANCH_PREFIX))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
