//! Normalized commit record
//!
//! A `CommitRecord` is the only view of a commit the graph pipeline needs: the hash, the
//! ordered parent list (first parent first), the local branches decorating it and the
//! commit timestamp. Records are recreated for every log fetch and never mutated.
//!
//! ## Log Format
//!
//! Each record is one line with four NUL-separated fields:
//! ```text
//! <hash>\0<parent> <parent>...\0<ref>, <ref>...\0<unix-seconds>
//! ```

use crate::artifacts::objects::object_id::ObjectId;
use std::collections::BTreeSet;

/// Prefix of local branch references in decorations
pub const LOCAL_BRANCH_PREFIX: &str = "refs/heads/";

/// Field separator of a raw log record
pub const FIELD_SEPARATOR: char = '\0';

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommitRecord {
    /// The commit's object ID
    pub hash: ObjectId,
    /// Parent object IDs, first parent first
    pub parents: Vec<ObjectId>,
    /// Local branch names pointing at this commit
    pub branches: BTreeSet<String>,
    /// Commit time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl CommitRecord {
    pub fn new(hash: ObjectId, parents: Vec<ObjectId>, timestamp: i64) -> Self {
        CommitRecord {
            hash,
            parents,
            branches: BTreeSet::new(),
            timestamp,
        }
    }

    pub fn with_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches = branches.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn first_parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    /// Render the record back into the raw log format
    ///
    /// Branches are written as fully qualified `refs/heads/` decorations and the
    /// timestamp is truncated to whole seconds.
    pub fn to_log_line(&self) -> String {
        let parents = self
            .parents
            .iter()
            .map(|parent| parent.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        let refs = self
            .branches
            .iter()
            .map(|branch| format!("{LOCAL_BRANCH_PREFIX}{branch}"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.hash,
            parents,
            refs,
            self.timestamp.div_euclid(1000),
            sep = FIELD_SEPARATOR
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(c: char) -> ObjectId {
        ObjectId::try_parse(c.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn merge_commits_have_more_than_one_parent() {
        let root = CommitRecord::new(oid('a'), vec![], 0);
        let child = CommitRecord::new(oid('b'), vec![oid('a')], 1000);
        let merge = CommitRecord::new(oid('c'), vec![oid('b'), oid('a')], 2000);

        assert!(!root.is_merge());
        assert!(!child.is_merge());
        assert!(merge.is_merge());
        assert_eq!(merge.first_parent(), Some(&oid('b')));
    }

    #[test]
    fn log_line_uses_nul_separated_fields() {
        let record = CommitRecord::new(oid('c'), vec![oid('a'), oid('b')], 1_700_000_000_123)
            .with_branches(["main", "feature/x"]);

        let line = record.to_log_line();
        let fields = line.split('\0').collect::<Vec<_>>();

        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], "c".repeat(40));
        assert_eq!(fields[1], format!("{} {}", "a".repeat(40), "b".repeat(40)));
        assert_eq!(fields[2], "refs/heads/feature/x, refs/heads/main");
        assert_eq!(fields[3], "1700000000");
    }
}
