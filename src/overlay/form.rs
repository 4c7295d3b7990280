// src/overlay/form.rs
//! The "Submit Source Videos" form: an ordered list of input groups and the
//! submit-time collection into [`SourceRecord`]s.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::SourceRecord;
use crate::timestamp::{self, TimestampError};
use crate::validate::MAX_DESCRIPTION;

/// One "Source N" block of the form. Field values are raw user input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInputGroup {
    pub url: String,
    pub timestamp_from: String,
    pub timestamp_to: String,
    pub description: String,
}

impl SourceInputGroup {
    pub fn new(url: &str, description: &str) -> Self {
        Self {
            url: url.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub fn with_range(mut self, from: &str, to: &str) -> Self {
        self.timestamp_from = from.to_string();
        self.timestamp_to = to.to_string();
        self
    }

    fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.description.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// `group` is 1-based, matching the "Source N" heading.
    #[error("Source {group}: {source}")]
    Timestamp {
        group: usize,
        #[source]
        source: TimestampError,
    },
    #[error("Source {group}: description is too long (max 1000 characters)")]
    DescriptionTooLong { group: usize },
    #[error("Please add at least one valid source with both URL and description.")]
    NoValidSources,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionForm {
    groups: Vec<SourceInputGroup>,
}

impl Default for SubmissionForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionForm {
    /// A fresh form always starts with one empty group.
    pub fn new() -> Self {
        Self {
            groups: vec![SourceInputGroup::default()],
        }
    }

    pub fn groups(&self) -> &[SourceInputGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Append an empty group; returns its index.
    pub fn add_group(&mut self) -> usize {
        self.groups.push(SourceInputGroup::default());
        self.groups.len() - 1
    }

    /// Remove the group at `index`. The first group has no remove button,
    /// so index 0 (and out-of-range indices) are refused.
    pub fn remove_group(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.groups.len() {
            return false;
        }
        self.groups.remove(index);
        true
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut SourceInputGroup> {
        self.groups.get_mut(index)
    }

    /// Heading shown above group `index`.
    pub fn label(index: usize) -> String {
        format!("Source {}", index + 1)
    }

    /// Validate all timestamp pairs, then build records from complete groups.
    /// Nothing is returned unless the whole form is valid.
    pub fn collect(&self, now: DateTime<Utc>) -> Result<Vec<SourceRecord>, FormError> {
        let mut ranges = Vec::with_capacity(self.groups.len());
        for (i, g) in self.groups.iter().enumerate() {
            let range = timestamp::validate_pair(&g.timestamp_from, &g.timestamp_to)
                .map_err(|source| FormError::Timestamp {
                    group: i + 1,
                    source,
                })?;
            ranges.push(range);
        }

        let mut out = Vec::new();
        for (i, (g, (from, to))) in self.groups.iter().zip(ranges).enumerate() {
            if !g.is_complete() {
                continue;
            }
            let description = g.description.trim();
            if description.chars().count() > MAX_DESCRIPTION {
                return Err(FormError::DescriptionTooLong { group: i + 1 });
            }
            out.push(SourceRecord {
                url: g.url.trim().to_string(),
                description: description.to_string(),
                timestamp_from: from,
                timestamp_to: to,
                submit_time: now,
            });
        }

        if out.is_empty() {
            return Err(FormError::NoValidSources);
        }
        Ok(out)
    }
}
