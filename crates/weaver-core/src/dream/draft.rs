//! Editable state of the dream entry form.

use chrono::Utc;

use super::model::{DreamRecord, DreamTag, Perspective, PerspectiveSet, TagKind};
use crate::error::{Result, WeaverError};

/// Entry form contents before submission.
///
/// A draft can be edited freely; [`DreamDraft::submit`] freezes it into a
/// [`DreamRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DreamDraft {
    content: String,
    tags: Vec<DreamTag>,
    perspectives: PerspectiveSet,
    active_kind: TagKind,
}

impl DreamDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Appends a line to the narrative.
    pub fn push_line(&mut self, line: &str) {
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(line);
    }

    pub fn tags(&self) -> &[DreamTag] {
        &self.tags
    }

    pub fn perspectives(&self) -> &PerspectiveSet {
        &self.perspectives
    }

    pub fn active_kind(&self) -> TagKind {
        self.active_kind
    }

    pub fn set_active_kind(&mut self, kind: TagKind) {
        self.active_kind = kind;
    }

    /// Adds a tag of the active kind. Blank labels are rejected.
    pub fn add_tag(&mut self, label: &str) -> Result<&DreamTag> {
        let kind = self.active_kind;
        self.add_tag_of_kind(kind, label)
    }

    pub fn add_tag_of_kind(&mut self, kind: TagKind, label: &str) -> Result<&DreamTag> {
        let label = label.trim();
        if label.is_empty() {
            return Err(WeaverError::validation("Tag label cannot be empty"));
        }
        self.tags.push(DreamTag::new(kind, label));
        // just pushed
        Ok(&self.tags[self.tags.len() - 1])
    }

    /// Removes a tag by id. Returns whether a tag was removed.
    pub fn remove_tag(&mut self, id: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|tag| tag.id != id);
        self.tags.len() != before
    }

    pub fn toggle_perspective(&mut self, perspective: Perspective) -> Result<()> {
        self.perspectives.toggle(perspective)
    }

    pub fn can_submit(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Freezes the draft into a record. The narrative must not be blank.
    pub fn submit(&self) -> Result<DreamRecord> {
        if !self.can_submit() {
            return Err(WeaverError::validation("Please describe your dream first"));
        }
        let now = Utc::now();
        Ok(DreamRecord {
            id: uuid::Uuid::new_v4().to_string(),
            content: self.content.clone(),
            tags: self.tags.clone(),
            perspectives: self.perspectives.clone(),
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_narrative_cannot_be_submitted() {
        let mut draft = DreamDraft::new();
        assert!(draft.submit().unwrap_err().is_validation());

        draft.set_content("   \n\t");
        assert!(!draft.can_submit());
        assert!(draft.submit().is_err());
    }

    #[test]
    fn tags_use_active_kind_and_trimmed_label() {
        let mut draft = DreamDraft::new();
        assert_eq!(draft.active_kind(), TagKind::Object);

        draft.set_active_kind(TagKind::Emotion);
        let tag = draft.add_tag("  fear ").unwrap().clone();
        assert_eq!(tag.kind, TagKind::Emotion);
        assert_eq!(tag.label, "fear");

        assert!(draft.add_tag("   ").is_err());
        assert_eq!(draft.tags().len(), 1);
    }

    #[test]
    fn duplicate_labels_get_distinct_ids() {
        let mut draft = DreamDraft::new();
        let first = draft.add_tag("clock").unwrap().id.clone();
        let second = draft.add_tag("clock").unwrap().id.clone();
        assert_ne!(first, second);

        assert!(draft.remove_tag(&first));
        assert!(!draft.remove_tag(&first));
        assert_eq!(draft.tags().len(), 1);
        assert_eq!(draft.tags()[0].id, second);
    }

    #[test]
    fn submit_copies_everything_into_record() {
        let mut draft = DreamDraft::new();
        draft.push_line("I walked into a garden of clocks");
        draft.push_line("the hands ran backwards");
        draft.add_tag_of_kind(TagKind::Location, "garden").unwrap();
        draft.toggle_perspective(Perspective::Creative).unwrap();

        let record = draft.submit().unwrap();
        assert_eq!(
            record.content,
            "I walked into a garden of clocks\nthe hands ran backwards"
        );
        assert_eq!(record.tag_labels(), vec!["garden".to_string()]);
        assert_eq!(record.perspectives.len(), 2);
        assert!(!record.id.is_empty());

        let again = draft.submit().unwrap();
        assert_ne!(record.id, again.id);
    }

    #[test]
    fn last_perspective_stays_selected() {
        let mut draft = DreamDraft::new();
        assert!(draft.toggle_perspective(Perspective::Psychological).is_err());
        assert!(draft.perspectives().contains(Perspective::Psychological));
    }
}
