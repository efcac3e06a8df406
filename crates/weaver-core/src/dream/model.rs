//! Dream record value types.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{Result, WeaverError};

/// Kind of dream fragment a tag captures.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TagKind {
    Emotion,
    #[default]
    Object,
    Person,
    Location,
}

impl TagKind {
    /// Label shown in the entry form.
    pub fn label(&self) -> &'static str {
        match self {
            TagKind::Emotion => "Emotion",
            TagKind::Object => "Object",
            TagKind::Person => "Person",
            TagKind::Location => "Location",
        }
    }
}

/// A labeled fragment of a dream.
///
/// Labels are not unique; the generated id is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamTag {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TagKind,
    pub label: String,
}

impl DreamTag {
    pub fn new(kind: TagKind, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
        }
    }
}

/// Analytical lens applied to a dream.
///
/// Declaration order is the canonical order used in prompts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Perspective {
    #[strum(serialize = "psychological", serialize = "psych")]
    Psychological,
    #[strum(serialize = "cultural", serialize = "culture")]
    Cultural,
    #[strum(serialize = "creative")]
    Creative,
}

impl Perspective {
    /// Name interpolated into prompts and shown as the option title.
    pub fn display_name(&self) -> &'static str {
        match self {
            Perspective::Psychological => "Psychological perspective",
            Perspective::Cultural => "Cultural-symbolic perspective",
            Perspective::Creative => "Creative-inspiration perspective",
        }
    }

    /// One-line description shown under the option.
    pub fn description(&self) -> &'static str {
        match self {
            Perspective::Psychological => {
                "Digs into your current self-state and unconscious compensation"
            }
            Perspective::Cultural => {
                "Links the dream to the collective unconscious and symbolic civilization"
            }
            Perspective::Creative => {
                "Captures narrative inspiration and visual-art metaphors"
            }
        }
    }

    pub fn all() -> impl Iterator<Item = Perspective> {
        Perspective::iter()
    }
}

impl std::fmt::Display for Perspective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Non-empty set of selected perspectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Perspective>", into = "Vec<Perspective>")]
pub struct PerspectiveSet(BTreeSet<Perspective>);

impl PerspectiveSet {
    pub fn single(perspective: Perspective) -> Self {
        Self(BTreeSet::from([perspective]))
    }

    pub fn contains(&self, perspective: Perspective) -> bool {
        self.0.contains(&perspective)
    }

    /// Returns `false` if the perspective was already selected.
    pub fn insert(&mut self, perspective: Perspective) -> bool {
        self.0.insert(perspective)
    }

    /// Deselects a perspective. Removing the last one is rejected.
    pub fn remove(&mut self, perspective: Perspective) -> Result<()> {
        if !self.0.contains(&perspective) {
            return Ok(());
        }
        if self.0.len() == 1 {
            return Err(WeaverError::validation(
                "At least one perspective must remain selected",
            ));
        }
        self.0.remove(&perspective);
        Ok(())
    }

    /// Flips the selection of `perspective`, subject to the non-empty rule.
    pub fn toggle(&mut self, perspective: Perspective) -> Result<()> {
        if self.contains(perspective) {
            self.remove(perspective)
        } else {
            self.insert(perspective);
            Ok(())
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Perspectives in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Perspective> + '_ {
        self.0.iter().copied()
    }

    pub fn display_names(&self) -> Vec<&'static str> {
        self.iter().map(|p| p.display_name()).collect()
    }
}

impl Default for PerspectiveSet {
    fn default() -> Self {
        Self::single(Perspective::Psychological)
    }
}

impl TryFrom<Vec<Perspective>> for PerspectiveSet {
    type Error = WeaverError;

    fn try_from(value: Vec<Perspective>) -> Result<Self> {
        let set: BTreeSet<Perspective> = value.into_iter().collect();
        if set.is_empty() {
            return Err(WeaverError::validation(
                "A dream needs at least one perspective",
            ));
        }
        Ok(Self(set))
    }
}

impl From<PerspectiveSet> for Vec<Perspective> {
    fn from(value: PerspectiveSet) -> Self {
        value.0.into_iter().collect()
    }
}

/// One submitted dream entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamRecord {
    pub id: String,
    pub content: String,
    pub tags: Vec<DreamTag>,
    pub perspectives: PerspectiveSet,
    pub timestamp: DateTime<Utc>,
}

impl DreamRecord {
    pub fn tag_labels(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.label.clone()).collect()
    }
}
