//! Dream entry domain: the editable draft and the frozen record.

mod draft;
mod model;

pub use draft::DreamDraft;
pub use model::{DreamRecord, DreamTag, Perspective, PerspectiveSet, TagKind};
