use std::path::Path;

use batch_types::{ContainerFormat, NormalizedMetadata};
use lofty::error::LoftyError;
use lofty::id3::v2::{CommentFrame, Frame, FrameFlags, FrameValue, Id3v2Tag};
use lofty::{
    Accessor, ItemKey, Tag, TagExt, TagType, TaggedFileExt, TextEncoding, read_from_path,
};

use crate::error::TagError;

/// Writes normalized metadata into a file that is already on disk.
pub trait TagWriter: Send + Sync {
    fn embed(&self, path: &Path, metadata: &NormalizedMetadata) -> Result<(), TagError>;
}

/// ID3v2 writer backed by lofty. Every call also stamps `comment`.
#[derive(Debug, Clone)]
pub struct LoftyTagWriter {
    comment: String,
}

impl LoftyTagWriter {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
        }
    }
}

impl TagWriter for LoftyTagWriter {
    fn embed(&self, path: &Path, metadata: &NormalizedMetadata) -> Result<(), TagError> {
        write_id3_tags(path, metadata, &self.comment)
    }
}

fn write_id3_tags(path: &Path, metadata: &NormalizedMetadata, comment: &str) -> Result<(), TagError> {
    let format = ContainerFormat::from_path(path);
    if !format.is_taggable() {
        return Err(TagError::UnsupportedContainer {
            path: path.to_path_buf(),
            format,
        });
    }
    let container = |source| TagError::Container {
        path: path.to_path_buf(),
        source,
    };

    let mut tagged_file = read_from_path(path).map_err(container)?;
    let tag_type = TagType::Id3v2;
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| TagError::NoTagHeader {
            path: path.to_path_buf(),
        })?;

    tag.set_title(metadata.title.clone());
    if let Some(value) = metadata.primary_contributor.as_deref() {
        tag.set_artist(value.to_string());
    }
    if let Some(value) = metadata.secondary_contributor.as_deref() {
        tag.insert_text(ItemKey::Composer, value.to_string());
    }

    // The generic item map would give the comment a placeholder language, so
    // any earlier comment is dropped and the frame is built by hand.
    tag.remove_key(&ItemKey::Comment);
    let mut id3 = Id3v2Tag::from(tag.clone());
    id3.insert(comment_frame(comment).map_err(container)?);
    id3.save_to_path(path).map_err(container)
}

/// `COMM` frame in English with an empty description.
fn comment_frame(comment: &str) -> Result<Frame<'static>, LoftyError> {
    Frame::new(
        "COMM",
        FrameValue::Comment(CommentFrame {
            encoding: TextEncoding::UTF8,
            language: *b"eng",
            description: String::new(),
            content: comment.to_string(),
        }),
        FrameFlags::default(),
    )
}
