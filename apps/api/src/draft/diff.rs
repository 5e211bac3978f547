//! Change detection between a draft and the last persisted snapshot.
//!
//! The photo is excluded from the field comparison and checked separately by
//! identity metadata, because content equality over binary data is not cheap
//! on the editing side. Two local files with the same name, size, and
//! modification time are treated as the same photo even if their bytes
//! differ — a known approximation.

use crate::draft::model::{Photo, ResumeDraft};

/// Returns true when the draft differs from the snapshot: any non-photo
/// field changed, or the photos are not equivalent under [`same_photo`].
pub fn has_changes(draft: &ResumeDraft, snapshot: &ResumeDraft) -> bool {
    let mut draft_fields = draft.clone();
    let mut snapshot_fields = snapshot.clone();
    draft_fields.photo = None;
    snapshot_fields.photo = None;

    draft_fields != snapshot_fields || !same_photo(draft.photo.as_ref(), snapshot.photo.as_ref())
}

/// Photo equivalence by identity metadata.
///
/// Both absent → equivalent. One absent → not equivalent. Two stored
/// references → URL match. Two local files → name, size, and modification
/// time match. A stored reference never equals a local file.
pub fn same_photo(a: Option<&Photo>, b: Option<&Photo>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => match (a, b) {
            (Photo::Stored { url: a_url }, Photo::Stored { url: b_url }) => a_url == b_url,
            (
                Photo::Local {
                    file_name: a_name,
                    size_bytes: a_size,
                    modified_ms: a_modified,
                    ..
                },
                Photo::Local {
                    file_name: b_name,
                    size_bytes: b_size,
                    modified_ms: b_modified,
                    ..
                },
            ) => a_name == b_name && a_size == b_size && a_modified == b_modified,
            _ => false,
        },
        _ => false,
    }
}
