#![forbid(unsafe_code)]

//! Layout persistence: the JSON document schema, the codec that maps it to
//! and from a [`dockspace_core::DockTree`], list-shape normalization, and
//! the snapshot builder that strips live content before saving.

pub mod codec;
pub mod document;
pub mod normalize;
pub mod snapshot;

pub use codec::{CodecError, DecodeIssue, DecodedLayout, LayoutCodec};
pub use document::{
    LAYOUT_FORMAT_VERSION, LayoutDocument, NodeDef, NodeKindName, NodeRef, NodeSlot, WindowDef,
    WireList,
};
pub use normalize::normalize_lists;
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotReport, build_snapshot};
