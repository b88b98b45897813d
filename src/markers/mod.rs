//! Editor markers kept on host-anchored ranges: breakpoints, runtime
//! highlights and inline widgets.
//!
//! None of these types own an [`AnchorProvider`]; the caller passes one in
//! for each operation so several marker sets can share the host's tracking.

mod anchor;
mod breakpoints;
mod highlights;
mod widgets;

pub use anchor::{AnchorId, AnchorProvider, LineAnchors, Range};
pub use breakpoints::{BreakpointManager, MarkerState, TrackedMarker};
pub use highlights::{RuntimeHighlights, CURRENT};
pub use widgets::{InlineWidgets, Widget, WidgetKind};
