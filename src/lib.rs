//! Workspace placeholder crate.
//!
//! Exposes the feature flags that map onto the member crates so a host can
//! depend on `cry-workspace` alone. `desktop-shims` (default) pulls in the
//! reqwest/tokio/rodio bridges; `headless` expects the host to inject its own.

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_playback::{CryError, CryPipeline, ErrorKind, PlaybackOutcome};

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_service::{CoreError, CoreService};
