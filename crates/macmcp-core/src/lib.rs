/*!
macmcp-core: the accessibility snapshot, path-resolution, and change-detection
engine behind MacMCP.

This crate owns the parts of the system that give it its engineering weight:

- [`path`] — the `macos://ui/...` selector grammar, its parser, and its canonicalizer.
- [`snapshot`] — immutable, bounded-depth captures of a live accessibility subtree.
- [`resolver`] — turning a path or a filter into one element within a snapshot,
  with fuzzy fallback and ambiguity reporting.
- [`serializer`] — shaping a captured element into a compact, verbosity-controlled
  wire record.
- [`diff`] — comparing two snapshots and reporting what changed.
- [`platform`] — the narrow, read-only/effectful traits the rest of the crate is
  built against, plus their macOS implementation.

Nothing in this crate talks JSON-RPC or owns a process lifetime; see `macmcp-server`
for that. `macmcp-core` is deliberately usable from a test harness with a fake
[`platform::AccessibilityProvider`] and no running accessibility host.
*/

pub mod diff;
pub mod error;
pub mod path;
pub mod platform;
pub mod resolver;
pub mod serializer;
pub mod snapshot;
pub mod types;

pub use diff::{ChangeReport, ChangedElement};
pub use error::{McpError, McpResult};
pub use path::Path;
pub use resolver::{Filter, ResolveOutcome, Resolver};
pub use serializer::{SerializeOptions, Verbosity};
pub use snapshot::{CaptureOptions, Snapshot};
pub use types::{Element, ElementRef, ElementState, Frame, Point, SnapshotId, Value};
