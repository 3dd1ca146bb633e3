pub mod edit;
pub mod editor;
pub mod inspect;
pub mod model;
pub mod remove;
pub mod walk;

pub use edit::VariableChange;
pub use editor::CollectionEditor;
pub use inspect::{CollectionInfo, Endpoint, ScriptFinding, ScriptKind, ScriptLevel, ScriptSummary};
pub use model::{Collection, Item};
pub use walk::{EditReport, NodeOutcome, SkipReason, SkippedNode};
