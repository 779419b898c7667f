//! Pull request drafting: what a branch changes, a description for it, and
//! the prompts used to have one written by AI.

pub mod changes;
pub mod draft;
pub mod prompt;

pub use changes::BranchChanges;
pub use draft::{PrDraft, PrSections, basic_draft, generate_draft};
pub use prompt::PrSection;
