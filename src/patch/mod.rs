//! Backup-guarded, idempotent patching of build configuration files

pub mod patcher;
pub mod rules;
pub mod scope;

pub use patcher::{FilePatcher, PatchError, PatchOutcome, DEFAULT_BACKUP_SUFFIX};
pub use rules::{
    EnsureKey, InsertBlock, Placement, RegexSubstitute, RuleOutput, RuleStatus, StripOutsideScope,
    TransformRule,
};
pub use scope::{Scope, ScopeTracker};
