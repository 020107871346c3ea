//! File rename planning from extraction records.

pub mod planner;

pub use planner::{
    apply_plan, plan_rename, sanitize_company, Disposition, RenamePlan, RenameSession,
    TemplateToken,
};
