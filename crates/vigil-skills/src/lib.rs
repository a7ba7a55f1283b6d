//! Tool plumbing for Vigil.
//!
//! A *skill* is a named, schema-described capability the conversation loop
//! can invoke on the model's request. Skills declare their parameters as
//! [`ParamSpec`]s; the [`SkillRegistry`] validates arguments against those
//! declarations before a skill ever sees them, and folds every failure into
//! an error-bearing [`vigil_core::ToolResult`].

/// Table-driven skill built from a descriptor and an async closure.
pub mod operation;
/// Parameter declarations, argument validation and typed accessors.
pub mod params;
/// Name-indexed skill registry.
pub mod registry;
/// The `Skill` trait and its descriptor.
pub mod skill;

pub use operation::OperationSkill;
pub use params::{validate_arguments, Arguments, ParamKind, ParamSpec};
pub use registry::SkillRegistry;
pub use skill::{Skill, SkillDescriptor};
