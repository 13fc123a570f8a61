//! Declarative schema compiler.
//!
//! Reads a line-oriented schema describing a project layout and compiles it
//! into an ordered, inert [`plan::BuildPlan`] of filesystem operations,
//! which can be printed or applied to an output directory. Includes are
//! jailed to the schema directory, templates are gated by a trust policy,
//! and included schemas can be required to carry valid signatures.
//!
//! The public API is organised into these layers:
//!
//! - **[`schema`]** — lex and parse schema text into a resolved action tree
//! - **[`security`]** — path jailing, template trust, signature checks
//! - **[`plan`]** — compile schemas into build plans, render and record them
//! - **[`resources`]** / **[`apply`]** — idempotent `check + apply` of a plan
//! - **[`commands`]** — top-level subcommand orchestration (`build`, `plan`, `trust`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod apply;
pub mod audit;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod platform;
pub mod resources;
pub mod schema;
pub mod security;
