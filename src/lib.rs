//! dirquery - attack-path queries over directory object graphs
//!
//! Filters use an LDAP-style syntax extended with attribute modifiers
//! (`cn:glob:=adm*`), synthetic attributes (`_canpwn`, `_pwnable`, `_limit`,
//! `_random100`) and nested attack-path targets.
//!
//! - `model`: objects, attribute interning, indexes and the JSON loader
//! - `query`: filter parser, AST and per-object evaluator
//! - `executor`: index-driven execution and explain plans
//! - `observability`: structured logs and query counters
//! - `cli`: the `dirquery` binary

pub mod cli;
pub mod executor;
pub mod model;
pub mod observability;
pub mod query;
