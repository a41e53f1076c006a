//! Test module - central organization for all test submodules
//!
//! - config loading and CLI overrides
//! - the request handler (in-process, via `actix_web::test`)
//! - the server harness lifecycle over real sockets
//! - subprocess, tree-diff and tool-wrapper glue

pub(crate) mod common;

mod mapper;
mod treediff;
