//! Integration-test harness for tools that fetch a package repository over HTTP.
//!
//! The core is an ephemeral static-file server ([`server`]) that serves a webtree from disk on a
//! background thread, signals readiness, and stops deterministically. Around it sit the pieces a
//! test needs to drive the external tools: fresh web roots and scoped servers ([`fixture`]),
//! checked subprocesses ([`command`], [`pkg`]), golden-tree comparison ([`treediff`]), and the
//! destructive-test gate ([`destructive`]).

pub mod cofg;
pub mod command;
pub mod destructive;
pub mod error;
pub mod fixture;
pub(crate) mod listing;
pub mod mapper;
pub mod pkg;
pub mod request;
pub mod server;
pub mod treediff;

pub use error::{ HarnessError, HarnessResult };
pub use fixture::{ WebRoot, Webserver };
pub use server::{ ReadinessSignal, ServerHandle, ServerOptions, await_ready, start, start_with, stop };

pub const VERSION: &str = env!("VERSION");

#[cfg(test)]
mod test;
