//! Layered configuration (C11, ambient per spec.md §1, shape specified here
//! so the binaries compile against it): CLI flags (clap) override env vars,
//! which override an optional JSON config file, which override built-in
//! defaults — the same precedence the source's `flag > env > file` layering
//! establishes in `original_source/internal/server/config/config.go` and
//! `internal/client/config/config.go`.

mod agent;
mod server;

pub use agent::{AgentArgs, AgentSettings};
pub use server::{ServerArgs, ServerSettings};
