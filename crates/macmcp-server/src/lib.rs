/*!
macmcp-server: the line-framed JSON-RPC process that exposes [`macmcp_core`] over stdio.

This crate owns the parts of the system `macmcp-core` deliberately stays silent on:
the dedicated platform thread ([`platform_thread`]), the session lifecycle
([`session`]), the tool registry and argument validation ([`registry`]), the eight
published tool handlers ([`tools`]), resource reads ([`resources`]), and the
JSON-RPC request/response loop itself ([`rpc`]).

Nothing here talks Objective-C directly; every platform effect is marshalled
through [`macmcp_core::platform::macos::MacPlatform`] on the one thread
[`platform_thread::PlatformThread`] owns.
*/

#[cfg(not(target_os = "macos"))]
compile_error!("macmcp-server talks to the macOS accessibility API and only builds for macOS");

pub mod cli;
pub mod platform_thread;
pub mod registry;
pub mod resources;
pub mod rpc;
pub mod session;
pub mod tools;

pub use cli::Cli;
pub use platform_thread::PlatformThread;
pub use registry::Registry;
pub use rpc::run_stdio_loop;
pub use session::{Config, SessionState};
