//! Kite Scripting System
//!
//! JavaScript execution via QuickJS, driven by a single-threaded host loop.
//!
//! ## Architecture
//!
//! - **Runtime:** one QuickJS runtime + context, only ever used on the host thread
//! - **Timers:** `createTimer` / `deleteTimer` / `millis` globals backed by
//!   `kite_core::timer`; fires arrive as queued jobs and are dispatched on the
//!   host's turn, never on the timer thread
//! - **Prelude:** `setTimeout` / `setInterval` / `clearTimeout` / `clearInterval`
//!   written in JS on top of the timer globals

mod error;
pub mod ffi;
pub mod host;
pub mod runtime;
pub mod timers;

pub use error::ScriptError;
pub use host::{HostOptions, ScriptHost};
pub use rquickjs;
