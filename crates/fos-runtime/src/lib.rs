//! fOS Runtime - behavior attachment
//!
//! Behaviors are named in markup through plain string attributes
//! (`data-on-click="open (menu)"`) and woken up by one delegated listener per
//! event type. This crate provides:
//!
//! - [`CallbackRef`]: the attribute entry codec
//! - [`CallbackRegistry`]: id → behavior tables, one per attribute namespace
//! - [`Dispatcher`]: the delegated listeners and the composed-path walk
//! - [`Window`]: a document plus the executor that runs async behavior work
//! - [`DebouncePrev`] / [`DebounceNext`]: async call coalescing

mod callback;
mod config;
mod debounce;
mod dispatch;
mod registry;
mod window;

pub use callback::{CallbackParseError, CallbackRef};
pub use config::DispatchConfig;
pub use debounce::{DebounceError, DebounceNext, DebouncePrev};
pub use dispatch::Dispatcher;
pub use registry::{
    behavior, Behavior, BehaviorRegistry, Bound, CallbackRegistry, CallbackToken, Cx,
    RegistrationConflict,
};
pub use window::{Window, WindowHandle};
