//! DOM Events
//!
//! Event objects, keyboard keys, and listener bookkeeping.

use std::fmt;
use std::rc::Rc;

use crate::{Document, NodeId};

/// Event type names used by the runtime
pub mod types {
    pub const CLICK: &str = "click";
    pub const KEYDOWN: &str = "keydown";
    pub const INPUT: &str = "input";
    pub const CHANGE: &str = "change";
    pub const FOCUS: &str = "focus";
    pub const BLUR: &str = "blur";
    pub const FOCUSIN: &str = "focusin";
    pub const FOCUSOUT: &str = "focusout";
    pub const SUBMIT: &str = "submit";
    pub const RESET: &str = "reset";
    pub const INVALID: &str = "invalid";
    pub const BEFORETOGGLE: &str = "beforetoggle";
    pub const TOGGLE: &str = "toggle";
    pub const SCROLL: &str = "scroll";
}

/// Whether an event of this type bubbles
pub fn bubbles(event_type: &str) -> bool {
    !matches!(
        event_type,
        types::FOCUS
            | types::BLUR
            | types::INVALID
            | types::BEFORETOGGLE
            | types::TOGGLE
            | types::SCROLL
            | "load"
            | "unload"
            | "mouseenter"
            | "mouseleave"
    )
}

/// Whether an event of this type is cancelable
pub fn cancelable(event_type: &str) -> bool {
    matches!(
        event_type,
        types::CLICK
            | types::KEYDOWN
            | types::SUBMIT
            | types::RESET
            | types::INVALID
            | types::BEFORETOGGLE
            | "keyup"
            | "mousedown"
    )
}

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: Option<NodeId>,
    pub current_target: Option<NodeId>,
    /// Focus counterpart for focusin/focusout
    pub related_target: Option<NodeId>,
    pub key: Option<Key>,
    pub modifiers: KeyModifiers,
    /// `"open"` / `"closed"` for toggle events
    pub new_state: Option<String>,
    /// Inserted text for input events
    pub data: Option<String>,
    pub bubbles: bool,
    pub cancelable: bool,
    /// Milliseconds since the page's time origin
    pub timestamp: f64,
    pub phase: EventPhase,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    /// Event with type-derived bubbles/cancelable flags
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            target: None,
            current_target: None,
            related_target: None,
            key: None,
            modifiers: KeyModifiers::default(),
            new_state: None,
            data: None,
            bubbles: bubbles(event_type),
            cancelable: cancelable(event_type),
            timestamp: 0.0,
            phase: EventPhase::None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    /// Create keydown event
    pub fn keydown(key: Key) -> Self {
        Self {
            key: Some(key),
            ..Self::new(types::KEYDOWN)
        }
    }

    pub fn click() -> Self {
        Self::new(types::CLICK)
    }

    /// Create input event
    pub fn input(data: Option<&str>) -> Self {
        Self {
            data: data.map(str::to_string),
            ..Self::new(types::INPUT)
        }
    }

    pub fn change() -> Self {
        Self::new(types::CHANGE)
    }

    /// Create focusin event; `related` is the element losing focus
    pub fn focus_in(related: Option<NodeId>) -> Self {
        Self {
            related_target: related,
            ..Self::new(types::FOCUSIN)
        }
    }

    /// Create focusout event; `related` is the element gaining focus
    pub fn focus_out(related: Option<NodeId>) -> Self {
        Self {
            related_target: related,
            ..Self::new(types::FOCUSOUT)
        }
    }

    /// Create beforetoggle/toggle event
    pub fn toggle(event_type: &str, new_state: &str) -> Self {
        Self {
            new_state: Some(new_state.to_string()),
            ..Self::new(event_type)
        }
    }

    pub fn submit() -> Self {
        Self::new(types::SUBMIT)
    }

    pub fn reset() -> Self {
        Self::new(types::RESET)
    }

    /// Set timestamp
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add modifiers
    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Check the event type
    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation after the current node
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation and any remaining handlers on the current node
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

/// Key value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(char),

    // Navigation
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,

    // Editing
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,

    // Whitespace
    Space,

    Unidentified(String),
}

impl Key {
    /// Parse from key string
    pub fn parse(s: &str) -> Self {
        match s {
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            "Backspace" => Self::Backspace,
            "Delete" => Self::Delete,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" | "Esc" => Self::Escape,
            " " | "Space" | "Spacebar" => Self::Space,
            s => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Character(c),
                    _ => Self::Unidentified(s.to_string()),
                }
            }
        }
    }

    /// Produces a character when typed
    pub fn is_printable(&self) -> bool {
        matches!(self, Self::Character(_) | Self::Space)
    }

    /// Character typed by this key
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Character(c) => Some(*c),
            Self::Space => Some(' '),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character(c) => write!(f, "{c}"),
            Self::Space => f.write_str(" "),
            Self::Unidentified(s) => f.write_str(s),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Key modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyModifiers {
    /// Check if any modifier is pressed
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }

    /// Modifiers that turn a printable key into a shortcut
    pub fn is_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Event listener options
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self {
            capture: true,
            once: false,
        }
    }

    pub fn bubble() -> Self {
        Self::default()
    }
}

/// Handle returned by `Document::add_event_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Native listener callback
pub type ListenerFn = Rc<dyn Fn(&mut Document, &mut Event)>;
