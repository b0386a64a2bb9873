//! Interaction scripts
//!
//! A script is a list of steps such as `focus:#size`, `key:ArrowDown`,
//! `click:#medium`, `type:#filter:re`, `wait:300`, `submit:#order`,
//! `reset:#order` or `frame`. Steps run against a [`Ui`] in order; the
//! resulting [`Report`] holds every form submission plus the final state of
//! each list box.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use fos_dom::{Event, Key, NodeId};
use serde::Serialize;
use smol::Timer;

use crate::ui::{ListSnapshot, Ui};

/// One scripted interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Keyboard focus (focus ring visible)
    Focus(String),
    /// Keydown at the focused element
    Key(Key),
    Click(String),
    /// Replace the value of a text control and fire `input`
    Type { id: String, text: String },
    Submit(String),
    Reset(String),
    /// Run one animation frame
    Frame,
    /// Let timers and tasks run for a number of milliseconds
    Wait(u64),
}

/// Script error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("Unknown step {0:?}")]
    Unknown(String),

    #[error("Step {0:?} needs an element id")]
    MissingTarget(String),

    #[error("Invalid wait {0:?}")]
    InvalidWait(String),

    #[error("No element with id {0:?}")]
    NoSuchElement(String),
}

impl FromStr for Step {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s.split_once(':').unwrap_or((s, ""));
        let target = || {
            let id = rest.strip_prefix('#').unwrap_or(rest);
            if id.is_empty() {
                Err(StepError::MissingTarget(s.to_string()))
            } else {
                Ok(id.to_string())
            }
        };
        match kind {
            "focus" => Ok(Step::Focus(target()?)),
            "click" => Ok(Step::Click(target()?)),
            "submit" => Ok(Step::Submit(target()?)),
            "reset" => Ok(Step::Reset(target()?)),
            "key" if !rest.is_empty() => Ok(Step::Key(Key::parse(rest))),
            "type" => {
                let (id, text) = rest.split_once(':').unwrap_or((rest, ""));
                let id = id.strip_prefix('#').unwrap_or(id);
                if id.is_empty() {
                    return Err(StepError::MissingTarget(s.to_string()));
                }
                Ok(Step::Type {
                    id: id.to_string(),
                    text: text.to_string(),
                })
            }
            "frame" if rest.is_empty() => Ok(Step::Frame),
            "wait" => rest
                .parse()
                .map(Step::Wait)
                .map_err(|_| StepError::InvalidWait(rest.to_string())),
            _ => Err(StepError::Unknown(s.to_string())),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Focus(id) => write!(f, "focus:#{id}"),
            Step::Key(key) => write!(f, "key:{key}"),
            Step::Click(id) => write!(f, "click:#{id}"),
            Step::Type { id, text } => write!(f, "type:#{id}:{text}"),
            Step::Submit(id) => write!(f, "submit:#{id}"),
            Step::Reset(id) => write!(f, "reset:#{id}"),
            Step::Frame => f.write_str("frame"),
            Step::Wait(ms) => write!(f, "wait:{ms}"),
        }
    }
}

/// Outcome of a `submit` step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub form: String,
    /// False when validation blocked the submission
    pub accepted: bool,
    pub entries: Vec<(String, String)>,
}

/// What a script produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub submissions: Vec<Submission>,
    pub lists: Vec<ListSnapshot>,
}

/// Runs steps against a [`Ui`].
///
/// Keydowns are stamped with a virtual clock that only `wait` advances, so
/// typeahead timeouts depend on the script and not on the host.
pub struct Replay<'a> {
    ui: &'a Ui,
    clock: f64,
    submissions: Vec<Submission>,
}

impl<'a> Replay<'a> {
    pub fn new(ui: &'a Ui) -> Self {
        Self {
            ui,
            clock: 0.0,
            submissions: Vec::new(),
        }
    }

    fn element(&self, id: &str) -> Result<NodeId, StepError> {
        self.ui
            .element(id)
            .ok_or_else(|| StepError::NoSuchElement(id.to_string()))
    }

    pub fn run(&mut self, step: &Step) -> Result<(), StepError> {
        tracing::debug!("Replaying {}", step);
        let ui = self.ui;
        let window = ui.window();
        match step {
            Step::Focus(id) => {
                let target = self.element(id)?;
                window.with_document(|doc| doc.focus(target, true));
            }
            Step::Key(key) => {
                let target = {
                    let doc = window.document();
                    doc.active_element().unwrap_or_else(|| doc.body())
                };
                let mut event = Event::keydown(key.clone()).with_timestamp(self.clock);
                window.dispatch(target, &mut event);
            }
            Step::Click(id) => {
                let target = self.element(id)?;
                window.dispatch(target, &mut Event::click());
            }
            Step::Type { id, text } => {
                let target = self.element(id)?;
                window.with_document(|doc| doc.set_value(target, text));
                window.dispatch(target, &mut Event::input(Some(text.as_str())));
            }
            Step::Submit(id) => {
                let form = self.element(id)?;
                let data = window.with_document(|doc| doc.request_submit(form));
                self.submissions.push(Submission {
                    form: id.clone(),
                    accepted: data.is_some(),
                    entries: data.map(|d| d.entries).unwrap_or_default(),
                });
            }
            Step::Reset(id) => {
                let form = self.element(id)?;
                window.with_document(|doc| doc.reset(form));
            }
            Step::Frame => {
                window.with_document(|doc| doc.run_animation_frame());
            }
            Step::Wait(ms) => {
                window.block_on(Timer::after(Duration::from_millis(*ms)));
                self.clock += *ms as f64;
            }
        }
        window.run_until_stalled();
        Ok(())
    }

    /// Run `steps` in order, stopping at the first failure
    pub fn run_all<'s>(&mut self, steps: impl IntoIterator<Item = &'s Step>) -> Result<(), StepError> {
        for step in steps {
            self.run(step)?;
        }
        Ok(())
    }

    pub fn finish(self) -> Report {
        Report {
            submissions: self.submissions,
            lists: self.ui.snapshot(),
        }
    }
}
