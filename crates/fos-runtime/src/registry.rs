//! Callback registries
//!
//! A registry maps callback ids to behaviors for one attribute namespace.
//! Markup references ids through that attribute; ids that are not registered
//! (yet) are skipped so partially hydrated pages keep working.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use fos_dom::{Document, DomTree, Event, NodeId};

use crate::callback::CallbackRef;

/// Context handed to a behavior
pub struct Cx<'a> {
    pub doc: &'a mut Document,
    pub event: &'a mut Event,
}

/// Behavior bound to elements through a callback attribute.
///
/// `args` are the encoded arguments of the attribute entry, appended after
/// the element.
pub trait Behavior {
    fn invoke(&self, cx: &mut Cx<'_>, element: NodeId, args: &[String]);
}

impl<F> Behavior for F
where
    F: Fn(&mut Cx<'_>, NodeId, &[String]),
{
    fn invoke(&self, cx: &mut Cx<'_>, element: NodeId, args: &[String]) {
        self(cx, element, args)
    }
}

/// Wrap a closure as a shareable behavior
pub fn behavior<F>(f: F) -> Rc<dyn Behavior>
where
    F: Fn(&mut Cx<'_>, NodeId, &[String]) + 'static,
{
    Rc::new(f)
}

/// Registry of event behaviors
pub type BehaviorRegistry = CallbackRegistry<dyn Behavior>;

/// Id that was already registered when a bulk load tried to add it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Callback `{id}` is already registered for `{attribute}`")]
pub struct RegistrationConflict {
    pub attribute: String,
    pub id: String,
}

/// A registered callback resolved for an element
pub struct Bound<B: ?Sized> {
    pub element: NodeId,
    pub callback: CallbackRef,
    pub behavior: Rc<B>,
}

/// Table of callbacks keyed by id, namespaced by one attribute
pub struct CallbackRegistry<B: ?Sized> {
    attribute: String,
    table: RefCell<HashMap<String, Rc<B>>>,
}

impl<B: ?Sized> CallbackRegistry<B> {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            table: RefCell::new(HashMap::new()),
        }
    }

    /// Attribute this registry reads
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Register `callback` under `id`; an existing registration is kept and
    /// false is returned
    pub fn add(&self, id: &str, callback: Rc<B>) -> bool {
        let mut table = self.table.borrow_mut();
        if table.contains_key(id) {
            return false;
        }
        table.insert(id.to_string(), callback);
        true
    }

    /// Register many callbacks, reporting the ids that were already taken
    pub fn add_all<I>(&self, entries: I) -> Vec<RegistrationConflict>
    where
        I: IntoIterator<Item = (String, Rc<B>)>,
    {
        let mut conflicts = Vec::new();
        for (id, callback) in entries {
            if !self.add(&id, callback) {
                tracing::warn!("{} already registers `{}`", self.attribute, id);
                conflicts.push(RegistrationConflict {
                    attribute: self.attribute.clone(),
                    id,
                });
            }
        }
        tracing::debug!(
            "Loaded {} callbacks into {}",
            self.len(),
            self.attribute
        );
        conflicts
    }

    pub fn get(&self, id: &str) -> Option<Rc<B>> {
        self.table.borrow().get(id).cloned()
    }

    #[doc(alias = "rm")]
    pub fn remove(&self, id: &str) -> Option<Rc<B>> {
        self.table.borrow_mut().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.table.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    /// Registration token for `id`; the callback is registered the first time
    /// the token is bound
    pub fn create(self: &Rc<Self>, id: &str, callback: Rc<B>) -> CallbackToken<B> {
        CallbackToken {
            registry: Rc::clone(self),
            id: id.to_string(),
            callback,
        }
    }

    /// Callbacks `element` references through this registry's attribute, in
    /// attribute order. Unknown ids are skipped.
    pub fn iter(&self, tree: &DomTree, element: NodeId) -> Vec<Bound<B>> {
        let Some(value) = tree.attr(element, &self.attribute) else {
            return Vec::new();
        };
        let table = self.table.borrow();
        CallbackRef::parse_list_lossy(value)
            .into_iter()
            .filter_map(|callback| {
                let behavior = table.get(&callback.id).cloned()?;
                Some(Bound {
                    element,
                    callback,
                    behavior,
                })
            })
            .collect()
    }
}

impl<B: ?Sized> fmt::Debug for CallbackRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("attribute", &self.attribute)
            .field("len", &self.len())
            .finish()
    }
}

/// Handle that registers a callback lazily and produces its markup attribute
pub struct CallbackToken<B: ?Sized> {
    registry: Rc<CallbackRegistry<B>>,
    id: String,
    callback: Rc<B>,
}

impl<B: ?Sized> CallbackToken<B> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register the callback (once) and return `(attribute, value)` for markup
    pub fn bind(&self, args: &[Option<&str>]) -> (String, String) {
        self.registry.add(&self.id, Rc::clone(&self.callback));
        (
            self.registry.attribute().to_string(),
            CallbackRef::encode(&self.id, args),
        )
    }
}

impl<B: ?Sized> Clone for CallbackToken<B> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
            id: self.id.clone(),
            callback: Rc::clone(&self.callback),
        }
    }
}
