//! Window realm
//!
//! A window owns one document and the single-threaded executor that drives
//! async work started by behaviors (debounced fetches, option sources).
//! Tasks reach the document through a [`WindowHandle`], which does not keep
//! the document alive.

use std::cell::{Ref, RefCell, RefMut};
use std::future::Future;
use std::rc::{Rc, Weak};

use fos_dom::{Document, Event, NodeId};
use smol::{LocalExecutor, Task};

/// A document plus its executor
pub struct Window {
    document: Rc<RefCell<Document>>,
    executor: Rc<LocalExecutor<'static>>,
}

impl Window {
    pub fn new(document: Document) -> Self {
        Self {
            document: Rc::new(RefCell::new(document)),
            executor: Rc::new(LocalExecutor::new()),
        }
    }

    pub fn document(&self) -> Ref<'_, Document> {
        self.document.borrow()
    }

    pub fn document_mut(&self) -> RefMut<'_, Document> {
        self.document.borrow_mut()
    }

    /// Run `f` against the document
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.document.borrow_mut())
    }

    /// Dispatch `event` at `target`; false if the default was prevented
    pub fn dispatch(&self, target: NodeId, event: &mut Event) -> bool {
        self.document.borrow_mut().dispatch_event(target, event)
    }

    pub fn spawn<T: 'static>(&self, future: impl Future<Output = T> + 'static) -> Task<T> {
        self.executor.spawn(future)
    }

    /// Poll ready tasks until none can make progress; returns how many ticks ran
    pub fn run_until_stalled(&self) -> usize {
        let mut ticks = 0;
        while self.executor.try_tick() {
            ticks += 1;
        }
        ticks
    }

    /// Drive the executor (and timers) until `future` completes
    pub fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        smol::block_on(self.executor.run(future))
    }

    pub fn handle(&self) -> WindowHandle {
        WindowHandle {
            document: Rc::downgrade(&self.document),
            executor: Rc::clone(&self.executor),
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

/// Weak reference to a window, held by components and tasks
#[derive(Clone)]
pub struct WindowHandle {
    document: Weak<RefCell<Document>>,
    executor: Rc<LocalExecutor<'static>>,
}

impl WindowHandle {
    /// Whether the window's document is still alive
    pub fn is_alive(&self) -> bool {
        self.document.strong_count() > 0
    }

    /// Run `f` against the document, then run queued microtasks.
    ///
    /// Returns `None` once the document is gone.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> Option<R> {
        let document = self.document.upgrade()?;
        let mut doc = document.borrow_mut();
        let result = f(&mut doc);
        doc.perform_microtask_checkpoint();
        Some(result)
    }

    pub fn spawn<T: 'static>(&self, future: impl Future<Output = T> + 'static) -> Task<T> {
        self.executor.spawn(future)
    }

    pub(crate) fn same_document(&self, other: &Weak<RefCell<Document>>) -> bool {
        Weak::ptr_eq(&self.document, other)
    }

    pub(crate) fn document_weak(&self) -> Weak<RefCell<Document>> {
        Weak::clone(&self.document)
    }
}
