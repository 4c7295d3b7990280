// src/overlay/menu.rs
//! The "Sources" menu next to the video title: dropdown, count badge and the
//! submission form, driven by explicit events from a DOM adapter.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::Utc;
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

use super::form::{FormError, SubmissionForm};
use super::kv::{KeyValueStore, KvError};
use super::render;
use crate::model::SourceRecord;

/// The page the menu is mounted on. Only `/watch?v=<id>` pages get a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    video_id: String,
}

impl PageContext {
    pub fn from_url(url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        if !url.path().starts_with("/watch") {
            return None;
        }
        let video_id = url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())?;
        Some(Self { video_id })
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }
}

/* ----------------------------
Document-level listeners
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    DropdownClickOutside,
    FormClickOutside,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    active: BTreeMap<u64, Listener>,
}

/// Stand-in for the document's listener list. Cloning shares the same list.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Listener) -> Subscription {
        let mut g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = g.next_id;
        g.next_id += 1;
        g.active.insert(id, listener);
        Subscription {
            id,
            listener,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Currently registered listeners, oldest first.
    pub fn active(&self) -> Vec<Listener> {
        let g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        g.active.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration guard; the listener is removed when this is dropped.
#[derive(Debug)]
#[must_use = "dropping a Subscription deregisters the listener immediately"]
pub struct Subscription {
    id: u64,
    listener: Listener,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    pub fn listener(&self) -> Listener {
        self.listener
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            let mut g = inner.lock().unwrap_or_else(PoisonError::into_inner);
            g.active.remove(&self.id);
        }
    }
}

/* ----------------------------
Menu state
---------------------------- */

/// Where a document click landed, relative to the menu's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    DropdownButton,
    AddSourceButton,
    Dropdown,
    Form,
    Elsewhere,
}

#[derive(Debug, Error)]
pub enum MenuError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("Error saving sources: {0}")]
    Storage(#[from] KvError),
    #[error("no submission form is open")]
    NoOpenForm,
}

struct OpenForm {
    form: SubmissionForm,
    _click_outside: Subscription,
}

pub struct SourcesMenu<S> {
    page: PageContext,
    store: S,
    listeners: ListenerRegistry,
    dropdown: Option<Subscription>,
    form: Option<OpenForm>,
    records: Vec<SourceRecord>,
}

impl<S: KeyValueStore> SourcesMenu<S> {
    pub fn new(page: PageContext, store: S, listeners: ListenerRegistry) -> Self {
        Self {
            page,
            store,
            listeners,
            dropdown: None,
            form: None,
            records: Vec::new(),
        }
    }

    pub fn page(&self) -> &PageContext {
        &self.page
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_dropdown_open(&self) -> bool {
        self.dropdown.is_some()
    }

    pub fn is_form_open(&self) -> bool {
        self.form.is_some()
    }

    pub fn form(&self) -> Option<&SubmissionForm> {
        self.form.as_ref().map(|f| &f.form)
    }

    pub fn form_mut(&mut self) -> Option<&mut SubmissionForm> {
        self.form.as_mut().map(|f| &mut f.form)
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    /// Re-read the record list for this page's video.
    pub async fn load(&mut self) -> Result<&[SourceRecord], MenuError> {
        self.records = self.store.get(self.page.video_id()).await?;
        debug!(video_id = %self.page.video_id(), count = self.records.len(), "sources loaded");
        Ok(&self.records)
    }

    /// Open (and refresh) the dropdown, or close it if it is open.
    pub async fn toggle_dropdown(&mut self) -> Result<(), MenuError> {
        if self.dropdown.take().is_some() {
            return Ok(());
        }
        self.load().await?;
        self.dropdown = Some(self.listeners.register(Listener::DropdownClickOutside));
        Ok(())
    }

    /// Show a fresh form. Any form already open is discarded first.
    pub fn open_form(&mut self) -> &mut SubmissionForm {
        self.form = None;
        let open = self.form.insert(OpenForm {
            form: SubmissionForm::new(),
            _click_outside: self.listeners.register(Listener::FormClickOutside),
        });
        &mut open.form
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    /// The form lives inside the menu container, so only clicks outside the
    /// whole menu close the dropdown. The form closes on any click outside it
    /// other than the menu buttons, including clicks in the dropdown list.
    pub fn handle_click(&mut self, target: ClickTarget) {
        if self.dropdown.is_some() && target == ClickTarget::Elsewhere {
            self.dropdown = None;
        }
        let outside_form = matches!(target, ClickTarget::Dropdown | ClickTarget::Elsewhere);
        if self.form.is_some() && outside_form {
            self.form = None;
        }
    }

    /// Collect the open form, append to the stored list and persist it.
    /// On error the form stays open so the user can fix it.
    pub async fn submit(&mut self) -> Result<usize, MenuError> {
        let open = self.form.as_ref().ok_or(MenuError::NoOpenForm)?;
        let new_records = open.form.collect(Utc::now())?;
        let added = new_records.len();

        let video_id = self.page.video_id();
        let mut all = self.store.get(video_id).await?;
        all.extend(new_records);
        if let Err(e) = self.store.set(video_id, all).await {
            warn!(video_id = %video_id, error = %e, "saving sources failed");
            return Err(e.into());
        }

        self.load().await?;
        self.form = None;
        Ok(added)
    }

    pub fn count_label(&self) -> String {
        render::count_label(self.records.len())
    }

    pub fn render(&self) -> String {
        render::render_list(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_context_requires_watch_and_v() {
        let p = PageContext::from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10").unwrap();
        assert_eq!(p.video_id(), "dQw4w9WgXcQ");
        assert!(PageContext::from_url("https://www.youtube.com/feed/trending").is_none());
        assert!(PageContext::from_url("https://www.youtube.com/watch").is_none());
        assert!(PageContext::from_url("https://www.youtube.com/watch?v=").is_none());
        assert!(PageContext::from_url("not a url").is_none());
    }

    #[test]
    fn dropping_a_subscription_deregisters() {
        let reg = ListenerRegistry::new();
        let a = reg.register(Listener::DropdownClickOutside);
        let b = reg.register(Listener::FormClickOutside);
        assert_eq!(reg.active(), vec![Listener::DropdownClickOutside, Listener::FormClickOutside]);
        drop(a);
        assert_eq!(reg.active(), vec![Listener::FormClickOutside]);
        assert_eq!(b.listener(), Listener::FormClickOutside);
        drop(b);
        assert!(reg.is_empty());
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let reg = ListenerRegistry::new();
        let sub = reg.register(Listener::FormClickOutside);
        drop(reg);
        drop(sub);
    }
}
