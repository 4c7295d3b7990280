// src/overlay/mod.rs
// Platform-independent core of the page overlay. A DOM adapter forwards
// clicks and form input here and paints `SourcesMenu::render()`.

pub mod client;
pub mod form;
pub mod kv;
pub mod menu;
pub mod render;

pub use client::{ApiClient, ClientError};
pub use form::{FormError, SourceInputGroup, SubmissionForm};
pub use kv::{JsonFileKv, KeyValueStore, KvError, MemoryKv};
pub use menu::{
    ClickTarget, Listener, ListenerRegistry, MenuError, PageContext, SourcesMenu, Subscription,
};
pub use render::render_list;
