//! # Communicator hierarchy demo
//!
//! Builds a small tree of communicators sharing one registry and shows:
//! - relationship-restricted subscriptions (`accept_from`)
//! - targeted publishing (`publish_to`)
//! - background and context delivery
//! - weak subscriptions ending when their owner is dropped
//!
//! ```text
//! window ─┬─ toolbar ── save_button
//!         └─ editor
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=commbus=debug cargo run --example hierarchy
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use commbus::{
    context_loop, Action, Communicator, CommunicatorAddress, CommunicatorId, EventRegistry,
    Relationship, SubscribeOptions, ThreadOption,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Clicked {
    label: &'static str,
}

struct Widget {
    name: &'static str,
    id: CommunicatorId,
    parent: Option<Arc<Widget>>,
    registry: OnceLock<EventRegistry>,
}

impl Widget {
    fn new(name: &'static str, parent: Option<&Arc<Widget>>, registry: &EventRegistry) -> Arc<Self> {
        let widget = Arc::new(Self {
            name,
            id: CommunicatorId::new(),
            parent: parent.cloned(),
            registry: OnceLock::new(),
        });
        registry.attach(&*widget);
        widget
    }

    fn address(&self) -> Result<CommunicatorAddress, commbus::EventError> {
        CommunicatorAddress::new(self)
    }

    fn registry(&self) -> Option<&EventRegistry> {
        self.registry.get()
    }
}

impl Communicator for Widget {
    fn communicator_id(&self) -> CommunicatorId {
        self.id
    }

    fn parent_communicator(&self) -> Option<&dyn Communicator> {
        self.parent.as_deref().map(|p| p as &dyn Communicator)
    }

    fn set_event_registry(&self, registry: EventRegistry) {
        let _ = self.registry.set(registry);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = EventRegistry::new();
    let (ui_handle, ui_loop) = context_loop("ui");
    registry.set_context(Arc::new(ui_handle));

    let cancel = CancellationToken::new();
    let ui = tokio::spawn(ui_loop.run(cancel.clone()));

    let window = Widget::new("window", None, &registry);
    let toolbar = Widget::new("toolbar", Some(&window), &registry);
    let save_button = Widget::new("save_button", Some(&toolbar), &registry);
    let editor = Widget::new("editor", Some(&window), &registry);

    let clicks = registry.channel::<Clicked>();

    // The toolbar only listens to its direct children.
    let toolbar_name = toolbar.name;
    let on_toolbar_click: Action<Clicked> = Arc::new(move |c: &Clicked| {
        println!("[{toolbar_name}] child clicked: {}", c.label);
    });
    clicks.subscribe_as(&on_toolbar_click, &toolbar.address()?, Relationship::CLOSEST_CHILD)?;

    // The editor reacts on the UI context to anything from its sibling's subtree.
    let editor_name = editor.name;
    let on_editor_click: Action<Clicked> = Arc::new(move |c: &Clicked| {
        println!("[{editor_name}] (ui thread) saw: {}", c.label);
    });
    clicks.subscribe_with(
        &on_editor_click,
        SubscribeOptions::new()
            .thread(ThreadOption::Context)
            .subscriber(editor.address()?)
            .accept_from(Relationship::SIBLING_CHILD),
    )?;

    // An audit log runs in the background and hears everything.
    let audit = clicks.subscribe_with_fn(
        |c: &Clicked| println!("[audit] (background) {}", c.label),
        SubscribeOptions::new().thread(ThreadOption::Background),
    )?;

    if let Some(registry) = save_button.registry() {
        registry.channel::<Clicked>().publish_from(
            &save_button.address()?,
            Clicked { label: "save" },
            Relationship::ANY,
        )?;
    }

    // Aimed at the window's direct children, but none of them accepts
    // events from a parent, so nothing is printed.
    clicks.publish_from(
        &window.address()?,
        Clicked { label: "window resized" },
        Relationship::CLOSEST_CHILD,
    )?;

    tokio::time::sleep(Duration::from_millis(100)).await;

    // Dropping the toolbar's handler ends its subscription.
    drop(on_toolbar_click);
    audit.unsubscribe();
    clicks.publish_from(&save_button.address()?, Clicked { label: "save again" }, Relationship::ANY)?;
    println!("subscriptions left: {}", clicks.len());

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    ui.await?;
    Ok(())
}
