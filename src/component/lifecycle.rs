//! Component lifecycle channels.
//!
//! Six fixed notification channels, all built on [`Emitter`]. Emission
//! points:
//!
//! - `initialization` then `props_changed`: synchronously during instance
//!   construction, in that order
//! - `before_render` / `after_render`: bracketing every `render()` call
//! - `mounted`: when the component's host output is inserted
//! - `unmounted`: exactly once, when the instance is torn down

use crate::events::Emitter;

/// The fixed channel set owned by every component instance.
#[derive(Clone, Default)]
pub struct LifecycleChannels {
    pub initialization: Emitter<()>,
    pub mounted: Emitter<()>,
    pub props_changed: Emitter<()>,
    pub before_render: Emitter<()>,
    pub after_render: Emitter<()>,
    pub unmounted: Emitter<()>,
}

impl LifecycleChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsubscribe everything registered through the component.
    pub(crate) fn clear_all(&self) {
        self.initialization.clear();
        self.mounted.clear();
        self.props_changed.clear();
        self.before_render.clear();
        self.after_render.clear();
        self.unmounted.clear();
    }
}
