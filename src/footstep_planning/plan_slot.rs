//! Single-slot plan handoff
//!
//! The planner publishes its latest plan, the controller takes it whenever
//! it is ready. Neither side blocks and a newer plan simply replaces an
//! unread older one.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::plan::FootstepPlan;

#[derive(Debug, Default)]
pub struct PlanSlot {
    inner: ArcSwapOption<FootstepPlan>,
}

impl PlanSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is in the slot
    pub fn publish(&self, plan: FootstepPlan) {
        self.inner.store(Some(Arc::new(plan)));
    }

    /// Publish a plan the caller keeps a handle to, without copying it
    pub fn publish_shared(&self, plan: Arc<FootstepPlan>) {
        self.inner.store(Some(plan));
    }

    /// Read and clear
    pub fn take(&self) -> Option<Arc<FootstepPlan>> {
        self.inner.swap(None)
    }

    /// Read without clearing
    pub fn peek(&self) -> Option<Arc<FootstepPlan>> {
        self.inner.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.load().is_none()
    }
}
