//! Ambient listing state shared with templates during a render pass.

use std::sync::Mutex;

/// Listing totals visible to templates while a result loop renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopContext {
    pub total: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub per_page: u32,
    /// Set while rendering inside the refresh endpoint.
    pub is_search_refresh: bool,
}

/// Slot holding the loop context templates read while rendering.
///
/// Mutations go through [`AmbientLoop::enter`], which returns a guard that
/// restores the previous context when dropped, including on unwind.
#[derive(Debug, Default)]
pub struct AmbientLoop {
    slot: Mutex<LoopContext>,
}

impl AmbientLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active context.
    pub fn current(&self) -> LoopContext {
        self.lock().clone()
    }

    /// Swap `next` in for the duration of the returned scope.
    pub fn enter(&self, next: LoopContext) -> LoopScope<'_> {
        let saved = std::mem::replace(&mut *self.lock(), next);
        LoopScope {
            owner: self,
            saved: Some(saved),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopContext> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Restores the previous loop context on drop.
#[must_use]
pub struct LoopScope<'a> {
    owner: &'a AmbientLoop,
    saved: Option<LoopContext>,
}

impl Drop for LoopScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.owner.lock() = saved;
        }
    }
}
