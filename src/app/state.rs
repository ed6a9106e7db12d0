use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::router::LoadingIndicator;
use crate::services::auth::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub shown_at: Instant,
}

#[derive(Default)]
pub struct AppState {
    /// Cached for the status bar; refreshed on session events.
    pub principal: Option<Principal>,
    pub toast: Option<Toast>,
}

impl AppState {
    pub fn show_toast(&mut self, text: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    /// Drops an expired toast; returns true when one was dropped.
    pub fn expire_toast(&mut self, ttl: Duration) -> bool {
        let expired = self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.shown_at.elapsed() >= ttl);
        if expired {
            self.toast = None;
        }
        expired
    }
}

/// Loading-indicator collaborator: the controller flips it around every
/// transition, the render pass reads it.
#[derive(Clone, Default)]
pub struct SharedLoadingFlag {
    visible: Arc<AtomicBool>,
}

impl SharedLoadingFlag {
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }
}

impl LoadingIndicator for SharedLoadingFlag {
    fn show(&self) {
        self.visible.store(true, Ordering::Relaxed);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::router::LoadingIndicator;

    use super::{AppState, SharedLoadingFlag, ToastKind};

    #[test]
    fn loading_flag_round_trip() {
        let flag = SharedLoadingFlag::default();
        assert!(!flag.is_visible());
        flag.show();
        assert!(flag.is_visible());
        flag.hide();
        assert!(!flag.is_visible());
    }

    #[test]
    fn toast_expires_after_its_ttl() {
        let mut state = AppState::default();
        state.show_toast("Welcome back!", ToastKind::Success);
        assert!(!state.expire_toast(Duration::from_secs(60)));
        assert!(state.toast.is_some());
        assert!(state.expire_toast(Duration::ZERO));
        assert!(state.toast.is_none());
    }
}
