//! Readiness tracking for the search core.
//!
//! A [`ServiceHandle`] records whether index provisioning left the core
//! `Ready` or `Degraded`. Both states serve requests; the degraded reason is
//! kept so health checks can report it.
//!
//! ```rust
//! use clipdex_core::service::{ServiceHandle, ServiceState};
//!
//! let handle = ServiceHandle::new("clip-search");
//! assert_eq!(handle.state(), ServiceState::Stopped);
//!
//! handle.mark_starting();
//! handle.mark_degraded("engine unreachable");
//! assert!(handle.state().is_available());
//! assert_eq!(handle.state().degraded_reason(), Some("engine unreachable"));
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Readiness of the search core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceState {
    /// Not started yet.
    Stopped,
    /// Provisioning the index.
    Starting,
    /// Index known to exist.
    Ready,
    /// Serving, but provisioning failed for the given reason.
    Degraded(String),
}

impl ServiceState {
    /// Returns `true` only for [`ServiceState::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` once startup has settled, healthy or not.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded(_))
    }

    /// Why provisioning failed, when degraded.
    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Self::Degraded(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Ready => write!(f, "ready"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
        }
    }
}

/// Shared, cloneable readiness handle.
///
/// Clones observe the same state. Waiters are woken through a watch channel.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    tx: watch::Sender<ServiceState>,
    changed_at: Mutex<Instant>,
}

impl ServiceHandle {
    /// New handle in [`ServiceState::Stopped`].
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(ServiceState::Stopped);
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                tx,
                changed_at: Mutex::new(Instant::now()),
            }),
        }
    }

    /// Service name used in log lines.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current state.
    pub fn state(&self) -> ServiceState {
        self.inner.tx.borrow().clone()
    }

    /// Replace the state. Returns `false` if it was already `state`.
    pub fn set_state(&self, state: ServiceState) -> bool {
        let changed = self.inner.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state.clone();
            true
        });
        if changed {
            *self
                .inner
                .changed_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Instant::now();
            match &state {
                ServiceState::Degraded(_) => log::warn!("{} is {state}", self.inner.name),
                _ => log::info!("{} is {state}", self.inner.name),
            }
        }
        changed
    }

    /// Enter [`ServiceState::Starting`].
    pub fn mark_starting(&self) {
        self.set_state(ServiceState::Starting);
    }

    /// Enter [`ServiceState::Ready`].
    pub fn mark_ready(&self) {
        self.set_state(ServiceState::Ready);
    }

    /// Enter [`ServiceState::Degraded`].
    pub fn mark_degraded(&self, reason: impl Into<String>) {
        self.set_state(ServiceState::Degraded(reason.into()));
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.inner.tx.subscribe()
    }

    /// Wait for startup to settle into `Ready` or `Degraded`.
    pub async fn wait_available(&self, timeout: Duration) -> Result<ServiceState, String> {
        let mut rx = self.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(ServiceState::is_available)).await {
            Ok(Ok(state)) => Ok(state.clone()),
            Ok(Err(_)) => Err(format!("{}: state channel closed", self.inner.name)),
            Err(_) => Err(format!(
                "{} still {} after {timeout:?}",
                self.inner.name,
                self.state()
            )),
        }
    }

    /// Time spent in the current state.
    pub fn since_change(&self) -> Duration {
        self.inner
            .changed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ServiceState::Ready.to_string(), "ready");
        assert_eq!(
            ServiceState::Degraded("index missing".into()).to_string(),
            "degraded: index missing"
        );
    }

    #[test]
    fn test_degraded_is_available_not_ready() {
        let state = ServiceState::Degraded("connection refused".into());
        assert!(state.is_available());
        assert!(!state.is_ready());
        assert_eq!(state.degraded_reason(), Some("connection refused"));
        assert_eq!(ServiceState::Ready.degraded_reason(), None);
        assert!(!ServiceState::Starting.is_available());
    }

    #[test]
    fn test_clones_share_state() {
        let a = ServiceHandle::new("clip-search");
        let b = a.clone();
        a.mark_ready();
        assert_eq!(b.state(), ServiceState::Ready);
        assert_eq!(b.name(), "clip-search");
    }

    #[test]
    fn test_repeated_state_is_not_a_change() {
        let handle = ServiceHandle::new("clip-search");
        assert!(handle.set_state(ServiceState::Ready));
        assert!(!handle.set_state(ServiceState::Ready));
        assert!(handle.set_state(ServiceState::Degraded("down".into())));
        assert!(handle.set_state(ServiceState::Degraded("still down".into())));
    }

    #[test]
    fn test_subscriber_sees_recovery() {
        let handle = ServiceHandle::new("clip-search");
        let mut rx = handle.subscribe();
        handle.mark_degraded("down");
        handle.mark_ready();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ServiceState::Ready);
    }

    #[tokio::test]
    async fn test_wait_available_after_degraded_start() {
        let handle = ServiceHandle::new("clip-search");
        let h = handle.clone();
        tokio::spawn(async move {
            h.mark_starting();
            tokio::time::sleep(Duration::from_millis(10)).await;
            h.mark_degraded("engine down");
        });

        let state = handle.wait_available(Duration::from_secs(1)).await.unwrap();
        assert_eq!(state.degraded_reason(), Some("engine down"));
    }

    #[tokio::test]
    async fn test_wait_available_times_out_while_starting() {
        let handle = ServiceHandle::new("clip-search");
        handle.mark_starting();
        let err = handle
            .wait_available(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.contains("still starting"));
    }

    #[test]
    fn test_since_change_resets() {
        let handle = ServiceHandle::new("clip-search");
        std::thread::sleep(Duration::from_millis(5));
        let before = handle.since_change();
        handle.mark_ready();
        assert!(handle.since_change() <= before);
    }
}
