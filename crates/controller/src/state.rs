use std::sync::atomic::AtomicI32;
use std::sync::Arc;

use tokio::sync::watch;

use crate::session::Session;

/// Process-wide controller state shared between the agent server and the
/// viewer (session) server.
///
/// Only one session is active at a time (see SPEC_FULL.md's "replacing
/// global viewer binding" design note); agent streams observe the current
/// one through a `watch` channel so a new viewer connection transparently
/// takes over dispatch for every already-connected agent.
pub struct ControllerState {
    pub session: watch::Sender<Option<Arc<Session>>>,
    pub worker_count: AtomicI32,
}

impl ControllerState {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            session,
            worker_count: AtomicI32::new(0),
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}
