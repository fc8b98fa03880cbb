//! # Persistent Socket Cache
//!
//! Purpose: Keep sockets of persistent connections alive after their
//! `Connection` handle is dropped so the next `pconnect` to the same
//! endpoint skips the TCP handshake.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Idle sockets are parked per endpoint and
//!    handed back out in FIFO order.
//! 2. **Minimal Locking**: The mutex is held only while moving sockets.
//! 3. **No Health Checks**: A parked socket is trusted until it fails; a
//!    transport failure keeps the socket from being parked again.

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::connection::Transport;

type Parked = HashMap<String, VecDeque<Transport>>;

static PARKED: OnceLock<Mutex<Parked>> = OnceLock::new();

fn parked() -> &'static Mutex<Parked> {
    PARKED.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Takes an idle socket for `endpoint`, if one was parked.
pub(crate) fn take(endpoint: &str) -> Option<Transport> {
    let mut state = parked().lock();
    let queue = state.get_mut(endpoint)?;
    let transport = queue.pop_front();
    if queue.is_empty() {
        state.remove(endpoint);
    }
    transport
}

/// Parks an idle socket for later reuse.
pub(crate) fn park(endpoint: &str, transport: Transport) {
    let mut state = parked().lock();
    state.entry(endpoint.to_string()).or_default().push_back(transport);
}

/// Number of idle persistent sockets parked for `endpoint`.
pub fn parked_count(endpoint: &str) -> usize {
    parked().lock().get(endpoint).map(VecDeque::len).unwrap_or(0)
}
