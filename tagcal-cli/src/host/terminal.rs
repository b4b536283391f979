use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tagcal_core::reminder::ports::{SubscriptionId, Surface, VisibilityListener};
use tracing::info;

struct TerminalState {
    visible: bool,
    location: String,
    listeners: Vec<(u64, Arc<dyn Fn() + Send + Sync>)>,
    next_id: u64,
}

/// The terminal running `tagcal remind`. The user hides and shows it with
/// the `hide`/`show` commands; "location" is the view it last switched to.
pub struct TerminalSurface {
    state: Mutex<TerminalState>,
}

impl TerminalSurface {
    pub fn new(location: &str) -> Self {
        TerminalSurface {
            state: Mutex::new(TerminalState {
                visible: true,
                location: location.to_owned(),
                listeners: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Listeners run on the calling thread, after the lock is released.
    pub fn set_visible(&self, visible: bool) {
        let listeners: Vec<_> = {
            let mut state = self.state.lock();
            if state.visible == visible {
                return;
            }
            state.visible = visible;
            state.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };

        for listener in listeners {
            listener();
        }
    }
}

impl Surface for TerminalSurface {
    fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    fn subscribe(&self, listener: VisibilityListener) -> SubscriptionId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.listeners.push((id, Arc::from(listener)));
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock().listeners.retain(|(listener, _)| *listener != id.0);
    }

    fn focus(&self) {
        // Bell
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }

    fn location(&self) -> String {
        self.state.lock().location.clone()
    }

    fn navigate(&self, location: &str) {
        self.state.lock().location = location.to_owned();
        info!(location, "Switched view");
    }
}
