//! FIFO of popups awaiting the player.
//!
//! The front entry is the one on screen. Pushing raises a pause request the
//! time loop consumes before starting its next tick; closing the last popup
//! drops any request still outstanding.

use std::collections::VecDeque;

use geoscape_core::events::Popup;

#[derive(Debug, Clone, Default)]
pub struct PopupQueue {
    queue: VecDeque<Popup>,
    pause_requested: bool,
}

impl PopupQueue {
    pub fn push(&mut self, popup: Popup) {
        tracing::debug!(target: "geoscape::popups", ?popup, "popup.queued");
        self.queue.push_back(popup);
        self.pause_requested = true;
    }

    /// The popup currently on screen.
    pub fn active(&self) -> Option<&Popup> {
        self.queue.front()
    }

    /// Close the active popup; the next one (if any) becomes active.
    pub fn dismiss(&mut self) -> Option<Popup> {
        let popup = self.queue.pop_front();
        if self.queue.is_empty() {
            self.pause_requested = false;
        }
        popup
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Popup> {
        self.queue.iter()
    }

    /// Consume the pause request raised since the last call.
    pub fn take_pause_request(&mut self) -> bool {
        std::mem::take(&mut self.pause_requested)
    }
}
