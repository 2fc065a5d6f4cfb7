//! Kernel event bus.
//!
//! Drivers publish typed events; interested subsystems subscribe with a
//! plain function. Listener slots are fixed-capacity since there is no
//! allocator dependency down here.

use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelEvent {
    /// At least one principal mouse button is held; carries the button
    /// states together with the cumulative cursor position.
    MouseButtons {
        left: bool,
        right: bool,
        middle: bool,
        x: i32,
        y: i32,
    },
    /// Cursor position after bounds clamping; fired on every complete
    /// mouse packet.
    MouseMoved { x: i32, y: i32 },
}

pub type Listener = fn(&KernelEvent);

const MAX_LISTENERS: usize = 8;

static LISTENERS: Mutex<[Option<Listener>; MAX_LISTENERS]> = Mutex::new([None; MAX_LISTENERS]);

/// Register a listener for all kernel events. Returns Err when every
/// slot is taken.
pub fn subscribe(listener: Listener) -> Result<(), ()> {
    let mut listeners = LISTENERS.lock();
    for slot in listeners.iter_mut() {
        if slot.is_none() {
            *slot = Some(listener);
            return Ok(());
        }
    }
    Err(())
}

/// Deliver an event to every registered listener. The listener table is
/// snapshotted first so listeners may subscribe without deadlocking.
pub fn publish(event: &KernelEvent) {
    let snapshot = *LISTENERS.lock();
    for listener in snapshot.iter().flatten() {
        listener(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    static DELIVERIES: AtomicUsize = AtomicUsize::new(0);
    static LAST_X: AtomicI32 = AtomicI32::new(0);

    fn count_moves(event: &KernelEvent) {
        if let KernelEvent::MouseMoved { x, .. } = event {
            DELIVERIES.fetch_add(1, Ordering::Relaxed);
            LAST_X.store(*x, Ordering::Relaxed);
        }
    }

    #[test_case]
    fn publish_reaches_subscriber() {
        subscribe(count_moves).unwrap();
        let before = DELIVERIES.load(Ordering::Relaxed);
        publish(&KernelEvent::MouseMoved { x: 42, y: 7 });
        assert_eq!(DELIVERIES.load(Ordering::Relaxed), before + 1);
        assert_eq!(LAST_X.load(Ordering::Relaxed), 42);
    }

    #[test_case]
    fn button_events_do_not_match_move_listener() {
        let before = DELIVERIES.load(Ordering::Relaxed);
        publish(&KernelEvent::MouseButtons {
            left: true,
            right: false,
            middle: false,
            x: 1,
            y: 2,
        });
        assert_eq!(DELIVERIES.load(Ordering::Relaxed), before);
    }
}
