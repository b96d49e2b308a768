//! Hand-off of draw messages to the presentation side. The GPU front-end runs on the emulator
//! thread and the consumer on its own thread, so the two communicate through a single-slot
//! rendezvous guarded by a mutex and condition variable.
//!
//! This is deliberately not a queue: the producer blocks until the previous message has been
//! taken, which keeps the emulator from racing ahead of the consumer.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::psx::gpu::commands::Vertex;

/// A draw message emitted by the GPU front-end, in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuMsg {
    /// Draw a triangle
    Triangle([Vertex; 3]),
    /// Draw a quad
    Quad([Vertex; 4]),
    /// The drawing offset changed
    Offset { x: i32, y: i32 },
    /// Draw barrier: everything received so far should be flushed to the screen
    Draw,
}

/// Single-value slot shared between the producer and the consumer
struct Slot {
    value: Mutex<Option<GpuMsg>>,
    /// Signaled by the consumer when the slot frees up
    taken: Condvar,
}

impl Slot {
    fn new() -> Slot {
        Slot {
            value: Mutex::new(None),
            taken: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<Option<GpuMsg>> {
        self.value.lock().unwrap()
    }
}

/// Producer half, held by the GPU front-end
#[derive(Clone)]
pub struct Link {
    slot: Arc<Slot>,
}

impl Link {
    /// Hand `msg` to the consumer. Blocks while a previous message is still in the slot.
    pub fn put(&self, msg: GpuMsg) {
        let mut value = self.slot.lock();

        while value.is_some() {
            value = self.slot.taken.wait(value).unwrap();
        }

        *value = Some(msg);
    }
}

impl Default for Link {
    /// A link with no consumer attached. Used as a placeholder when restoring serialized GPU
    /// state; the restore path swaps the live link back in.
    fn default() -> Link {
        Link {
            slot: Arc::new(Slot::new()),
        }
    }
}

/// Consumer half, held by the presentation side
pub struct Output {
    slot: Arc<Slot>,
}

impl Output {
    /// Take the pending message if there is one. Never blocks.
    pub fn consume(&self) -> Option<GpuMsg> {
        let msg = self.slot.lock().take();

        if msg.is_some() {
            // A producer may be parked waiting for the slot to free up
            self.slot.taken.notify_one();
        }

        msg
    }
}

/// Create a connected producer/consumer pair
pub fn link() -> (Link, Output) {
    let slot = Arc::new(Slot::new());

    (Link { slot: slot.clone() }, Output { slot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psx::gpu::commands::{Color, Position};
    use std::thread;

    fn vertex(x: i32, y: i32) -> Vertex {
        Vertex {
            position: Position { x, y },
            color: Color { r: 1, g: 2, b: 3 },
        }
    }

    #[test]
    fn consume_empty() {
        let (_tx, rx) = link();

        assert_eq!(rx.consume(), None);
    }

    #[test]
    fn single_slot_handoff() {
        let (tx, rx) = link();

        tx.put(GpuMsg::Draw);
        assert_eq!(rx.consume(), Some(GpuMsg::Draw));
        assert_eq!(rx.consume(), None);

        tx.put(GpuMsg::Offset { x: -4, y: 12 });
        assert_eq!(rx.consume(), Some(GpuMsg::Offset { x: -4, y: 12 }));
    }

    #[test]
    fn producer_blocks_until_consumed() {
        let (tx, rx) = link();

        // Fill the slot so the producer thread has to wait
        tx.put(GpuMsg::Draw);

        let producer = thread::spawn(move || {
            tx.put(GpuMsg::Quad([vertex(0, 0); 4]));
            tx.put(GpuMsg::Draw);
        });

        // Drain everything in order
        let mut msgs = Vec::new();
        while msgs.len() < 3 {
            if let Some(m) = rx.consume() {
                msgs.push(m);
            } else {
                thread::yield_now();
            }
        }

        producer.join().unwrap();

        assert_eq!(
            msgs,
            vec![
                GpuMsg::Draw,
                GpuMsg::Quad([vertex(0, 0); 4]),
                GpuMsg::Draw
            ]
        );
    }
}
