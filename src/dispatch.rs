//! Owner-thread dispatch.
//!
//! A [`UiDispatcher`] remembers the thread that created it. Other threads get
//! a [`UiHandle`] and post messages; the owner drains them once per frame and
//! applies them in order.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::thread::{self, ThreadId};

use crate::error::DispatchError;

pub const DEFAULT_CAPACITY: usize = 64;

pub struct UiDispatcher<M> {
    owner: ThreadId,
    sender: Sender<M>,
    receiver: Receiver<M>,
    waker: Option<egui::Context>,
}

impl<M> UiDispatcher<M> {
    /// Create a dispatcher owned by the calling thread.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            owner: thread::current().id(),
            sender,
            receiver,
            waker: None,
        }
    }

    /// Request a repaint on every post so the owner wakes up to drain.
    pub fn with_waker(mut self, ctx: egui::Context) -> Self {
        self.waker = Some(ctx);
        self
    }

    pub fn handle(&self) -> UiHandle<M> {
        UiHandle {
            owner: self.owner,
            sender: self.sender.clone(),
            waker: self.waker.clone(),
        }
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Take every queued message, oldest first.
    pub fn drain(&self) -> Result<Vec<M>, DispatchError> {
        if !self.is_owner_thread() {
            return Err(DispatchError::NotOwner);
        }
        let mut out = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => out.push(msg),
                // The dispatcher holds a sender itself, so the queue never disconnects here.
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(out)
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

pub struct UiHandle<M> {
    owner: ThreadId,
    sender: Sender<M>,
    waker: Option<egui::Context>,
}

impl<M> Clone for UiHandle<M> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            sender: self.sender.clone(),
            waker: self.waker.clone(),
        }
    }
}

impl<M> UiHandle<M> {
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Queue a message for the owner thread. Never blocks.
    pub fn post(&self, msg: M) -> Result<(), DispatchError> {
        match self.sender.try_send(msg) {
            Ok(()) => {
                if let Some(ctx) = &self.waker {
                    ctx.request_repaint();
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(DispatchError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_post_order() {
        let dispatcher = UiDispatcher::new(8);
        let handle = dispatcher.handle();
        let worker = thread::spawn(move || {
            for i in 0..5 {
                handle.post(i).unwrap();
            }
        });
        worker.join().unwrap();

        assert_eq!(dispatcher.pending(), 5);
        assert_eq!(dispatcher.drain().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(dispatcher.drain().unwrap().is_empty());
    }

    #[test]
    fn full_queue_is_reported() {
        let dispatcher = UiDispatcher::new(2);
        let handle = dispatcher.handle();
        handle.post("a").unwrap();
        handle.post("b").unwrap();
        assert_eq!(handle.post("c"), Err(DispatchError::QueueFull));
    }

    #[test]
    fn dropped_dispatcher_disconnects_handles() {
        let dispatcher = UiDispatcher::<u8>::new(2);
        let handle = dispatcher.handle();
        drop(dispatcher);
        assert_eq!(handle.post(1), Err(DispatchError::Disconnected));
    }

    #[test]
    fn owner_is_the_creating_thread() {
        let dispatcher = UiDispatcher::<u8>::new(2);
        let handle = dispatcher.handle();
        assert!(handle.is_owner_thread());

        let remote = handle.clone();
        let on_worker = thread::spawn(move || remote.is_owner_thread()).join().unwrap();
        assert!(!on_worker);
    }

    #[test]
    fn drain_off_owner_thread_fails() {
        // The receiver side is Send, so move the whole dispatcher to prove the check.
        let dispatcher = UiDispatcher::<u8>::new(2);
        let result = thread::spawn(move || dispatcher.drain()).join().unwrap();
        assert_eq!(result, Err(DispatchError::NotOwner));
    }
}
