/*
 *  mailbox.rs
 *
 *  LyMatrix - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Single-slot, overwrite-on-publish exchange between two schedules
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::sync::{Arc, Mutex, PoisonError, TryLockError};

type Slot<T> = Arc<Mutex<Option<T>>>;

/// Publishing half. Every publish replaces whatever the reader has not
/// picked up yet.
#[derive(Debug)]
pub struct MailboxWriter<T> {
    slot: Slot<T>,
}

/// Consuming half. `take` empties the slot.
#[derive(Debug)]
pub struct MailboxReader<T> {
    slot: Slot<T>,
}

/// Create a connected writer/reader pair.
pub fn mailbox<T>() -> (MailboxWriter<T>, MailboxReader<T>) {
    let slot = Arc::new(Mutex::new(None));
    (
        MailboxWriter { slot: Arc::clone(&slot) },
        MailboxReader { slot },
    )
}

impl<T> MailboxWriter<T> {
    /// Overwrite the slot. The lock is only ever held for a swap.
    pub fn publish(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(value);
    }
}

impl<T> MailboxReader<T> {
    /// Take the pending value, if any.
    ///
    /// Never waits: if the writer happens to hold the slot right now the
    /// value stays put and is picked up on the next call.
    pub fn take(&mut self) -> Option<T> {
        match self.slot.try_lock() {
            Ok(mut slot) => slot.take(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().take(),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Peek without consuming, used by tests and diagnostics.
    pub fn is_empty(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears_slot() {
        let (writer, mut reader) = mailbox();
        writer.publish(1);
        assert_eq!(reader.take(), Some(1));
        assert_eq!(reader.take(), None);
    }

    #[test]
    fn test_publish_overwrites_unread_value() {
        let (writer, mut reader) = mailbox();
        writer.publish("first");
        writer.publish("second");
        assert_eq!(reader.take(), Some("second"));
        assert!(reader.is_empty());
    }

    #[test]
    fn test_value_survives_writer_drop() {
        let (writer, mut reader) = mailbox();
        writer.publish(7u8);
        drop(writer);
        assert_eq!(reader.take(), Some(7));
    }

    #[test]
    fn test_cross_thread_publish() {
        let (writer, mut reader) = mailbox();
        let handle = std::thread::spawn(move || {
            for i in 0..100u32 {
                writer.publish(i);
            }
        });
        handle.join().unwrap();
        assert_eq!(reader.take(), Some(99));
    }
}
