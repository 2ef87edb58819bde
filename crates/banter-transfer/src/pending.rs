//! Offers awaiting an answer.
//!
//! A FILE_TRANSFER_RESP carries no transfer identification, so the server
//! settles offers in arrival order: a response always resolves the *oldest*
//! offer addressed to the responding receiver.

use std::collections::{HashMap, VecDeque};

/// One offer in flight between FILE_TRANSFER_REQ and its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOffer {
    pub sender: String,
    pub receiver: String,
    pub filename: String,
    pub checksum: String,
}

/// Offer queues keyed by receiver.
#[derive(Debug, Default)]
pub struct PendingTransfers {
    queues: HashMap<String, VecDeque<TransferOffer>>,
}

impl PendingTransfers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, offer: TransferOffer) {
        self.queues
            .entry(offer.receiver.clone())
            .or_default()
            .push_back(offer);
    }

    /// Settle the oldest offer addressed to `receiver`.
    pub fn pop(&mut self, receiver: &str) -> Option<TransferOffer> {
        let queue = self.queues.get_mut(receiver)?;
        let offer = queue.pop_front();
        if queue.is_empty() {
            self.queues.remove(receiver);
        }
        offer
    }

    /// Remove the newest offer matching the triple, for rolling back an
    /// offer whose forwarding to the receiver failed.
    pub fn retract(&mut self, receiver: &str, sender: &str, filename: &str) -> bool {
        let Some(queue) = self.queues.get_mut(receiver) else {
            return false;
        };
        let Some(pos) = queue
            .iter()
            .rposition(|offer| offer.sender == sender && offer.filename == filename)
        else {
            return false;
        };
        queue.remove(pos);
        if queue.is_empty() {
            self.queues.remove(receiver);
        }
        true
    }

    /// Drop every offer sent by or addressed to `player`. Used on
    /// disconnect.
    pub fn drop_player(&mut self, player: &str) {
        self.queues.remove(player);
        for queue in self.queues.values_mut() {
            queue.retain(|offer| offer.sender != player);
        }
        self.queues.retain(|_, queue| !queue.is_empty());
    }
}
