//! Client session state.
//!
//! One record tracks connection liveness, the in-flight SUBSCRIBE, the
//! active subscription list and ping bookkeeping. Timestamps are
//! milliseconds with 0 meaning "unset"; the invariant throughout is that
//! `connected_at == 0` exactly when a close reason is recorded.

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::packets::{SubAck, Subscribe};
use crate::protocol::QoS;
use heapless::{String, Vec};

/// One acknowledged subscription: the filter and the QoS the server
/// actually granted (which may be lower than requested).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription<const FILTER_LEN: usize> {
    pub filter: String<FILTER_LEN>,
    pub granted_qos: QoS,
}

/// Session record. Capacities: `MAX_SUBS` acknowledged subscriptions,
/// `MAX_FILTERS` filters per in-flight SUBSCRIBE, `FILTER_LEN` bytes per
/// stored filter.
#[derive(Debug)]
pub struct Session<const MAX_SUBS: usize, const MAX_FILTERS: usize, const FILTER_LEN: usize> {
    connected_at: u64,
    last_rx: u64,
    last_tx: u64,
    pending_subscribe: Vec<(String<FILTER_LEN>, QoS), MAX_FILTERS>,
    active_subscriptions: Vec<Subscription<FILTER_LEN>, MAX_SUBS>,
    ping_sent: u64,
    ping_reply_needed: u64,
    close_reason: Option<Error>,
}

impl<const MAX_SUBS: usize, const MAX_FILTERS: usize, const FILTER_LEN: usize> Default
    for Session<MAX_SUBS, MAX_FILTERS, FILTER_LEN>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX_SUBS: usize, const MAX_FILTERS: usize, const FILTER_LEN: usize>
    Session<MAX_SUBS, MAX_FILTERS, FILTER_LEN>
{
    pub fn new() -> Self {
        Session {
            connected_at: 0,
            last_rx: 0,
            last_tx: 0,
            pending_subscribe: Vec::new(),
            active_subscriptions: Vec::new(),
            ping_sent: 0,
            ping_reply_needed: 0,
            close_reason: Some(Error::NeverConnected),
        }
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.connected_at == 0,
            self.close_reason.is_some(),
            "session invariant violated: connected_at and close_reason disagree"
        );
    }

    /// CONNACK with return code 0 arrived: the previous connection's state
    /// is gone and the session is live.
    pub fn on_connect(&mut self, now: u64) {
        self.close_reason = None;
        self.connected_at = now;
        self.last_rx = now;
        self.ping_sent = 0;
        self.ping_reply_needed = 0;
        self.pending_subscribe.clear();
        self.active_subscriptions.clear();
        self.check_invariant();
        log::debug!("session connected");
    }

    /// Record the reason and drop to disconnected. Callers stop driving a
    /// dead session, so a repeated call only happens when the same failure
    /// surfaces through two paths and the reason just restates itself.
    pub fn on_disconnect(&mut self, reason: Error) {
        if self.close_reason.is_none() {
            log::debug!("session disconnected: {}", reason);
        }
        self.close_reason = Some(reason);
        self.connected_at = 0;
        self.check_invariant();
    }

    pub fn is_connected(&self) -> bool {
        self.check_invariant();
        self.close_reason.is_none()
    }

    /// The cause of disconnection, or None while connected.
    pub fn err(&self) -> Option<Error> {
        self.check_invariant();
        self.close_reason
    }

    pub fn connected_at(&self) -> u64 {
        self.connected_at
    }

    pub fn last_rx(&self) -> u64 {
        self.last_rx
    }

    pub fn last_tx(&self) -> u64 {
        self.last_tx
    }

    pub fn record_rx(&mut self, now: u64) {
        self.last_rx = now;
    }

    pub fn record_tx(&mut self, now: u64) {
        self.last_tx = now;
    }

    // ===== SUBSCRIBE BOOKKEEPING =====

    /// Copy the outgoing SUBSCRIBE so the SUBACK can be checked against it.
    /// Filters are copied because the caller's borrowed views die with the
    /// current call.
    pub fn set_pending_subscribe<const N: usize>(
        &mut self,
        subscribe: &Subscribe<'_, N>,
    ) -> Result<()> {
        self.pending_subscribe.clear();
        for sub in &subscribe.filters {
            let filter = String::try_from(sub.filter)
                .map_err(|_| ProtocolError::UserBufferFull)?;
            self.pending_subscribe
                .push((filter, sub.qos))
                .map_err(|_| ProtocolError::UserBufferFull)?;
        }
        Ok(())
    }

    pub fn awaiting_suback(&self) -> bool {
        !self.pending_subscribe.is_empty()
    }

    pub fn pending_subscribe_len(&self) -> usize {
        self.pending_subscribe.len()
    }

    /// Check a SUBACK against the pending SUBSCRIBE.
    ///
    /// The return-code count must match the pending filter count; on
    /// mismatch the pending record is left intact for inspection. Any
    /// non-failure grant is accepted, and the granted QoS is stored with
    /// the filter even when it is lower than requested.
    pub fn apply_suback<const N: usize>(&mut self, suback: &SubAck<N>) -> Result<()> {
        if suback.return_codes.len() != self.pending_subscribe.len() {
            return Err(Error::SubackMismatch {
                requested: self.pending_subscribe.len(),
                granted: suback.return_codes.len(),
            });
        }
        for (code, (filter, requested)) in
            suback.return_codes.iter().zip(self.pending_subscribe.iter())
        {
            match code.granted() {
                Some(granted_qos) => {
                    if granted_qos != *requested {
                        log::debug!(
                            "subscription {} granted QoS {:?} instead of {:?}",
                            filter,
                            granted_qos,
                            requested
                        );
                    }
                    self.active_subscriptions
                        .push(Subscription {
                            filter: filter.clone(),
                            granted_qos,
                        })
                        .map_err(|_| ProtocolError::UserBufferFull)?;
                }
                None => log::warn!("subscription {} rejected by server", filter),
            }
        }
        self.pending_subscribe.clear();
        Ok(())
    }

    /// Acknowledged subscriptions, in acknowledgement order.
    pub fn subscriptions(&self) -> &[Subscription<FILTER_LEN>] {
        &self.active_subscriptions
    }

    // ===== PING BOOKKEEPING =====

    /// Record an outgoing PINGREQ. Only one may be outstanding, so a second
    /// start while one is pending does not reset the timestamp.
    pub fn start_ping(&mut self, now: u64) {
        if self.ping_sent == 0 {
            self.ping_sent = now;
        }
    }

    pub fn awaiting_pingresp(&self) -> bool {
        self.ping_sent != 0
    }

    pub fn ping_sent(&self) -> u64 {
        self.ping_sent
    }

    /// PINGRESP arrived; the outstanding ping is answered.
    pub fn pingresp_received(&mut self) {
        self.ping_sent = 0;
    }

    /// The server sent a PINGREQ and expects a PINGRESP from us.
    pub fn pingreq_received(&mut self, now: u64) {
        self.ping_reply_needed = now;
    }

    pub fn ping_reply_needed(&self) -> u64 {
        self.ping_reply_needed
    }

    pub fn ping_reply_sent(&mut self) {
        self.ping_reply_needed = 0;
    }
}
