//! Keep-alive policy for observer sockets.
//!
//! The connection loop asks [`Liveness::verdict`] on every check tick and
//! acts on the answer: send a ping, keep going, or close the socket. A close
//! issued here is counted in the hub's `timedOut` metric by the caller.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::BroadcastConfig;

/// How long a ping may stay unanswered
const PONG_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    /// Client silence before the server pings
    pub heartbeat: Duration,
    /// Client silence before the socket is closed regardless of pings
    pub idle_timeout: Duration,
    pub pong_grace: Duration,
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self::from_config(&BroadcastConfig::default())
    }
}

impl KeepAlive {
    pub fn from_config(config: &BroadcastConfig) -> Self {
        Self {
            heartbeat: Duration::from_secs(config.heartbeat_secs.max(1)),
            idle_timeout: Duration::from_secs(config.client_idle_timeout_secs.max(1)),
            pong_grace: PONG_GRACE,
        }
    }

    /// Tick period for the connection loop
    pub fn check_period(&self) -> Duration {
        (self.heartbeat / 2).clamp(Duration::from_millis(100), Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Idle,
    PongTimeout,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Idle => "idle timeout",
            CloseReason::PongTimeout => "pong timeout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    SendPing,
    Close(CloseReason),
}

/// What one socket has heard from its client
#[derive(Debug)]
pub struct Liveness {
    policy: KeepAlive,
    last_heard: Instant,
    ping_in_flight: Option<Instant>,
}

impl Liveness {
    pub fn new(policy: KeepAlive) -> Self {
        Self {
            policy,
            last_heard: Instant::now(),
            ping_in_flight: None,
        }
    }

    /// Any inbound frame answers an outstanding ping
    pub fn heard_from_client(&mut self) {
        self.last_heard = Instant::now();
        self.ping_in_flight = None;
    }

    pub fn ping_sent(&mut self) {
        self.ping_in_flight = Some(Instant::now());
    }

    pub fn silent_for(&self) -> Duration {
        self.last_heard.elapsed()
    }

    pub fn verdict(&self) -> Verdict {
        if let Some(sent) = self.ping_in_flight {
            if sent.elapsed() >= self.policy.pong_grace {
                return Verdict::Close(CloseReason::PongTimeout);
            }
        }

        let silent = self.silent_for();
        if silent >= self.policy.idle_timeout {
            Verdict::Close(CloseReason::Idle)
        } else if self.ping_in_flight.is_none() && silent >= self.policy.heartbeat {
            Verdict::SendPing
        } else {
            Verdict::Healthy
        }
    }
}
