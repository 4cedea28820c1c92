//! Heartbeat monitor
//!
//! Every tick either sends a WebSocket Ping or, when the previous Ping was
//! never answered, tells the connection task to terminate the session.
//! A session starts out as if a Pong had just arrived, so the first tick
//! always probes.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    /// The last probe was acknowledged (or none was sent yet).
    AwaitingProbe,
    /// A probe is outstanding.
    ProbeSent,
    /// A probe went unanswered for a whole interval.
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    SendProbe,
    Terminate,
}

#[derive(Debug)]
pub struct Heartbeat {
    state: HeartbeatState,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: HeartbeatState::AwaitingProbe,
            interval,
        }
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    pub fn on_tick(&mut self) -> HeartbeatAction {
        match self.state {
            HeartbeatState::AwaitingProbe => {
                self.state = HeartbeatState::ProbeSent;
                HeartbeatAction::SendProbe
            }
            HeartbeatState::ProbeSent | HeartbeatState::TimedOut => {
                self.state = HeartbeatState::TimedOut;
                HeartbeatAction::Terminate
            }
        }
    }

    /// A Pong arrived. Late acknowledgments cannot revive a timed-out session.
    pub fn on_ack(&mut self) {
        if self.state == HeartbeatState::ProbeSent {
            self.state = HeartbeatState::AwaitingProbe;
        }
    }

    /// Periodic timer whose first tick fires one full interval from now.
    ///
    /// The timer belongs to the connection task; dropping it cancels it.
    pub fn ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}
