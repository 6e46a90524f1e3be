//! Internal engine events (not exposed via SSE)
//!
//! Media readiness, timers, and faults all funnel into one uniform event
//! type dispatched through a single handler, so ordering and supersession
//! logic lives in one place. Every event carries the operation generation
//! that was current when its source was armed; the handler drops events
//! whose generation has been superseded.

/// Internal sequencer events
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The media resource became ready to play the loaded source
    Ready { generation: u64 },

    /// Periodic position-reporting tick (~100ms while playing)
    Tick { generation: u64 },

    /// The armed interval deadline elapsed
    Deadline { generation: u64 },

    /// The underlying media ended naturally before the deadline
    Ended { generation: u64 },

    /// The media resource failed to load or play
    Error { generation: u64, message: String },
}

impl EngineEvent {
    /// Generation stamp carried by the event
    pub fn generation(&self) -> u64 {
        match self {
            EngineEvent::Ready { generation }
            | EngineEvent::Tick { generation }
            | EngineEvent::Deadline { generation }
            | EngineEvent::Ended { generation }
            | EngineEvent::Error { generation, .. } => *generation,
        }
    }
}
