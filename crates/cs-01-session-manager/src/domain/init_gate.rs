//! # Init Gate
//!
//! One-shot arbiter between the two cold-start identity sources.
//!
//! ```text
//!               ┌────────────── replay ──────────────┐
//!               │                                    ▼
//! [Closed] ──fetch──→ [Open(Fetch)]           Discard (always)
//!    │ ──live event──→ [Open(LiveEvent)]
//!    └──timeout──────→ [Open(TimedOut)]
//!
//! [Open(_)] ──fetch/timeout──→ Discard      ──live event──→ Commit
//! ```
//!
//! The replay carries whatever the provider had cached when the stream was
//! opened, which may predate the fetch; it is never committed. A live event
//! is a real transition and always commits.

/// Which source opened the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSource {
    Fetch,
    LiveEvent,
    TimedOut,
}

/// What to do with an offered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Commit,
    Discard,
}

/// One-shot cold-start gate.
#[derive(Debug, Default)]
pub struct InitGate {
    opened_by: Option<InitSource>,
}

impl InitGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.opened_by.is_some()
    }

    #[must_use]
    pub fn opened_by(&self) -> Option<InitSource> {
        self.opened_by
    }

    /// The current-session fetch resolved.
    pub fn offer_fetch(&mut self) -> GateVerdict {
        self.open_once(InitSource::Fetch)
    }

    /// The init timeout elapsed.
    pub fn offer_timeout(&mut self) -> GateVerdict {
        self.open_once(InitSource::TimedOut)
    }

    /// The synthetic replay event arrived.
    pub fn offer_replay(&mut self) -> GateVerdict {
        GateVerdict::Discard
    }

    /// A live session event arrived.
    pub fn offer_live_event(&mut self) -> GateVerdict {
        if self.opened_by.is_none() {
            self.opened_by = Some(InitSource::LiveEvent);
        }
        GateVerdict::Commit
    }

    fn open_once(&mut self, source: InitSource) -> GateVerdict {
        if self.opened_by.is_some() {
            return GateVerdict::Discard;
        }
        self.opened_by = Some(source);
        GateVerdict::Commit
    }
}
