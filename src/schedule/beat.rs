use crate::foundation::core::BeatSpec;
use crate::foundation::error::{StepbeatError, StepbeatResult};

/// Fraction of a beat interval a counter glyph stays visible.
///
/// The 10% gap prevents visual overlap between consecutive glyphs.
pub const BEAT_VISIBLE_FRACTION: f64 = 0.9;

/// One symbol of the step cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StepSymbol {
    /// A numbered count beat (1-based).
    Count(u8),
    /// A tap beat, visually distinguished from the counts.
    Tap,
}

impl StepSymbol {
    /// Whether this is the tap beat.
    pub fn is_tap(self) -> bool {
        matches!(self, Self::Tap)
    }
}

impl std::fmt::Display for StepSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Tap => write!(f, "T"),
        }
    }
}

/// The fixed 8-count step cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepCycle {
    symbols: [StepSymbol; 8],
}

impl StepCycle {
    /// The bachata cycle `1, 2, 3, T, 5, 6, 7, T`: the tap falls on beats 4 and 8.
    pub fn bachata() -> Self {
        use StepSymbol::{Count, Tap};
        Self {
            symbols: [
                Count(1),
                Count(2),
                Count(3),
                Tap,
                Count(5),
                Count(6),
                Count(7),
                Tap,
            ],
        }
    }

    /// Symbol at a (possibly unbounded) beat index; wraps every 8 beats.
    pub fn symbol_at(&self, beat_index: u64) -> StepSymbol {
        self.symbols[(beat_index % 8) as usize]
    }

    /// Distinct symbols in first-occurrence order.
    ///
    /// At most 8; fewer in practice since the tap repeats.
    pub fn distinct_symbols(&self) -> Vec<StepSymbol> {
        let mut out = Vec::with_capacity(self.symbols.len());
        for &symbol in &self.symbols {
            if !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        out
    }
}

impl Default for StepCycle {
    fn default() -> Self {
        Self::bachata()
    }
}

/// One scheduled counter glyph occurrence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatEvent {
    /// Which symbol to show.
    pub symbol: StepSymbol,
    /// Display start in seconds.
    pub start_sec: f64,
    /// Visible duration in seconds (`0.9 ×` seconds-per-beat).
    pub duration_sec: f64,
}

/// Map the beat grid onto video time.
///
/// Emits one event per beat from `spec.offset_sec` while the start time is
/// strictly below `duration_sec`. Start times are computed as
/// `offset + i × spb` (not accumulated), so they are strictly increasing and
/// drift-free. Returns an empty sequence when the offset is at or past the end
/// of the video.
pub fn generate_beat_events(
    spec: &BeatSpec,
    cycle: &StepCycle,
    duration_sec: f64,
) -> StepbeatResult<Vec<BeatEvent>> {
    if !spec.bpm.is_finite() || spec.bpm <= 0.0 {
        return Err(StepbeatError::invalid_parameter("bpm must be finite and > 0"));
    }
    if !spec.offset_sec.is_finite() || spec.offset_sec < 0.0 {
        return Err(StepbeatError::invalid_parameter(
            "offset must be finite and >= 0",
        ));
    }
    if !duration_sec.is_finite() || duration_sec <= 0.0 {
        return Err(StepbeatError::invalid_parameter(
            "duration must be finite and > 0",
        ));
    }

    let spb = spec.seconds_per_beat();
    let visible = spb * BEAT_VISIBLE_FRACTION;
    let mut events = Vec::new();
    let mut beat_index: u64 = 0;
    loop {
        let start_sec = spec.offset_sec + (beat_index as f64) * spb;
        if start_sec >= duration_sec {
            break;
        }
        events.push(BeatEvent {
            symbol: cycle.symbol_at(beat_index),
            start_sec,
            duration_sec: visible,
        });
        beat_index += 1;
    }
    Ok(events)
}
