// ── Advertisement matcher ──
//
// Identifies the target strip from a stream of BLE advertisements. One
// unambiguous signal exists (the advertised control service id); when it
// never shows up within the observation window, the matcher falls back
// to a ranked list of plausible candidates for a human to pick from.

use std::cmp::Reverse;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::model::{Advertisement, CandidateDevice, ScanReport};

/// Matching policy knobs.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Short service id whose presence identifies the target outright.
    pub target_service: String,
    /// How long to observe before settling for candidates.
    pub window: Duration,
    /// When set, a repeat advertisement refreshes the stored signal
    /// strength; otherwise repeats are ignored outright.
    pub relaxed_duplicates: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            target_service: "fff0".to_owned(),
            window: Duration::from_secs(10),
            relaxed_duplicates: false,
        }
    }
}

/// How one advertisement was classified. Rules apply in this order and
/// the first that fires wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Advertises the target service id.
    DefiniteMatch,
    /// Known non-target (phones, laptops) or not connectable at all.
    Exclude,
    /// Unnamed, or named like a generic LED controller.
    Candidate,
}

/// Name fragments that mark common nearby non-targets.
const EXCLUDED_NAME_FRAGMENTS: &[&str] = &["ipad", "iphone", "mac"];

/// Name fragments typical of generic LED strip controllers.
const CANDIDATE_NAME_FRAGMENTS: &[&str] = &["elk", "led", "triones"];

/// Classify a single advertisement against the rule table.
#[must_use]
pub fn classify(adv: &Advertisement, target_service: &str) -> Classification {
    if adv
        .service_ids
        .iter()
        .any(|id| id.eq_ignore_ascii_case(target_service))
    {
        return Classification::DefiniteMatch;
    }

    let name = adv.display_name.as_deref().map(str::to_ascii_lowercase);

    if let Some(name) = &name {
        if EXCLUDED_NAME_FRAGMENTS.iter().any(|f| name.contains(f)) {
            return Classification::Exclude;
        }
    }
    if !adv.connectable {
        return Classification::Exclude;
    }

    match &name {
        None => Classification::Candidate,
        Some(name) if CANDIDATE_NAME_FRAGMENTS.iter().any(|f| name.contains(f)) => {
            Classification::Candidate
        }
        Some(_) => Classification::Exclude,
    }
}

/// What [`Matcher::observe`] decided about one advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The target has been found; observation can stop immediately.
    DefiniteMatch(String),
    /// Recorded (or refreshed) as a candidate.
    Recorded,
    /// Excluded, or a duplicate of a known candidate.
    Ignored,
}

/// Stateful accumulator over one observation window.
///
/// Candidates keep their insertion order, which is the tiebreaker when
/// two of them report equal signal strength.
pub struct Matcher {
    config: MatcherConfig,
    candidates: IndexMap<String, CandidateDevice>,
    snapshot: watch::Sender<Arc<Vec<CandidateDevice>>>,
}

impl Matcher {
    #[must_use]
    pub fn new(config: MatcherConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            config,
            candidates: IndexMap::new(),
            snapshot,
        }
    }

    /// Live view of the candidate set, refreshed after each recording.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<CandidateDevice>>> {
        self.snapshot.subscribe()
    }

    /// Feed one advertisement through the rule table.
    pub fn observe(&mut self, adv: &Advertisement) -> Observation {
        match classify(adv, &self.config.target_service) {
            Classification::DefiniteMatch => {
                info!(identifier = %adv.identifier, "target service advertised");
                Observation::DefiniteMatch(adv.identifier.clone())
            }
            Classification::Exclude => {
                trace!(identifier = %adv.identifier, name = ?adv.display_name, "excluded");
                Observation::Ignored
            }
            Classification::Candidate => self.record(adv),
        }
    }

    fn record(&mut self, adv: &Advertisement) -> Observation {
        if let Some(existing) = self.candidates.get_mut(&adv.identifier) {
            if !self.config.relaxed_duplicates {
                return Observation::Ignored;
            }
            existing.signal_strength = adv.signal_strength;
            self.publish_snapshot();
            return Observation::Ignored;
        }

        debug!(
            identifier = %adv.identifier,
            name = ?adv.display_name,
            rssi = adv.signal_strength,
            "candidate recorded"
        );
        self.candidates.insert(
            adv.identifier.clone(),
            CandidateDevice {
                identifier: adv.identifier.clone(),
                display_name: adv.display_name.clone(),
                signal_strength: adv.signal_strength,
            },
        );
        self.publish_snapshot();
        Observation::Recorded
    }

    fn publish_snapshot(&self) {
        let _ = self
            .snapshot
            .send(Arc::new(self.candidates.values().cloned().collect()));
    }

    /// Close the window: candidates ranked strongest-signal first, with
    /// insertion order breaking ties.
    #[must_use]
    pub fn finalize(self) -> Vec<CandidateDevice> {
        let mut ranked: Vec<CandidateDevice> = self.candidates.into_values().collect();
        ranked.sort_by_key(|c| Reverse(c.signal_strength));
        ranked
    }
}

/// Run one observation window over an advertisement stream.
///
/// Returns early on a definite match; otherwise drains the stream until
/// the window elapses (or the stream ends) and reports ranked candidates.
pub async fn run_scan<S>(mut matcher: Matcher, advertisements: S) -> ScanReport
where
    S: Stream<Item = Advertisement>,
{
    let window = tokio::time::sleep(matcher.config.window);
    let mut window = pin!(window);
    let mut advertisements = pin!(advertisements);

    loop {
        tokio::select! {
            () = &mut window => break,
            adv = advertisements.next() => match adv {
                Some(adv) => {
                    if let Observation::DefiniteMatch(identifier) = matcher.observe(&adv) {
                        return ScanReport::Definite { identifier };
                    }
                }
                None => break,
            },
        }
    }

    ScanReport::Candidates(matcher.finalize())
}
