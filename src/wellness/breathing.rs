use std::time::{Duration, Instant};

use crate::config::BreathingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathPhase {
    Idle,
    Inhale,
    Exhale,
}

impl BreathPhase {
    pub fn label(self) -> &'static str {
        match self {
            BreathPhase::Idle => "Press s to start",
            BreathPhase::Inhale => "Breathe in",
            BreathPhase::Exhale => "Breathe out",
        }
    }

    /// Relative size of the breathing circle.
    pub fn scale(self) -> f32 {
        match self {
            BreathPhase::Inhale => 1.4,
            BreathPhase::Idle | BreathPhase::Exhale => 1.0,
        }
    }
}

/// Paces a repeating inhale/exhale cycle. The phase is derived from elapsed
/// time so the caller only needs to redraw on each tick.
#[derive(Debug, Clone)]
pub struct BreathingGuide {
    inhale: Duration,
    cycle: Duration,
    started_at: Option<Instant>,
}

impl BreathingGuide {
    pub fn new(config: &BreathingConfig) -> Self {
        Self {
            inhale: config.inhale(),
            cycle: config.cycle(),
            started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Returns false when a session was already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn phase_at(&self, now: Instant) -> BreathPhase {
        let Some(started) = self.started_at else {
            return BreathPhase::Idle;
        };
        let cycle_ms = self.cycle.as_millis().max(1);
        let into_cycle = now.saturating_duration_since(started).as_millis() % cycle_ms;
        if into_cycle < self.inhale.as_millis() {
            BreathPhase::Inhale
        } else {
            BreathPhase::Exhale
        }
    }

    /// Completed cycles since the session started.
    pub fn cycles_at(&self, now: Instant) -> u64 {
        let Some(started) = self.started_at else {
            return 0;
        };
        let cycle_ms = self.cycle.as_millis().max(1);
        (now.saturating_duration_since(started).as_millis() / cycle_ms) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guide() -> BreathingGuide {
        BreathingGuide::new(&BreathingConfig::default())
    }

    #[test]
    fn idle_until_started() {
        let guide = guide();
        assert_eq!(guide.phase_at(Instant::now()), BreathPhase::Idle);
        assert_eq!(guide.cycles_at(Instant::now()), 0);
    }

    #[test]
    fn alternates_inhale_and_exhale() {
        let mut guide = guide();
        let t0 = Instant::now();
        assert!(guide.start(t0));
        assert_eq!(guide.phase_at(t0), BreathPhase::Inhale);
        assert_eq!(guide.phase_at(t0 + Duration::from_millis(3_999)), BreathPhase::Inhale);
        assert_eq!(guide.phase_at(t0 + Duration::from_secs(4)), BreathPhase::Exhale);
        assert_eq!(guide.phase_at(t0 + Duration::from_secs(9)), BreathPhase::Inhale);
        assert_eq!(guide.cycles_at(t0 + Duration::from_secs(17)), 2);
    }

    #[test]
    fn start_is_ignored_while_running_and_stop_resets() {
        let mut guide = guide();
        let t0 = Instant::now();
        guide.start(t0);
        assert!(!guide.start(t0 + Duration::from_secs(4)));
        assert_eq!(guide.phase_at(t0 + Duration::from_secs(5)), BreathPhase::Exhale);

        guide.stop();
        assert!(!guide.is_running());
        assert_eq!(guide.phase_at(t0 + Duration::from_secs(5)), BreathPhase::Idle);
        assert_eq!(BreathPhase::Idle.scale(), 1.0);
    }
}
