use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{StateMap, StateMapExt, StateValue};

/// Wall-clock timer for a single puzzle playthrough. Pauses accumulate
/// into `paused_duration` so elapsed time is never double-counted across
/// save/restore cycles: snapshots always carry a paused timer and restore
/// resumes it. Persistence goes through the `to_state`/`from_state`
/// codec, never through serde.
#[derive(Clone, Debug)]
pub struct TimerState {
    pub paused_timestamp: Option<SystemTime>,
    pub paused_duration: Duration,
    pub started_timestamp: SystemTime,
    pub ended_timestamp: Option<SystemTime>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            paused_timestamp: None,
            paused_duration: Duration::from_secs(0),
            started_timestamp: SystemTime::now(),
            ended_timestamp: None,
        }
    }
}

impl TimerState {
    pub fn is_paused(&self) -> bool {
        self.paused_timestamp.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        let until_time = self
            .paused_timestamp
            .or(self.ended_timestamp)
            .unwrap_or(SystemTime::now());

        until_time
            .duration_since(self.started_timestamp)
            .unwrap_or(Duration::default())
            .saturating_sub(self.paused_duration)
    }

    pub fn paused(&self, now: SystemTime) -> TimerState {
        let mut new_state = self.clone();
        if new_state.paused_timestamp.is_none() {
            new_state.paused_timestamp = Some(now);
        }
        new_state
    }

    pub fn resumed(&self) -> TimerState {
        let mut new_state = self.clone();
        if let Some(pause_time) = new_state.paused_timestamp.take() {
            new_state.paused_duration = new_state
                .paused_duration
                .saturating_add(pause_time.elapsed().unwrap_or(Duration::default()));
        }
        new_state
    }

    pub fn ended(&self, now: SystemTime) -> TimerState {
        let mut new_state = self.clone();
        new_state.ended_timestamp = Some(now);
        new_state
    }

    /// Flattens into the generic snapshot container. Timestamps become
    /// unix seconds; a running timer is paused first so the receiver
    /// never sees in-flight time.
    pub fn to_state(&self) -> StateValue {
        let paused = self.paused(SystemTime::now());
        let mut map = StateMap::new();
        map.insert(
            "started".to_string(),
            StateValue::Int(unix_seconds(paused.started_timestamp)),
        );
        if let Some(ts) = paused.paused_timestamp {
            map.insert("paused_at".to_string(), StateValue::Int(unix_seconds(ts)));
        }
        map.insert(
            "paused_secs".to_string(),
            StateValue::Int(paused.paused_duration.as_secs() as i64),
        );
        StateValue::Map(map)
    }

    /// Reconstructs from the generic shape. Returns `None` when required
    /// keys are missing, which restore logic treats as "no saved timer".
    pub fn from_state(value: &StateValue) -> Option<TimerState> {
        let map = value.as_map()?;
        let started = map.int("started")?;
        let paused_at = map.int("paused_at");
        let paused_secs = map.int("paused_secs").unwrap_or(0);
        Some(TimerState {
            started_timestamp: UNIX_EPOCH + Duration::from_secs(started.max(0) as u64),
            paused_timestamp: paused_at
                .map(|ts| UNIX_EPOCH + Duration::from_secs(ts.max(0) as u64)),
            paused_duration: Duration::from_secs(paused_secs.max(0) as u64),
            ended_timestamp: None,
        })
    }
}

fn unix_seconds(ts: SystemTime) -> i64 {
    ts.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_with_pause() {
        let now = SystemTime::now();
        let timer = TimerState {
            started_timestamp: now,
            paused_timestamp: Some(now + Duration::from_secs(5)),
            paused_duration: Duration::from_secs(0),
            ended_timestamp: None,
        };

        assert_eq!(timer.elapsed(), Duration::from_secs(5));
    }

    #[test]
    fn test_elapsed_with_accumulated_pause() {
        let now = SystemTime::now();
        let timer = TimerState {
            started_timestamp: now,
            paused_timestamp: Some(now + Duration::from_secs(10)),
            paused_duration: Duration::from_secs(3),
            ended_timestamp: None,
        };

        assert_eq!(timer.elapsed(), Duration::from_secs(7));
    }

    #[test]
    fn test_pausing_twice_keeps_first_pause() {
        let now = SystemTime::now();
        let timer = TimerState {
            started_timestamp: now,
            paused_timestamp: None,
            paused_duration: Duration::from_secs(0),
            ended_timestamp: None,
        };
        let paused = timer.paused(now + Duration::from_secs(2));
        let paused_again = paused.paused(now + Duration::from_secs(9));
        assert_eq!(paused_again.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_state_round_trip_stays_paused() {
        let now = SystemTime::now();
        let timer = TimerState {
            started_timestamp: now - Duration::from_secs(30),
            paused_timestamp: Some(now),
            paused_duration: Duration::from_secs(4),
            ended_timestamp: None,
        };

        let restored = TimerState::from_state(&timer.to_state()).unwrap();
        assert!(restored.is_paused());
        // Second-granularity timestamps may round by up to a second.
        let diff = restored.elapsed().abs_diff(timer.elapsed());
        assert!(diff <= Duration::from_secs(1), "diff was {:?}", diff);
    }

    #[test]
    fn test_from_state_missing_keys() {
        assert!(TimerState::from_state(&StateValue::Map(StateMap::new())).is_none());
        assert!(TimerState::from_state(&StateValue::Int(0)).is_none());
    }
}
