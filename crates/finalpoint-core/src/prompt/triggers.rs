//! Ambient app conditions that make a notification prompt worthwhile.

use serde::{Deserialize, Serialize};

/// A race this close (in days) or closer counts as upcoming.
pub const UPCOMING_RACE_WINDOW_DAYS: i64 = 3;

/// Route prefix of the picks pages.
const PICKS_ROUTE: &str = "/picks";

/// Route prefix of individual league pages.
const LEAGUE_ROUTE: &str = "/leagues/";

/// Transient trigger flags for the current navigation context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    pub has_joined_league: bool,
    pub is_viewing_league: bool,
    pub is_on_picks_page: bool,
    pub has_upcoming_race: bool,
    pub days_until_race: Option<i64>,
    pub has_recent_score_update: bool,
}

/// Partial update; `None` fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerUpdate {
    pub has_joined_league: Option<bool>,
    pub is_viewing_league: Option<bool>,
    pub is_on_picks_page: Option<bool>,
    pub has_upcoming_race: Option<bool>,
    pub days_until_race: Option<i64>,
    pub has_recent_score_update: Option<bool>,
}

impl TriggerState {
    /// Triggers implied by landing on `path`. Everything else starts unset.
    pub fn for_route(path: &str) -> Self {
        Self {
            is_on_picks_page: path == PICKS_ROUTE || path.starts_with("/picks/"),
            is_viewing_league: path.starts_with(LEAGUE_ROUTE) && path.len() > LEAGUE_ROUTE.len(),
            ..Self::default()
        }
    }

    pub fn apply(&mut self, update: TriggerUpdate) {
        if let Some(v) = update.has_joined_league {
            self.has_joined_league = v;
        }
        if let Some(v) = update.is_viewing_league {
            self.is_viewing_league = v;
        }
        if let Some(v) = update.is_on_picks_page {
            self.is_on_picks_page = v;
        }
        if let Some(v) = update.has_upcoming_race {
            self.has_upcoming_race = v;
        }
        if let Some(v) = update.days_until_race {
            self.days_until_race = Some(v);
        }
        if let Some(v) = update.has_recent_score_update {
            self.has_recent_score_update = v;
        }
    }

    /// An upcoming race only counts once it is inside the window. Without a
    /// known distance it does not count at all.
    pub fn race_is_imminent(&self) -> bool {
        self.has_upcoming_race
            && self
                .days_until_race
                .is_some_and(|days| days <= UPCOMING_RACE_WINDOW_DAYS)
    }

    /// Highest-priority active trigger.
    pub fn strongest(&self) -> Option<PromptReason> {
        if self.race_is_imminent() {
            return Some(PromptReason::UpcomingRace {
                days: self.days_until_race.unwrap_or_default(),
            });
        }
        if self.has_recent_score_update {
            return Some(PromptReason::ScoreUpdate);
        }
        if self.is_on_picks_page {
            return Some(PromptReason::PicksPage);
        }
        if self.has_joined_league {
            return Some(PromptReason::JoinedLeague);
        }
        if self.is_viewing_league {
            return Some(PromptReason::ViewingLeague);
        }
        None
    }

    pub fn any_active(&self) -> bool {
        self.strongest().is_some()
    }
}

/// Why the prompt is being offered, with the copy shown for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReason {
    UpcomingRace { days: i64 },
    ScoreUpdate,
    PicksPage,
    JoinedLeague,
    ViewingLeague,
}

impl PromptReason {
    pub fn title(&self) -> &'static str {
        match self {
            PromptReason::UpcomingRace { .. } => "Race weekend is coming",
            PromptReason::ScoreUpdate => "Scores just landed",
            PromptReason::PicksPage => "Never miss a picks deadline",
            PromptReason::JoinedLeague => "Stay in the race",
            PromptReason::ViewingLeague => "Follow your league",
        }
    }

    pub fn message(&self) -> String {
        match self {
            PromptReason::UpcomingRace { days } if *days <= 0 => {
                "The race is today. Turn on notifications to get a reminder before picks lock."
                    .to_string()
            }
            PromptReason::UpcomingRace { days: 1 } => {
                "The next race is tomorrow. Turn on notifications to get a reminder before picks lock."
                    .to_string()
            }
            PromptReason::UpcomingRace { days } => format!(
                "The next race is in {} days. Turn on notifications to get a reminder before picks lock.",
                days
            ),
            PromptReason::ScoreUpdate => {
                "Get notified as soon as race results and standings are updated.".to_string()
            }
            PromptReason::PicksPage => {
                "We can remind you before picks lock for each race.".to_string()
            }
            PromptReason::JoinedLeague => {
                "Get updates when your league's standings change.".to_string()
            }
            PromptReason::ViewingLeague => {
                "Get notified about results and activity in this league.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upcoming_race_needs_window() {
        let mut state = TriggerState {
            has_upcoming_race: true,
            days_until_race: Some(4),
            ..Default::default()
        };
        assert!(!state.any_active());

        state.days_until_race = Some(3);
        assert!(state.any_active());

        state.days_until_race = None;
        assert!(!state.any_active());
    }

    #[test]
    fn test_priority_order() {
        let state = TriggerState {
            has_joined_league: true,
            is_viewing_league: true,
            is_on_picks_page: true,
            has_recent_score_update: true,
            has_upcoming_race: true,
            days_until_race: Some(2),
        };
        assert_eq!(state.strongest(), Some(PromptReason::UpcomingRace { days: 2 }));

        let state = TriggerState {
            has_joined_league: true,
            is_viewing_league: true,
            ..Default::default()
        };
        assert_eq!(state.strongest(), Some(PromptReason::JoinedLeague));
    }

    #[test]
    fn test_for_route() {
        assert!(TriggerState::for_route("/picks").is_on_picks_page);
        assert!(TriggerState::for_route("/picks/12").is_on_picks_page);
        assert!(!TriggerState::for_route("/picksheet").is_on_picks_page);
        assert!(TriggerState::for_route("/leagues/4").is_viewing_league);
        assert!(!TriggerState::for_route("/leagues/").is_viewing_league);
        assert_eq!(TriggerState::for_route("/dashboard"), TriggerState::default());
    }

    #[test]
    fn test_apply_partial_update() {
        let mut state = TriggerState::for_route("/picks");
        state.apply(TriggerUpdate {
            has_upcoming_race: Some(true),
            days_until_race: Some(1),
            ..Default::default()
        });
        assert!(state.is_on_picks_page);
        assert!(state.race_is_imminent());
        assert!(PromptReason::UpcomingRace { days: 1 }.message().contains("tomorrow"));
    }
}
