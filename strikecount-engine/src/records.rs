use crate::traits::KeyValueStore;
use anyhow::Context;
use strikecount_core::leaderboard::LeaderboardEntry;
use strikecount_core::profile::{DEFAULT_DISPLAY_NAME, UserProfile};

pub const TOP_SCORE_KEY: &str = "topScore";
pub const PROFILE_KEY: &str = "userProfile";
pub const LEADERBOARD_YOU_KEY: &str = "leaderboard_you";

pub fn load_best_score(store: &dyn KeyValueStore) -> anyhow::Result<u32> {
    let Some(raw) = store.get(TOP_SCORE_KEY)? else {
        return Ok(0);
    };
    match raw.trim().parse::<u32>() {
        Ok(v) => Ok(v),
        Err(_) => {
            log::warn!("ignoring unreadable best score: {raw:?}");
            Ok(0)
        }
    }
}

/// Persists `score` if it strictly beats the stored best. Returns whether it did.
///
/// A new best also refreshes the current user's leaderboard entry.
pub fn record_score(store: &dyn KeyValueStore, score: u32) -> anyhow::Result<bool> {
    let best = load_best_score(store)?;
    if score <= best {
        return Ok(false);
    }

    store
        .set(TOP_SCORE_KEY, &score.to_string())
        .context("write best score")?;

    let mut entry = match load_stored_entry(store) {
        Some(e) => e,
        None => match load_profile(store)? {
            Some(p) => LeaderboardEntry::from_profile(&p, 0),
            None => LeaderboardEntry {
                name: DEFAULT_DISPLAY_NAME.into(),
                score: 0,
                instagram: None,
            },
        },
    };
    entry.score = score;
    save_entry(store, &entry)?;

    Ok(true)
}

pub fn load_profile(store: &dyn KeyValueStore) -> anyhow::Result<Option<UserProfile>> {
    let Some(raw) = store.get(PROFILE_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<UserProfile>(&raw) {
        Ok(p) => Ok(Some(p)),
        Err(e) => {
            log::warn!("could not parse user profile from store: {e}");
            Ok(None)
        }
    }
}

/// Saves the profile and carries its name/handle into the leaderboard entry,
/// keeping the entry's score.
pub fn save_profile(store: &dyn KeyValueStore, profile: &UserProfile) -> anyhow::Result<()> {
    let json = serde_json::to_string(profile).context("encode profile JSON")?;
    store.set(PROFILE_KEY, &json).context("write profile")?;

    let score = match load_stored_entry(store) {
        Some(e) => e.score,
        None => load_best_score(store)?,
    };
    save_entry(store, &LeaderboardEntry::from_profile(profile, score))
}

/// The current user's leaderboard entry.
///
/// Falls back to the profile with a zero score when no entry was ever written. An entry
/// that exists but cannot be parsed yields `None`.
pub fn load_leaderboard_entry(
    store: &dyn KeyValueStore,
) -> anyhow::Result<Option<LeaderboardEntry>> {
    if store.get(LEADERBOARD_YOU_KEY)?.is_some() {
        return Ok(load_stored_entry(store));
    }
    Ok(load_profile(store)?.map(|p| LeaderboardEntry::from_profile(&p, 0)))
}

fn load_stored_entry(store: &dyn KeyValueStore) -> Option<LeaderboardEntry> {
    let raw = match store.get(LEADERBOARD_YOU_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("could not read leaderboard entry: {e:#}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            log::warn!("could not parse leaderboard entry from store: {e}");
            None
        }
    }
}

fn save_entry(store: &dyn KeyValueStore, entry: &LeaderboardEntry) -> anyhow::Result<()> {
    let json = serde_json::to_string(entry).context("encode leaderboard JSON")?;
    store
        .set(LEADERBOARD_YOU_KEY, &json)
        .context("write leaderboard entry")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<String, String>>);

    impl KeyValueStore for MapStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.0.lock().unwrap().insert(key.into(), value.into());
            Ok(())
        }
    }

    #[test]
    fn best_score_requires_strict_improvement() {
        let store = MapStore::default();
        assert_eq!(load_best_score(&store).unwrap(), 0);
        assert!(!record_score(&store, 0).unwrap());
        assert!(record_score(&store, 7).unwrap());
        assert!(!record_score(&store, 7).unwrap());
        assert!(!record_score(&store, 3).unwrap());
        assert!(record_score(&store, 8).unwrap());
        assert_eq!(load_best_score(&store).unwrap(), 8);
    }

    #[test]
    fn garbage_best_score_reads_as_zero() {
        let store = MapStore::default();
        store.set(TOP_SCORE_KEY, "NaN").unwrap();
        assert_eq!(load_best_score(&store).unwrap(), 0);
    }

    #[test]
    fn new_best_updates_leaderboard_from_profile() {
        let store = MapStore::default();
        save_profile(&store, &UserProfile::new("Nong", Some("@nong")).unwrap()).unwrap();
        assert_eq!(load_leaderboard_entry(&store).unwrap().unwrap().score, 0);

        record_score(&store, 21).unwrap();
        let entry = load_leaderboard_entry(&store).unwrap().unwrap();
        assert_eq!(entry.name, "Nong");
        assert_eq!(entry.instagram.as_deref(), Some("nong"));
        assert_eq!(entry.score, 21);

        save_profile(&store, &UserProfile::new("Nong Rak", None).unwrap()).unwrap();
        let entry = load_leaderboard_entry(&store).unwrap().unwrap();
        assert_eq!(entry.name, "Nong Rak");
        assert_eq!(entry.score, 21);
    }

    #[test]
    fn profile_fallback_when_no_entry() {
        let store = MapStore::default();
        assert_eq!(load_leaderboard_entry(&store).unwrap(), None);
        store
            .set(PROFILE_KEY, r#"{"name":"Saen","instagram":null}"#)
            .unwrap();
        let entry = load_leaderboard_entry(&store).unwrap().unwrap();
        assert_eq!(entry.name, "Saen");
        assert_eq!(entry.score, 0);
    }

    #[test]
    fn corrupt_entry_is_dropped() {
        let store = MapStore::default();
        store.set(PROFILE_KEY, r#"{"name":"Saen"}"#).unwrap();
        store.set(LEADERBOARD_YOU_KEY, "{oops").unwrap();
        assert_eq!(load_leaderboard_entry(&store).unwrap(), None);
    }
}
