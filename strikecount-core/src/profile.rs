use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_DISPLAY_NAME: &str = "You";

fn handle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._]{1,30}$").expect("valid handle regex"))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("display name must not be empty")]
    EmptyName,
    #[error("invalid instagram handle: {0:?}")]
    InvalidHandle(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub instagram: Option<String>,
}

impl UserProfile {
    /// Normalizes and validates user input from the profile form.
    pub fn new(name: &str, instagram: Option<&str>) -> Result<Self, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }

        let instagram = match instagram.map(normalize_handle) {
            None => None,
            Some(h) if h.is_empty() => None,
            Some(h) if handle_re().is_match(&h) => Some(h),
            Some(h) => return Err(ProfileError::InvalidHandle(h)),
        };

        Ok(Self {
            name: name.to_string(),
            instagram,
        })
    }

    pub fn display_name(&self) -> &str {
        let n = self.name.trim();
        if n.is_empty() { DEFAULT_DISPLAY_NAME } else { n }
    }
}

fn normalize_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_at_sign_from_handle() {
        let p = UserProfile::new("  Nong ", Some("@nong.fighter")).unwrap();
        assert_eq!(p.name, "Nong");
        assert_eq!(p.instagram.as_deref(), Some("nong.fighter"));
    }

    #[test]
    fn blank_handle_is_none() {
        let p = UserProfile::new("Nong", Some("  ")).unwrap();
        assert_eq!(p.instagram, None);
    }

    #[test]
    fn rejects_empty_name_and_bad_handle() {
        assert_eq!(UserProfile::new("  ", None), Err(ProfileError::EmptyName));
        assert!(matches!(
            UserProfile::new("Nong", Some("not a handle")),
            Err(ProfileError::InvalidHandle(_))
        ));
    }

    #[test]
    fn display_name_falls_back() {
        let p = UserProfile {
            name: "".into(),
            instagram: None,
        };
        assert_eq!(p.display_name(), "You");
    }
}
