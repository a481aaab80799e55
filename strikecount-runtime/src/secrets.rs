use anyhow::Context;

/// Where we store secrets in the OS keyring.
///
/// Constant so upgrades don't orphan secrets.
const SERVICE: &str = "strikecount";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKey {
    VisionApiKey,
    CoachApiKey,
}

impl SecretKey {
    fn user(self) -> &'static str {
        match self {
            SecretKey::VisionApiKey => "vision_api_key",
            SecretKey::CoachApiKey => "coach_api_key",
        }
    }
}

pub fn set_secret(key: SecretKey, value: &str) -> anyhow::Result<()> {
    let entry = keyring::Entry::new(SERVICE, key.user()).context("create keyring entry")?;
    entry.set_password(value).context("set secret")
}

pub fn get_secret(key: SecretKey) -> anyhow::Result<Option<String>> {
    let entry = keyring::Entry::new(SERVICE, key.user()).context("create keyring entry")?;

    match entry.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(anyhow::Error::new(e)).context("get secret"),
    }
}

pub fn delete_secret(key: SecretKey) -> anyhow::Result<()> {
    let entry = keyring::Entry::new(SERVICE, key.user()).context("create keyring entry")?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)).context("delete secret"),
    }
}

/// Coach calls fall back to the vision key when no separate key was saved.
pub fn coach_api_key() -> anyhow::Result<Option<String>> {
    match get_secret(SecretKey::CoachApiKey)? {
        Some(k) => Ok(Some(k)),
        None => get_secret(SecretKey::VisionApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyring_user_names_are_stable() {
        // Don't touch the developer's real keyring; only the mapping is checked.
        assert_eq!(SecretKey::VisionApiKey.user(), "vision_api_key");
        assert_eq!(SecretKey::CoachApiKey.user(), "coach_api_key");
    }
}
