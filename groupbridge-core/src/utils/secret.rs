//! Bind credentials held with the secrecy crate, masked in Debug output.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

/// A secret string that shows only its last characters when printed.
///
/// # Example
/// ```
/// use groupbridge_core::utils::secret::MaskedSecret;
///
/// let password = MaskedSecret::new("proxy-agent-password".to_string());
/// assert_eq!(format!("{:?}", password), "\"*****-*****-****word\"");
/// assert_eq!(password.expose_secret(), "proxy-agent-password");
/// ```
#[derive(Clone)]
pub struct MaskedSecret(SecretString);

impl MaskedSecret {
    pub fn new(value: String) -> Self {
        Self(SecretString::new(value.into_boxed_str()))
    }

    /// Expose the secret value, only for handing it to the bind call.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

fn mask_value(value: &str) -> String {
    let value_len = value.chars().count();
    let visible_suffix_len = if value_len >= 12 { 4 } else { 2.min(value_len) };
    let prefix_len = value_len.saturating_sub(visible_suffix_len);

    value
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i < prefix_len && c != '-' {
                '*'
            } else {
                c
            }
        })
        .collect()
}

impl std::fmt::Debug for MaskedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", mask_value(self.0.expose_secret()))
    }
}

impl<'de> Deserialize<'de> for MaskedSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(MaskedSecret::new(value))
    }
}
