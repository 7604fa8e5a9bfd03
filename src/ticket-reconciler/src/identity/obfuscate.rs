//! Masking of legacy identities before they reach remote text fields.

/// Hides personal details in a legacy identity.
pub trait Obfuscator: Send + Sync {
    fn obfuscate(&self, identifier: &str) -> String;
}

/// Keeps the first character of an e-mail's local part and its domain.
///
/// `someone@example.com` becomes `s…@example.com`; identifiers without an
/// `@` are returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailObfuscator;

impl Obfuscator for EmailObfuscator {
    fn obfuscate(&self, identifier: &str) -> String {
        let identifier = identifier.trim();
        let Some((local, domain)) = identifier.rsplit_once('@') else {
            return identifier.to_string();
        };

        // Handles `Full Name <someone@example.com>`.
        let local = local.rsplit(['<', ' ']).next().unwrap_or(local);
        let domain = domain.trim_end_matches('>');

        match local.chars().next() {
            Some(first) => format!("{first}…@{domain}"),
            None => format!("…@{domain}"),
        }
    }
}
