//! Input validation for targets before any external tool is invoked.
//!
//! Rejecting malformed targets up front keeps shell-metacharacter tricks
//! out of subprocess argument lists and lets the retry policy classify the
//! failure as permanent (invalid input is never worth a retry).

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::core::Target;
use crate::{Error, Result};

const MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Characters that would need shell-escaping; we refuse them outright
/// since no legitimate target contains them.
const DANGEROUS_CHARS: &[char] = &[';', '|', '&', '<', '>', '$', '"', '`', '\\', '\''];

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap())
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .unwrap()
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").unwrap())
}

fn has_dangerous_chars(s: &str) -> bool {
    s.chars().any(|c| DANGEROUS_CHARS.contains(&c))
}

/// Validate a target before it is planned into any job.
pub fn validate_target(target: &Target) -> Result<()> {
    match target {
        Target::Username(u) => validate_username(u),
        Target::Email(e) => validate_email(e),
        Target::Phone(p) => validate_phone(p),
        Target::File(p) => validate_file(p),
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.len() < 2 || username.len() > 64 {
        return Err(Error::InvalidTarget(
            "username must be 2-64 characters".to_string(),
        ));
    }
    if !username_regex().is_match(username) {
        return Err(Error::InvalidTarget(
            "username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > 254 {
        return Err(Error::InvalidTarget(
            "email address too long (max 254 characters)".to_string(),
        ));
    }
    if has_dangerous_chars(email) {
        return Err(Error::InvalidTarget(
            "email contains forbidden characters".to_string(),
        ));
    }
    if !email_regex().is_match(email) {
        return Err(Error::InvalidTarget("invalid email format".to_string()));
    }
    // Domain needs at least one dot and a 2+ character TLD
    let domain = email.rsplit('@').next().unwrap_or("");
    let tld = domain.rsplit('.').next().unwrap_or("");
    if !domain.contains('.') || tld.len() < 2 {
        return Err(Error::InvalidTarget(
            "email domain must have a dot and a 2+ character TLD".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<()> {
    if has_dangerous_chars(phone) {
        return Err(Error::InvalidTarget(
            "phone number contains forbidden characters".to_string(),
        ));
    }
    // Strip common formatting before checking digits
    let cleaned: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')' | '-'))
        .collect();
    if !phone_regex().is_match(&cleaned) {
        return Err(Error::InvalidTarget(
            "phone number must be 7-15 digits with an optional leading '+'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::InvalidTarget(format!(
            "file does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(Error::InvalidTarget(format!(
            "not a regular file: {}",
            path.display()
        )));
    }
    let size = path.metadata()?.len();
    if size > MAX_FILE_SIZE_BYTES {
        return Err(Error::InvalidTarget(format!(
            "file larger than {} MB: {}",
            MAX_FILE_SIZE_BYTES / (1024 * 1024),
            path.display()
        )));
    }
    Ok(())
}
