//! Individual guardrail checks.
//!
//! Each check is a pure function over the outbound content. Blocking
//! findings and warnings are kept separate so the engine can compose a
//! verdict without re-interpreting messages.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::query::address_syntax_ok;

/// Spam score at or above this value blocks the send
pub const SPAM_BLOCK_THRESHOLD: u8 = 30;

const SPAM_PATTERNS: &[&str] = &[
    r"!!!+",
    r"\$\$\$+",
    r"(?i)FREE!!!",
    r"(?i)CLICK HERE NOW",
    r"(?i)ACT NOW",
    r"(?i)LIMITED TIME",
    r"(?i)100% FREE",
    r"(?i)EARN \$\$\$",
];

const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "viagra",
    "cialis",
    "casino",
    "lottery",
    "winner",
    "nigerian prince",
    "inheritance",
    "bank transfer",
    "password",
    "social security",
    "credit card",
];

const TYPO_DOMAINS: &[&str] = &[".con", ".cmo"];

const DISPOSABLE_DOMAINS: &[&str] = &["tempmail.com", "10minutemail.com", "guerrillamail.com"];

const SHORTENER_HOSTS: &[&str] = &["bit.ly", "tinyurl", "goo.gl"];

const PHISHING_PHRASES: &[&str] = &[
    "verify your account",
    "confirm your identity",
    "update your information",
    "suspended account",
    "unusual activity",
];

const GENERIC_GREETINGS: &[&str] = &["dear sir/madam", "to whom it may concern", "dear customer"];

fn spam_regexes() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        SPAM_PATTERNS
            .iter()
            .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid spam pattern {p}: {e}")))
            .collect()
    })
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"https?://[^\s)>\]]+").unwrap_or_else(|e| panic!("invalid link regex: {e}"))
    })
}

/// Result of one check
#[derive(Debug, Clone, Default)]
pub struct CheckOutcome {
    /// Findings that block the send
    pub blocking: Vec<String>,

    /// Findings surfaced but never blocking
    pub warnings: Vec<String>,
}

impl CheckOutcome {
    pub fn is_blocking(&self) -> bool {
        !self.blocking.is_empty()
    }
}

/// Recipient address syntax and common-typo detection. Blocking.
pub fn check_format(recipient: &str) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();

    if !address_syntax_ok(recipient) {
        outcome.blocking.push("invalid recipient address format".to_string());
    }

    for typo in TYPO_DOMAINS {
        if recipient.ends_with(typo) {
            outcome
                .blocking
                .push(format!("possible typo in recipient domain: {}", typo));
        }
    }

    if let Some(domain) = recipient.rsplit('@').next() {
        if DISPOSABLE_DOMAINS.contains(&domain) {
            outcome
                .blocking
                .push(format!("disposable recipient domain: {}", domain));
        }
    }

    outcome
}

/// Pattern-based phishing and payload detection. Blocking.
pub fn check_content_safety(body: &str) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    let lower = body.to_lowercase();

    let links: Vec<&str> = link_regex().find_iter(body).map(|m| m.as_str()).collect();
    if links.len() > 5 {
        outcome.blocking.push(format!("too many links: {}", links.len()));
    }

    for link in &links {
        let link_lower = link.to_lowercase();
        if SHORTENER_HOSTS.iter().any(|host| link_lower.contains(host)) {
            outcome
                .blocking
                .push(format!("shortened URL detected: {}", link));
        }
    }

    for phrase in PHISHING_PHRASES {
        if lower.contains(phrase) {
            outcome
                .blocking
                .push(format!("potential phishing phrase: {}", phrase));
        }
    }

    if lower.contains("<script") || lower.contains("javascript:") {
        outcome
            .blocking
            .push("potential script injection detected".to_string());
    }

    outcome
}

/// Weighted spam score over subject and body, clamped to [0, 100].
///
/// Every signal carries a positive weight, so the score is monotonic:
/// adding an instance of any signal never lowers it. Blocking at
/// [`SPAM_BLOCK_THRESHOLD`]; findings below the threshold are warnings.
pub fn check_spam(subject: &str, body: &str) -> (u8, CheckOutcome) {
    let mut score: u32 = 0;
    let mut issues = Vec::new();

    let content = format!("{} {}", subject, body);
    let lower = content.to_lowercase();

    for (pattern, re) in SPAM_PATTERNS.iter().zip(spam_regexes()) {
        if re.is_match(&content) {
            score += 10;
            issues.push(format!("spam pattern detected: {}", pattern));
        }
    }

    for keyword in SUSPICIOUS_KEYWORDS {
        if lower.contains(keyword) {
            score += 15;
            issues.push(format!("suspicious keyword: {}", keyword));
        }
    }

    // Counted, not a ratio: appended text can only add all-caps words,
    // never erase points already earned.
    let caps_words = content
        .split_whitespace()
        .filter(|word| {
            let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase())
        })
        .count();
    if caps_words > 0 {
        score += (5 * caps_words as u32).min(20);
        issues.push(format!("excessive caps: {} all-caps words", caps_words));
    }

    let exclaims = content.matches('!').count();
    if exclaims > 3 {
        score += 5 * (exclaims as u32 - 3);
        issues.push(format!("too many exclamation marks: {}", exclaims));
    }

    if subject.len() < 10 {
        score += 5;
        issues.push("subject too short".to_string());
    } else if subject.len() > 100 {
        score += 5;
        issues.push("subject too long".to_string());
    }

    let score = score.min(100) as u8;

    let mut outcome = CheckOutcome::default();
    if score >= SPAM_BLOCK_THRESHOLD {
        outcome
            .blocking
            .push(format!("spam score {} at or above threshold", score));
        outcome.warnings = issues;
    } else {
        outcome.warnings = issues;
    }

    (score, outcome)
}

/// Generic-greeting and unresolved-merge-field detection. Warnings only,
/// never blocking.
pub fn check_personalization(body: &str) -> CheckOutcome {
    let mut outcome = CheckOutcome::default();
    let lower = body.to_lowercase();

    for greeting in GENERIC_GREETINGS {
        if lower.contains(greeting) {
            outcome
                .warnings
                .push(format!("generic greeting detected: {}", greeting));
        }
    }

    if body.contains("{{") || body.contains("}}") || body.contains("[NAME]") {
        outcome
            .warnings
            .push("unreplaced merge fields detected".to_string());
    }

    outcome
}
