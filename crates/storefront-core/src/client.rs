//! Client classification from the `User-Agent` header.

use std::sync::OnceLock;

use regex::Regex;

/// Known crawler, link-preview and automation agent fragments.
const BOT_PATTERNS: &[&str] = &[
    r"bot\b",
    r"bot[/_;\s-]",
    r"crawl",
    r"spider",
    r"slurp",
    r"archiver",
    r"lighthouse",
    r"headless",
    r"phantomjs",
    r"prerender",
    r"facebookexternalhit",
    r"facebookcatalog",
    r"embedly",
    r"quora link preview",
    r"whatsapp",
    r"skypeuripreview",
    r"google-inspectiontool",
    r"google-read-aloud",
    r"mediapartners-google",
    r"feedfetcher",
    r"ia_archiver",
    r"pingdom",
    r"uptime",
    r"monitor",
    r"validator",
    r"scrapy",
    r"^curl/",
    r"^wget",
    r"^python-",
    r"^go-http-client",
    r"^okhttp",
    r"^java/",
    r"^axios/",
    r"^node-fetch",
    r"httpclient",
];

fn bot_regex() -> &'static Regex {
    static BOT_REGEX: OnceLock<Regex> = OnceLock::new();
    BOT_REGEX.get_or_init(|| {
        let pattern = format!("(?i)(?:{})", BOT_PATTERNS.join("|"));
        Regex::new(&pattern).expect("bot patterns are valid regexes")
    })
}

/// How a client is served: crawlers get the fully rendered page,
/// interactive browsers get the shell as early as possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientClassification {
    /// Search engine crawlers, link previews and automation.
    Bot,
    /// Interactive browsers.
    #[default]
    Standard,
}

impl ClientClassification {
    /// Classify a client by its `User-Agent`. A missing agent is `Standard`.
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(ua) if is_bot(ua) => Self::Bot,
            _ => Self::Standard,
        }
    }

    /// Check if this is a bot.
    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }

    /// Get the name of this classification.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Standard => "standard",
        }
    }
}

impl std::fmt::Display for ClientClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Check whether a `User-Agent` string belongs to a bot.
pub fn is_bot(user_agent: &str) -> bool {
    let ua = user_agent.trim();
    !ua.is_empty() && bot_regex().is_match(ua)
}
