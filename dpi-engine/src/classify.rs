//! Application classification.
//!
//! Pure function of `(sni | http_host | server port)`: a present SNI wins,
//! then the HTTP Host, then the port heuristic. Once a flow is classified it
//! is never re-classified.

pub mod domains;

use std::fmt;

/// Closed set of application labels the engine reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppLabel {
    Http,
    Https,
    Dns,
    YouTube,
    Google,
    Facebook,
    Netflix,
    TikTok,
    Twitter,
    Instagram,
    WhatsApp,
    Telegram,
    Spotify,
    Amazon,
    Microsoft,
    Cloudflare,
    #[default]
    Unknown,
}

impl AppLabel {
    pub const ALL: [AppLabel; 17] = [
        AppLabel::Http,
        AppLabel::Https,
        AppLabel::Dns,
        AppLabel::YouTube,
        AppLabel::Google,
        AppLabel::Facebook,
        AppLabel::Netflix,
        AppLabel::TikTok,
        AppLabel::Twitter,
        AppLabel::Instagram,
        AppLabel::WhatsApp,
        AppLabel::Telegram,
        AppLabel::Spotify,
        AppLabel::Amazon,
        AppLabel::Microsoft,
        AppLabel::Cloudflare,
        AppLabel::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppLabel::Http => "Http",
            AppLabel::Https => "Https",
            AppLabel::Dns => "Dns",
            AppLabel::YouTube => "YouTube",
            AppLabel::Google => "Google",
            AppLabel::Facebook => "Facebook",
            AppLabel::Netflix => "Netflix",
            AppLabel::TikTok => "TikTok",
            AppLabel::Twitter => "Twitter",
            AppLabel::Instagram => "Instagram",
            AppLabel::WhatsApp => "WhatsApp",
            AppLabel::Telegram => "Telegram",
            AppLabel::Spotify => "Spotify",
            AppLabel::Amazon => "Amazon",
            AppLabel::Microsoft => "Microsoft",
            AppLabel::Cloudflare => "Cloudflare",
            AppLabel::Unknown => "Unknown",
        }
    }

    /// Resolves a CLI-supplied label name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str().eq_ignore_ascii_case(name))
    }

    /// Dense index for per-label counter arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AppLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess the application from a well-known server port.
fn from_port(port: u16) -> AppLabel {
    match port {
        443 => AppLabel::Https,
        80 => AppLabel::Http,
        53 => AppLabel::Dns,
        _ => AppLabel::Unknown,
    }
}

/// Classifies a flow from the names extracted so far and the server port.
/// Hostnames must already be lowercased (the extractors guarantee it).
pub fn classify(sni: Option<&str>, http_host: Option<&str>, server_port: u16) -> AppLabel {
    if let Some(name) = sni
        && let Some(app) = domains::lookup(name)
    {
        return app;
    }
    if let Some(name) = http_host
        && let Some(app) = domains::lookup(name)
    {
        return app;
    }
    from_port(server_port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sni_beats_port() {
        assert_eq!(
            classify(Some("www.youtube.com"), None, 443),
            AppLabel::YouTube
        );
        assert_eq!(
            classify(Some("edge-chat.facebook.com"), None, 80),
            AppLabel::Facebook
        );
    }

    #[test]
    fn host_when_no_sni() {
        assert_eq!(
            classify(None, Some("media.netflix.com"), 80),
            AppLabel::Netflix
        );
    }

    #[test]
    fn unlisted_name_falls_back_to_port() {
        assert_eq!(classify(Some("intranet.corp"), None, 443), AppLabel::Https);
        assert_eq!(classify(None, Some("intranet.corp"), 80), AppLabel::Http);
        assert_eq!(classify(None, None, 53), AppLabel::Dns);
        assert_eq!(classify(None, None, 8080), AppLabel::Unknown);
    }

    #[test]
    fn label_names_round_trip() {
        for label in AppLabel::ALL {
            assert_eq!(AppLabel::from_name(label.as_str()), Some(label));
        }
        assert_eq!(AppLabel::from_name("youtube"), Some(AppLabel::YouTube));
        assert_eq!(AppLabel::from_name("no-such-app"), None);
    }

    #[test]
    fn indices_are_dense() {
        for (i, label) in AppLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
        }
    }
}
