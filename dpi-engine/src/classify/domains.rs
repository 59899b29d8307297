//! Static domain-suffix dictionary.
//!
//! Matching is longest-suffix: the candidate name is tried whole, then with
//! leading labels stripped one at a time, so `upload.video.youtube.com`
//! resolves through `youtube.com` while a registered longer suffix would win
//! over a shorter one.

use crate::classify::AppLabel;

/// Registered domain suffixes. Entries are matched at label boundaries.
const DOMAIN_APPS: &[(&str, AppLabel)] = &[
    ("youtube.com", AppLabel::YouTube),
    ("youtu.be", AppLabel::YouTube),
    ("googlevideo.com", AppLabel::YouTube),
    ("ytimg.com", AppLabel::YouTube),
    ("google.com", AppLabel::Google),
    ("gstatic.com", AppLabel::Google),
    ("googleapis.com", AppLabel::Google),
    ("googleusercontent.com", AppLabel::Google),
    ("facebook.com", AppLabel::Facebook),
    ("fbcdn.net", AppLabel::Facebook),
    ("fb.com", AppLabel::Facebook),
    ("messenger.com", AppLabel::Facebook),
    ("netflix.com", AppLabel::Netflix),
    ("nflxvideo.net", AppLabel::Netflix),
    ("nflxso.net", AppLabel::Netflix),
    ("nflximg.net", AppLabel::Netflix),
    ("tiktok.com", AppLabel::TikTok),
    ("tiktokcdn.com", AppLabel::TikTok),
    ("tiktokv.com", AppLabel::TikTok),
    ("byteoversea.com", AppLabel::TikTok),
    ("twitter.com", AppLabel::Twitter),
    ("twimg.com", AppLabel::Twitter),
    ("x.com", AppLabel::Twitter),
    ("t.co", AppLabel::Twitter),
    ("instagram.com", AppLabel::Instagram),
    ("cdninstagram.com", AppLabel::Instagram),
    ("whatsapp.com", AppLabel::WhatsApp),
    ("whatsapp.net", AppLabel::WhatsApp),
    ("telegram.org", AppLabel::Telegram),
    ("telegram.me", AppLabel::Telegram),
    ("t.me", AppLabel::Telegram),
    ("spotify.com", AppLabel::Spotify),
    ("scdn.co", AppLabel::Spotify),
    ("spotifycdn.com", AppLabel::Spotify),
    ("amazon.com", AppLabel::Amazon),
    ("amazonaws.com", AppLabel::Amazon),
    ("media-amazon.com", AppLabel::Amazon),
    ("primevideo.com", AppLabel::Amazon),
    ("microsoft.com", AppLabel::Microsoft),
    ("windows.net", AppLabel::Microsoft),
    ("live.com", AppLabel::Microsoft),
    ("office.com", AppLabel::Microsoft),
    ("msn.com", AppLabel::Microsoft),
    ("azureedge.net", AppLabel::Microsoft),
    ("cloudflare.com", AppLabel::Cloudflare),
    ("cloudflare-dns.com", AppLabel::Cloudflare),
    ("cloudflareinsights.com", AppLabel::Cloudflare),
];

/// True when `name` equals `suffix` or ends with `.suffix` (label boundary).
/// Both sides are expected lowercased.
pub fn matches_suffix(name: &str, suffix: &str) -> bool {
    name == suffix
        || (name.len() > suffix.len()
            && name.ends_with(suffix)
            && name.as_bytes()[name.len() - suffix.len() - 1] == b'.')
}

/// Longest-suffix lookup of a lowercased hostname.
pub fn lookup(name: &str) -> Option<AppLabel> {
    // Try the whole name, then strip one leading label at a time; the first
    // hit is therefore the longest registered suffix.
    let mut candidate = name;
    loop {
        if let Some(&(_, app)) = DOMAIN_APPS.iter().find(|(s, _)| *s == candidate) {
            return Some(app);
        }
        match candidate.split_once('.') {
            Some((_, rest)) if !rest.is_empty() => candidate = rest,
            _ => return None,
        }
    }
}
