use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    YouTube,
    Instagram,
    Reddit,
    GenericVideo,
    GallerySite,
    DrmLocked,
    Unknown,
}

/// Priority-ordered domain table. Earlier entries win, so domains that
/// could appear as substrings of others go first.
const DOMAIN_TABLE: &[(&str, Platform)] = &[
    ("youtube.com", Platform::YouTube),
    ("youtu.be", Platform::YouTube),
    ("instagram.com", Platform::Instagram),
    ("instagr.am", Platform::Instagram),
    ("reddit.com", Platform::Reddit),
    ("redd.it", Platform::Reddit),
    ("nhentai.net", Platform::GallerySite),
    ("luscious.net", Platform::GallerySite),
    ("imgur.com", Platform::GallerySite),
    ("netflix.com", Platform::DrmLocked),
    ("disneyplus.com", Platform::DrmLocked),
    ("primevideo.com", Platform::DrmLocked),
    ("spotify.com", Platform::DrmLocked),
    ("vimeo.com", Platform::GenericVideo),
    ("dailymotion.com", Platform::GenericVideo),
    ("twitch.tv", Platform::GenericVideo),
];

impl Platform {
    /// Maps a URL to its platform. Total: anything unmatched is `Unknown`.
    /// Matching is case-insensitive on the host portion; when the input is
    /// not a parseable URL the whole lowercased string is searched, which
    /// keeps scheme-less inputs like "youtu.be/abc" working.
    pub fn detect(url: &str) -> Platform {
        let haystack = match url::Url::parse(url.trim()) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => host.to_lowercase(),
                None => return Platform::Unknown,
            },
            Err(_) => url.trim().to_lowercase(),
        };

        for (domain, platform) in DOMAIN_TABLE {
            if haystack.contains(domain) {
                return *platform;
            }
        }
        Platform::Unknown
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::Reddit => "Reddit",
            Platform::GenericVideo => "Generic Video",
            Platform::GallerySite => "Gallery Site",
            Platform::DrmLocked => "DRM-locked",
            Platform::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Reddit => "reddit",
            Platform::GenericVideo => "generic_video",
            Platform::GallerySite => "gallery_site",
            Platform::DrmLocked => "drm_locked",
            Platform::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "youtube" => Ok(Platform::YouTube),
            "instagram" => Ok(Platform::Instagram),
            "reddit" => Ok(Platform::Reddit),
            "generic_video" => Ok(Platform::GenericVideo),
            "gallery_site" => Ok(Platform::GallerySite),
            "drm_locked" => Ok(Platform::DrmLocked),
            "unknown" => Ok(Platform::Unknown),
            other => Err(format!("plataforma desconhecida: {}", other)),
        }
    }
}
