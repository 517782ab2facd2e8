//! # Asset Classifier
//!
//! Mappa un `AssetPath` alla sua categoria e al relativo `OptimizationProfile`.
//! Funzione pura, nessun I/O: le regole sono valutate in ordine e vince la
//! prima che corrisponde, con fallback sulla categoria `default`.
//!
//! | Categoria              | maxDimension | quality | formato | minSize |
//! |------------------------|--------------|---------|---------|---------|
//! | comic (obbligatoria)   | 960          | 68      | webp    | 40 KiB  |
//! | full-bleed-background  | 1080         | 72      | webp    | 50 KiB  |
//! | social-avatar          | 280          | 74      | webp    | 25 KiB  |
//! | logo                   | 320          | 82      | webp    | 20 KiB  |
//! | default                | 1080         | 72      | webp    | 50 KiB  |

use crate::asset::AssetPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification bucket driving optimization parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetCategory {
    Comic,
    FullBleedBackground,
    SocialAvatar,
    Logo,
    Default,
}

/// Target format of the transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Original,
    Jpeg,
    Webp,
}

/// Resize/quality/format parameters of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationProfile {
    pub max_dimension: u32,
    pub quality: u8,
    pub output_format: OutputFormat,
    pub min_size_bytes: u64,
}

/// Ordered rule list: first match wins
const RULES: &[(AssetCategory, &[&str])] = &[
    (AssetCategory::Comic, &["comic/", "comics/"]),
    (
        AssetCategory::FullBleedBackground,
        &["backgrounds/", "background/", "full-bleed/", "fullbleed/"],
    ),
    (AssetCategory::SocialAvatar, &["avatars/", "avatar/"]),
    (AssetCategory::Logo, &["logos/", "logo/"]),
];

impl AssetCategory {
    /// Classify a path; total and deterministic
    pub fn classify(path: &AssetPath) -> Self {
        let text = path.as_str().to_lowercase();
        RULES
            .iter()
            .find(|(_, markers)| markers.iter().any(|marker| text.contains(marker)))
            .map(|(category, _)| *category)
            .unwrap_or(AssetCategory::Default)
    }

    /// Categories where a failed WebP conversion aborts the run
    pub fn is_mandatory(&self) -> bool {
        matches!(self, AssetCategory::Comic)
    }

    pub fn profile(&self) -> OptimizationProfile {
        let (max_dimension, quality, min_kib) = match self {
            // Phone-first, compressed hard
            AssetCategory::Comic => (960, 68, 40),
            AssetCategory::FullBleedBackground => (1080, 72, 50),
            AssetCategory::SocialAvatar => (280, 74, 25),
            AssetCategory::Logo => (320, 82, 20),
            AssetCategory::Default => (1080, 72, 50),
        };
        OptimizationProfile {
            max_dimension,
            quality,
            output_format: OutputFormat::Webp,
            min_size_bytes: min_kib * 1024,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Comic => "comic",
            AssetCategory::FullBleedBackground => "full-bleed-background",
            AssetCategory::SocialAvatar => "social-avatar",
            AssetCategory::Logo => "logo",
            AssetCategory::Default => "default",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shorthand for `AssetCategory::classify(path).profile()`
pub fn profile_for(path: &AssetPath) -> OptimizationProfile {
    AssetCategory::classify(path).profile()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(path: &str) -> AssetCategory {
        AssetCategory::classify(&AssetPath::new(path))
    }

    #[test]
    fn test_category_rules() {
        assert_eq!(classify("images/comic/page1.png"), AssetCategory::Comic);
        assert_eq!(classify("images/comics/ep2/p3.jpg"), AssetCategory::Comic);
        assert_eq!(classify("images/backgrounds/sky.jpg"), AssetCategory::FullBleedBackground);
        assert_eq!(classify("images/avatars/ada.png"), AssetCategory::SocialAvatar);
        assert_eq!(classify("images/logos/icon.png"), AssetCategory::Logo);
        assert_eq!(classify("audio/intro.mp3"), AssetCategory::Default);
    }

    #[test]
    fn test_first_match_wins() {
        // Comic rule is evaluated before the logo rule
        assert_eq!(classify("images/logos/comic/cover.png"), AssetCategory::Comic);
        assert_eq!(classify("images/avatars/logo/x.png"), AssetCategory::SocialAvatar);
    }

    #[test]
    fn test_unmatched_paths_get_default_profile() {
        for path in ["images/misc/a.png", "b.jpg", "images/comicbook.png", ""] {
            let first = profile_for(&AssetPath::new(path));
            let second = profile_for(&AssetPath::new(path));
            assert_eq!(first, AssetCategory::Default.profile());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_profiles() {
        let comic = AssetCategory::Comic.profile();
        assert_eq!(comic.max_dimension, 960);
        assert_eq!(comic.quality, 68);
        assert_eq!(comic.output_format, OutputFormat::Webp);
        assert_eq!(comic.min_size_bytes, 40 * 1024);

        let avatar = AssetCategory::SocialAvatar.profile();
        assert_eq!((avatar.max_dimension, avatar.quality), (280, 74));
        assert_eq!(avatar.min_size_bytes, 25 * 1024);

        let logo = AssetCategory::Logo.profile();
        assert_eq!((logo.max_dimension, logo.quality), (320, 82));
        assert_eq!(logo.min_size_bytes, 20 * 1024);

        assert_eq!(
            AssetCategory::FullBleedBackground.profile(),
            AssetCategory::Default.profile()
        );
    }

    #[test]
    fn test_only_comic_is_mandatory() {
        assert!(AssetCategory::Comic.is_mandatory());
        assert!(!AssetCategory::Logo.is_mandatory());
        assert!(!AssetCategory::Default.is_mandatory());
    }
}
