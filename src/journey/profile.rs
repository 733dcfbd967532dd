//! Journey variants.
//!
//! The source scripts were near-duplicates per search surface; here they
//! collapse into one driver parameterized by a strategy list and a couple
//! of flags.

use serde::{Deserialize, Serialize};

use super::scan::{BroadScan, ImageScan, LocalPackScan, OrganicScan, ScanStrategy};

/// Which result-page surface a journey works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum JourneyVariant {
    /// Organic listings only.
    #[default]
    Organic,
    /// Local pack first, then organic.
    LocalMixed,
    /// Image-search tiles.
    Image,
    /// Business profile panel in the local pack, no pagination.
    LocalProfile,
    /// Organic result, then follow a chain of internal links.
    Tiered,
}

/// A parameterized journey: scan strategies in priority order plus
/// variant-specific behavior flags.
pub struct JourneyProfile {
    pub variant: JourneyVariant,
    /// Result pages to scan before giving up.
    pub max_pages: u32,
    /// After the dwell, click through one internal link and dwell again.
    pub follow_internal_links: bool,
    strategies: Vec<Box<dyn ScanStrategy>>,
}

impl JourneyProfile {
    pub fn for_variant(variant: JourneyVariant) -> Self {
        match variant {
            JourneyVariant::Organic => Self {
                variant,
                max_pages: 2,
                follow_internal_links: false,
                strategies: vec![Box::new(OrganicScan), Box::new(BroadScan)],
            },
            JourneyVariant::LocalMixed => Self {
                variant,
                max_pages: 2,
                follow_internal_links: false,
                strategies: vec![
                    Box::new(LocalPackScan),
                    Box::new(OrganicScan),
                    Box::new(BroadScan),
                ],
            },
            JourneyVariant::Image => Self {
                variant,
                max_pages: 1,
                follow_internal_links: false,
                strategies: vec![Box::new(ImageScan)],
            },
            JourneyVariant::LocalProfile => Self {
                variant,
                max_pages: 1,
                follow_internal_links: false,
                strategies: vec![Box::new(LocalPackScan)],
            },
            JourneyVariant::Tiered => Self {
                variant,
                max_pages: 2,
                follow_internal_links: true,
                strategies: vec![Box::new(OrganicScan), Box::new(BroadScan)],
            },
        }
    }

    pub fn strategies(&self) -> &[Box<dyn ScanStrategy>] {
        &self.strategies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_strategy_order() {
        let mixed = JourneyProfile::for_variant(JourneyVariant::LocalMixed);
        let names: Vec<&str> = mixed.strategies().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["local-pack", "organic", "broad-scan"]);

        let tiered = JourneyProfile::for_variant(JourneyVariant::Tiered);
        assert!(tiered.follow_internal_links);

        let image = JourneyProfile::for_variant(JourneyVariant::Image);
        assert_eq!(image.max_pages, 1);
    }
}
