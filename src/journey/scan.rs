//! Result-page scan strategies.
//!
//! Each strategy is a pure function from a page snapshot to candidates.
//! The driver tries strategies in profile order; a failing strategy is
//! logged and the scan falls through to the next one.

use thiserror::Error;

use crate::engine::{ListingKind, PageSnapshot};
use crate::scoring::{CandidateSource, MatchCandidate};

/// A strategy-local extraction failure. Absorbed by the driver.
#[derive(Error, Debug)]
#[error("Scan failed: {0}")]
pub struct ScanError(pub String);

/// Pure extraction of candidates from a snapshot.
pub trait ScanStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn scan(&self, snapshot: &PageSnapshot) -> Result<Vec<MatchCandidate>, ScanError>;
}

fn collect(
    snapshot: &PageSnapshot,
    source: CandidateSource,
    filter: impl Fn(ListingKind) -> bool,
) -> Vec<MatchCandidate> {
    snapshot
        .listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| filter(listing.kind))
        .map(|(index, listing)| MatchCandidate {
            text: listing.text.clone(),
            link: listing.href.clone(),
            source,
            // 1-based presentation rank within the whole page.
            position: index as u32 + 1,
        })
        .collect()
}

/// Map/business-listing block entries.
pub struct LocalPackScan;

impl ScanStrategy for LocalPackScan {
    fn name(&self) -> &'static str {
        "local-pack"
    }

    fn scan(&self, snapshot: &PageSnapshot) -> Result<Vec<MatchCandidate>, ScanError> {
        Ok(collect(snapshot, CandidateSource::LocalPack, |k| k == ListingKind::LocalPack))
    }
}

/// Ranked organic results.
pub struct OrganicScan;

impl ScanStrategy for OrganicScan {
    fn name(&self) -> &'static str {
        "organic"
    }

    fn scan(&self, snapshot: &PageSnapshot) -> Result<Vec<MatchCandidate>, ScanError> {
        Ok(collect(snapshot, CandidateSource::Organic, |k| k == ListingKind::Organic))
    }
}

/// Unrestricted link scan over every anchor on the page.
pub struct BroadScan;

impl ScanStrategy for BroadScan {
    fn name(&self) -> &'static str {
        "broad-scan"
    }

    fn scan(&self, snapshot: &PageSnapshot) -> Result<Vec<MatchCandidate>, ScanError> {
        Ok(collect(snapshot, CandidateSource::BroadScan, |_| true))
    }
}

/// Image-search tiles.
pub struct ImageScan;

impl ScanStrategy for ImageScan {
    fn name(&self) -> &'static str {
        "image"
    }

    fn scan(&self, snapshot: &PageSnapshot) -> Result<Vec<MatchCandidate>, ScanError> {
        Ok(collect(snapshot, CandidateSource::Image, |k| k == ListingKind::Image))
    }
}
