//! Candidate scoring against a target business/domain.
//!
//! Additive independent signals; a candidate is a match at score >= 50.
//! The weights tolerate partial name matches ("Joe's Pizza" vs. "Joe's
//! Pizza & Grill") while rejecting coincidental word overlaps.

/// Minimum score for a candidate to count as a match.
pub const MATCH_THRESHOLD: u32 = 50;

/// Which scan strategy produced a candidate. Order matters: earlier
/// sources win ties across strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateSource {
    LocalPack,
    Organic,
    BroadScan,
    Image,
}

/// A scored search-result candidate. Ephemeral, produced and consumed
/// within one scan pass.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// Displayed text of the listing (title + visible snippet).
    pub text: String,
    /// Resolved destination link.
    pub link: String,
    /// Strategy that surfaced this candidate.
    pub source: CandidateSource,
    /// 1-based presentation position within the result page.
    pub position: u32,
}

/// The business/domain a journey is hunting for.
#[derive(Debug, Clone, Default)]
pub struct TargetSpec {
    /// Full business name, e.g. "Joe's Pizza".
    pub business: String,
    /// Bare domain, e.g. "joespizza.com".
    pub domain: String,
    /// Accept any host that starts with the target domain instead of
    /// requiring the domain to appear verbatim.
    pub wildcard: bool,
}

impl TargetSpec {
    pub fn new(business: &str, domain: &str) -> Self {
        Self {
            business: business.to_string(),
            domain: domain.to_string(),
            wildcard: false,
        }
    }

    pub fn with_wildcard(mut self, wildcard: bool) -> Self {
        self.wildcard = wildcard;
        self
    }
}

/// Extract the host from a link, stripping scheme and a leading `www.`.
pub fn host_of(link: &str) -> String {
    let host = match url::Url::parse(link) {
        Ok(u) => u.host_str().unwrap_or_default().to_string(),
        // Scheme-less hrefs ("joespizza.com/menu") still need a host.
        Err(_) => link
            .trim_start_matches("//")
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    host.trim_start_matches("www.").to_ascii_lowercase()
}

fn domain_matches(host: &str, domain: &str, wildcard: bool) -> bool {
    if domain.is_empty() {
        return false;
    }
    if wildcard {
        host.starts_with(domain)
    } else {
        host.contains(domain)
    }
}

/// Score a candidate's displayed text and link against the target.
///
/// Signals are independent and additive:
/// - +100 full business name in the text (case-folded)
/// - +90  target domain in the link host
/// - +80  target domain string in the text
/// - +70  word-overlap ratio >= 0.75, else +40 at >= 0.5
pub fn score(display_text: &str, link: &str, target: &TargetSpec) -> u32 {
    let text = display_text.to_lowercase();
    let business = target.business.to_lowercase();
    let domain = target.domain.to_lowercase();

    let mut total = 0u32;

    if !business.is_empty() && text.contains(&business) {
        total += 100;
    }

    if domain_matches(&host_of(link), &domain, target.wildcard) {
        total += 90;
    }

    if !domain.is_empty() && text.contains(&domain) {
        total += 80;
    }

    // Word-overlap ratio over target-name words longer than one character.
    let words: Vec<&str> = business
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .collect();
    if !words.is_empty() {
        let found = words.iter().filter(|w| text.contains(*w)).count();
        let ratio = found as f64 / words.len() as f64;
        if ratio >= 0.75 {
            total += 70;
        } else if ratio >= 0.5 {
            total += 40;
        }
    }

    total
}

/// Whether a score clears the match threshold.
pub fn is_match(score: u32) -> bool {
    score >= MATCH_THRESHOLD
}

/// Select the first candidate meeting the threshold, scanning sources in
/// fixed priority order (local pack, organic, broad scan, image) and in
/// presentation order within a source.
pub fn select_match<'a>(
    candidates: &'a [MatchCandidate],
    target: &TargetSpec,
) -> Option<&'a MatchCandidate> {
    const ORDER: [CandidateSource; 4] = [
        CandidateSource::LocalPack,
        CandidateSource::Organic,
        CandidateSource::BroadScan,
        CandidateSource::Image,
    ];

    for source in ORDER {
        if let Some(candidate) = candidates
            .iter()
            .filter(|c| c.source == source)
            .find(|c| is_match(score(&c.text, &c.link, target)))
        {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, link: &str, source: CandidateSource, position: u32) -> MatchCandidate {
        MatchCandidate {
            text: text.to_string(),
            link: link.to_string(),
            source,
            position,
        }
    }

    #[test]
    fn test_full_name_scores_at_least_100() {
        let target = TargetSpec::new("Joe's Pizza", "");
        assert!(score("Best Pizza - Joe's Pizza & Grill, Springfield", "https://other.example", &target) >= 100);
        assert!(score("JOE'S PIZZA official site", "https://x.example", &target) >= 100);
    }

    #[test]
    fn test_domain_host_match() {
        let target = TargetSpec::new("", "joespizza.com");
        assert_eq!(score("unrelated text", "https://www.joespizza.com/menu", &target), 90);
        assert_eq!(score("unrelated text", "https://elsewhere.net", &target), 0);
    }

    #[test]
    fn test_domain_in_text() {
        let target = TargetSpec::new("", "joespizza.com");
        assert_eq!(score("visit joespizza.com today", "https://redirect.example/x", &target), 80);
    }

    #[test]
    fn test_overlap_boundaries_inclusive() {
        // Four scoring words: exactly 3/4 = 0.75 must earn 70.
        let target = TargetSpec::new("alpha beta gamma delta", "");
        assert_eq!(score("alpha beta gamma elsewhere", "https://x.example", &target), 70);
        // Exactly 2/4 = 0.5 must earn 40.
        assert_eq!(score("alpha beta elsewhere", "https://x.example", &target), 40);
        // 1/4 < 0.5 earns nothing.
        assert_eq!(score("alpha only", "https://x.example", &target), 0);
    }

    #[test]
    fn test_short_words_ignored_in_overlap() {
        // "of" is length 2 and counts; single-char words do not.
        let target = TargetSpec::new("a house of pancakes", "");
        // 3 scoring words: house, of, pancakes. Two present = ratio 2/3.
        assert_eq!(score("house of waffles", "https://x.example", &target), 40);
    }

    #[test]
    fn test_threshold_boundary() {
        // 49 never matches, 50 always does.
        assert!(!is_match(49));
        assert!(is_match(50));
    }

    #[test]
    fn test_threshold_edges() {
        let target = TargetSpec::new("alpha beta gamma delta", "");
        // 40 < threshold: never selected.
        let below = candidate("alpha beta elsewhere", "https://x.example", CandidateSource::Organic, 1);
        assert!(select_match(&[below], &target).is_none());
        // 70 >= threshold: selected.
        let above = candidate("alpha beta gamma other", "https://x.example", CandidateSource::Organic, 1);
        assert!(select_match(&[above], &target).is_some());
    }

    #[test]
    fn test_signals_are_additive() {
        let target = TargetSpec::new("Joe's Pizza", "joespizza.com");
        let s = score(
            "Joe's Pizza - order at joespizza.com",
            "https://joespizza.com",
            &target,
        );
        // Full name (100) + host (90) + domain-in-text (80) + overlap 2/2 (70).
        assert_eq!(s, 340);
    }

    #[test]
    fn test_strategy_priority_order() {
        let target = TargetSpec::new("Joe's Pizza", "joespizza.com");
        let organic = candidate("Joe's Pizza reviews", "https://reviews.example", CandidateSource::Organic, 1);
        let local = candidate("Joe's Pizza - Springfield", "https://maps.example/joes", CandidateSource::LocalPack, 4);

        // Local pack wins even though the organic candidate appears first.
        let candidates = [organic, local];
        let chosen = select_match(&candidates, &target).unwrap();
        assert_eq!(chosen.source, CandidateSource::LocalPack);
    }

    #[test]
    fn test_presentation_order_within_strategy() {
        let target = TargetSpec::new("Joe's Pizza", "");
        let first = candidate("Joe's Pizza downtown", "https://a.example", CandidateSource::Organic, 2);
        let second = candidate("Joe's Pizza uptown", "https://b.example", CandidateSource::Organic, 5);

        let candidates = [first.clone(), second];
        let chosen = select_match(&candidates, &target).unwrap();
        assert_eq!(chosen.position, first.position);
    }

    #[test]
    fn test_joes_pizza_scenario() {
        let target = TargetSpec::new("Joe's Pizza", "joespizza.com");
        let c = candidate(
            "Best Pizza - Joe's Pizza & Grill, Springfield",
            "https://joespizzagrill.example",
            CandidateSource::Organic,
            3,
        );
        assert!(score(&c.text, &c.link, &target) >= 100);
        assert!(select_match(std::slice::from_ref(&c), &target).is_some());
    }

    #[test]
    fn test_wildcard_domain_match() {
        let target = TargetSpec::new("", "joespizza").with_wildcard(true);
        assert_eq!(score("unrelated", "https://joespizza-springfield.example", &target), 90);
        // Non-wildcard requires the domain inside the host.
        let strict = TargetSpec::new("", "joespizza.com");
        assert_eq!(score("unrelated", "https://joespizza-springfield.example", &strict), 0);
    }

    #[test]
    fn test_host_of_strips_scheme_and_www() {
        assert_eq!(host_of("https://www.Joespizza.com/menu?x=1"), "joespizza.com");
        assert_eq!(host_of("joespizza.com/menu"), "joespizza.com");
        assert_eq!(host_of("//cdn.example/img"), "cdn.example");
    }
}
