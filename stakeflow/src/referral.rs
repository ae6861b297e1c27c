//! Referral links: `?ref=<address>` in, `?ref=<account>` out.
//!
//! A missing or malformed referrer is never an error; it resolves to the zero
//! address, which the sale contract treats as "no referrer". So does a
//! referrer equal to the purchasing account.

use alloy_primitives::Address;
use url::Url;

use crate::error::Result;
use crate::utils::{checksum, parse_address};

/// Query parameter carrying the referrer.
pub const REFERRAL_PARAM: &str = "ref";

/// A referrer as read from a link, before the purchasing account is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralCandidate {
    /// Raw parameter value, if the link had one.
    pub raw: Option<String>,
    /// Parsed referrer, or zero if absent/malformed.
    pub resolved: Address,
}

impl ReferralCandidate {
    pub fn none() -> Self {
        Self {
            raw: None,
            resolved: Address::ZERO,
        }
    }

    pub fn from_link(link: &str) -> Self {
        let raw = ref_param(link);
        let resolved = raw
            .as_deref()
            .and_then(parse_address)
            .unwrap_or(Address::ZERO);
        Self { raw, resolved }
    }

    pub fn is_present(&self) -> bool {
        !self.resolved.is_zero()
    }

    /// Referrer to use for a purchase by `account`.
    pub fn for_account(&self, account: Address) -> Address {
        exclude_self(self.resolved, Some(account))
    }
}

fn parse_link(link: &str) -> Option<Url> {
    Url::parse(link).ok().or_else(|| {
        // Relative forms such as "?ref=0x..." or "/buy?ref=0x...".
        Url::parse("http://localhost/").ok()?.join(link).ok()
    })
}

fn ref_param(link: &str) -> Option<String> {
    let url = parse_link(link)?;
    let value = url
        .query_pairs()
        .find(|(k, _)| k == REFERRAL_PARAM)
        .map(|(_, v)| v.into_owned());
    value
}

/// Referrer address carried by `link`, or zero.
pub fn from_link(link: &str) -> Address {
    ReferralCandidate::from_link(link).resolved
}

fn exclude_self(referrer: Address, connecting: Option<Address>) -> Address {
    match connecting {
        Some(account) if account == referrer => Address::ZERO,
        _ => referrer,
    }
}

/// Canonicalize `raw`; zero if invalid or equal to `connecting`.
///
/// Address equality is byte equality, i.e. case-insensitive on the hex form.
pub fn resolve(raw: &str, connecting: Option<Address>) -> Address {
    match parse_address(raw) {
        Some(referrer) => exclude_self(referrer, connecting),
        None => Address::ZERO,
    }
}

/// `base_url` with the referral parameter set to `account` (checksummed).
///
/// Other query parameters are kept; an existing referral parameter is replaced.
pub fn build_link(base_url: &str, account: Address) -> Result<String> {
    let mut url = Url::parse(base_url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != REFERRAL_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(REFERRAL_PARAM, &checksum(&account));
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const BOB: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    fn addr(s: &str) -> Address {
        parse_address(s).unwrap()
    }

    #[test]
    fn test_from_link_valid() {
        let link = format!("https://stake.example/?ref={ALICE}");
        assert_eq!(from_link(&link), addr(ALICE));
    }

    #[test]
    fn test_from_link_lowercase_is_canonicalized() {
        let link = format!("https://stake.example/?ref={}", ALICE.to_lowercase());
        assert_eq!(checksum(&from_link(&link)), ALICE);
    }

    #[test]
    fn test_from_link_absent_or_invalid() {
        assert_eq!(from_link("https://stake.example/"), Address::ZERO);
        assert_eq!(from_link("https://stake.example/?ref="), Address::ZERO);
        assert_eq!(from_link("https://stake.example/?ref=bob"), Address::ZERO);
        assert_eq!(from_link("not a url at all ::"), Address::ZERO);
    }

    #[test]
    fn test_from_link_relative_query() {
        assert_eq!(from_link(&format!("?ref={ALICE}")), addr(ALICE));
    }

    #[test]
    fn test_from_link_first_param_wins() {
        let link = format!("https://stake.example/?ref={ALICE}&ref={BOB}");
        assert_eq!(from_link(&link), addr(ALICE));
    }

    #[test]
    fn test_candidate_keeps_raw() {
        let candidate = ReferralCandidate::from_link("https://stake.example/?ref=garbage");
        assert_eq!(candidate.raw.as_deref(), Some("garbage"));
        assert!(!candidate.is_present());
    }

    #[test]
    fn test_resolve_self_referral() {
        assert_eq!(resolve(ALICE, Some(addr(ALICE))), Address::ZERO);
        assert_eq!(
            resolve(&ALICE.to_lowercase(), Some(addr(ALICE))),
            Address::ZERO
        );
    }

    #[test]
    fn test_resolve_other_account() {
        assert_eq!(resolve(ALICE, Some(addr(BOB))), addr(ALICE));
        assert_eq!(resolve(ALICE, None), addr(ALICE));
    }

    #[test]
    fn test_candidate_for_account() {
        let candidate = ReferralCandidate::from_link(&format!("https://x.example/?ref={ALICE}"));
        assert_eq!(candidate.for_account(addr(ALICE)), Address::ZERO);
        assert_eq!(candidate.for_account(addr(BOB)), addr(ALICE));
    }

    #[test]
    fn test_build_link_sets_param() {
        let link = build_link("https://stake.example/buy", addr(BOB)).unwrap();
        assert_eq!(link, format!("https://stake.example/buy?ref={BOB}"));
    }

    #[test]
    fn test_build_link_replaces_existing_ref() {
        let link =
            build_link(&format!("https://stake.example/?lang=th&ref={ALICE}"), addr(BOB)).unwrap();
        assert_eq!(link, format!("https://stake.example/?lang=th&ref={BOB}"));
    }

    #[test]
    fn test_build_link_rejects_invalid_base() {
        assert!(build_link("not a url", addr(BOB)).is_err());
    }
}
