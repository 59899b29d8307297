//! Policy rules evaluated against classified flows.
//!
//! The rule list is compiled once from the configuration and shared by
//! reference with every worker. Evaluation is first-match-wins in rule
//! order; allow rules are listed ahead of block rules so an `AllowApp`
//! override short-circuits any block that would otherwise apply.

use std::net::Ipv4Addr;

use crate::classify::{AppLabel, domains};
use crate::flow::{FlowState, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    BlockApp(AppLabel),
    /// Case-insensitive suffix match on SNI or Host, at label boundaries.
    BlockDomainSuffix(String),
    /// Matches either endpoint of the flow.
    BlockIp(Ipv4Addr),
    AllowApp(AppLabel),
}

#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| match r {
                Rule::BlockDomainSuffix(s) => Rule::BlockDomainSuffix(s.to_ascii_lowercase()),
                other => other,
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decides the verdict for a flow. `classified` gates app-dependent
    /// rules: before classification only `BlockIp` can match, and a
    /// no-match result must not be latched as `Forward` yet.
    pub fn decide(&self, flow: &FlowState, classified: bool) -> Verdict {
        for rule in &self.rules {
            match rule {
                Rule::AllowApp(app) => {
                    if classified && flow.app == *app {
                        return Verdict::Forward;
                    }
                }
                Rule::BlockApp(app) => {
                    if classified && flow.app == *app {
                        return Verdict::Block;
                    }
                }
                Rule::BlockDomainSuffix(suffix) => {
                    let hit = [flow.sni.as_deref(), flow.http_host.as_deref()]
                        .into_iter()
                        .flatten()
                        .any(|name| domains::matches_suffix(name, suffix));
                    if hit {
                        return Verdict::Block;
                    }
                }
                Rule::BlockIp(ip) => {
                    if flow.key.has_endpoint(*ip) {
                        return Verdict::Block;
                    }
                }
            }
        }
        if classified {
            Verdict::Forward
        } else {
            Verdict::Pending
        }
    }

    /// True if the app is named by a block rule and not saved by an earlier
    /// allow rule. Used for the `(BLOCKED)` report annotation.
    pub fn is_blocked_app(&self, app: AppLabel) -> bool {
        for rule in &self.rules {
            match rule {
                Rule::AllowApp(a) if *a == app => return false,
                Rule::BlockApp(a) if *a == app => return true,
                _ => {}
            }
        }
        false
    }
}

/// Applies the rule engine to a flow, honoring verdict monotonicity: a
/// `Pending` flow may move to `Forward` only once classified, and to `Block`
/// at any time; a settled verdict never changes.
pub fn update_verdict(rules: &RuleSet, flow: &mut FlowState) {
    if flow.verdict != Verdict::Pending {
        return;
    }
    let classified = flow.state == crate::flow::ClassificationState::Classified;
    match rules.decide(flow, classified) {
        Verdict::Block => flow.verdict = Verdict::Block,
        Verdict::Forward => flow.verdict = Verdict::Forward,
        Verdict::Pending => {}
    }
}

#[cfg(test)]
mod tests {
    use wire_types::ip::IpProto;

    use super::*;
    use crate::flow::{ClassificationState, FlowKey};

    fn flow(app: AppLabel, sni: Option<&str>) -> FlowState {
        let (key, _) = FlowKey::canonical(
            Ipv4Addr::new(10, 0, 0, 1),
            40000,
            Ipv4Addr::new(142, 250, 80, 46),
            443,
            IpProto::Tcp,
        );
        let mut f = FlowState::new(key, 0);
        f.app = app;
        f.sni = sni.map(str::to_string);
        f.state = ClassificationState::Classified;
        f
    }

    #[test]
    fn empty_ruleset_forwards_classified() {
        let rules = RuleSet::default();
        assert_eq!(rules.decide(&flow(AppLabel::Https, None), true), Verdict::Forward);
        assert_eq!(
            rules.decide(&flow(AppLabel::Https, None), false),
            Verdict::Pending
        );
    }

    #[test]
    fn block_app_matches() {
        let rules = RuleSet::new(vec![Rule::BlockApp(AppLabel::YouTube)]);
        assert_eq!(
            rules.decide(&flow(AppLabel::YouTube, Some("www.youtube.com")), true),
            Verdict::Block
        );
        assert_eq!(
            rules.decide(&flow(AppLabel::Netflix, None), true),
            Verdict::Forward
        );
    }

    #[test]
    fn app_rules_wait_for_classification() {
        let rules = RuleSet::new(vec![Rule::BlockApp(AppLabel::YouTube)]);
        let mut f = flow(AppLabel::YouTube, None);
        f.state = ClassificationState::NeedsL7;
        assert_eq!(rules.decide(&f, false), Verdict::Pending);
    }

    #[test]
    fn domain_suffix_blocks_sni_and_host() {
        let rules = RuleSet::new(vec![Rule::BlockDomainSuffix("Facebook.COM".into())]);
        assert_eq!(
            rules.decide(&flow(AppLabel::Facebook, Some("cdn.facebook.com")), true),
            Verdict::Block
        );
        assert_eq!(
            rules.decide(&flow(AppLabel::Unknown, Some("notfacebook.com")), true),
            Verdict::Forward
        );

        let mut f = flow(AppLabel::Http, None);
        f.http_host = Some("m.facebook.com".into());
        assert_eq!(rules.decide(&f, true), Verdict::Block);
    }

    #[test]
    fn block_ip_matches_either_endpoint_before_classification() {
        let rules = RuleSet::new(vec![Rule::BlockIp(Ipv4Addr::new(142, 250, 80, 46))]);
        let mut f = flow(AppLabel::Unknown, None);
        f.state = ClassificationState::NeedsL7;
        assert_eq!(rules.decide(&f, false), Verdict::Block);
    }

    #[test]
    fn allow_overrides_block() {
        let rules = RuleSet::new(vec![
            Rule::AllowApp(AppLabel::YouTube),
            Rule::BlockApp(AppLabel::YouTube),
        ]);
        assert_eq!(
            rules.decide(&flow(AppLabel::YouTube, None), true),
            Verdict::Forward
        );
        assert!(!rules.is_blocked_app(AppLabel::YouTube));
    }

    #[test]
    fn verdict_updates_are_monotonic() {
        let rules = RuleSet::new(vec![Rule::BlockApp(AppLabel::YouTube)]);
        let mut f = flow(AppLabel::YouTube, None);
        update_verdict(&rules, &mut f);
        assert_eq!(f.verdict, Verdict::Block);

        // A later allow-looking state cannot unblock.
        f.app = AppLabel::Https;
        update_verdict(&rules, &mut f);
        assert_eq!(f.verdict, Verdict::Block);
    }

    #[test]
    fn blocked_app_annotation() {
        let rules = RuleSet::new(vec![Rule::BlockApp(AppLabel::YouTube)]);
        assert!(rules.is_blocked_app(AppLabel::YouTube));
        assert!(!rules.is_blocked_app(AppLabel::Netflix));
    }
}
