//! Subreddit selection.
//!
//! Reddit is one platform but many audiences. Given a [`SubredditCatalog`]
//! and the content's DNA, [`select_subreddits`] ranks communities by:
//!
//! | Signal | Points |
//! |--------|--------|
//! | Primary / secondary / other community for the content type | 10 / 5 / 1 |
//! | Each audience keyword overlapping a community tag | 2 |
//! | Technical content in a community that requires depth | 3 |
//! | Business content in an entrepreneur-friendly community | 4 |
//! | Self-promotion encouraged / allowed / limited / forbidden | 2 / 1 / -1 / -2 |

use serde::{Deserialize, Serialize};

use crate::ContentDna;

/// Words in the value proposition or problem that mark business content.
const BUSINESS_INDICATORS: &[&str] = &["startup", "business", "entrepreneur", "revenue", "saas"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfPromotion {
    Encouraged,
    Allowed,
    Limited,
    Forbidden,
}

impl SelfPromotion {
    fn points(self) -> f64 {
        match self {
            Self::Encouraged => 2.0,
            Self::Allowed => 1.0,
            Self::Limited => -1.0,
            Self::Forbidden => -2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityTrait {
    BeginnerFriendly,
    EntrepreneurFriendly,
    TechnicalDepthRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subreddit {
    /// Name without the `r/` prefix.
    pub name: String,
    pub tags: Vec<String>,
    pub culture: Vec<CommunityTrait>,
    pub self_promotion: SelfPromotion,
}

impl Subreddit {
    fn has(&self, trait_: CommunityTrait) -> bool {
        self.culture.contains(&trait_)
    }
}

/// Communities a content type belongs in first, and where it is also welcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeTargets {
    pub content_type: String,
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditCatalog {
    pub subreddits: Vec<Subreddit>,
    pub targets: Vec<ContentTypeTargets>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubredditPick {
    pub subreddit: String,
    pub score: f64,
    pub reason: String,
}

/// Ranks every community in `catalog` for `dna` and returns the best `max`.
///
/// Communities scoring zero or below are dropped. Ties keep catalog order.
pub fn select_subreddits(dna: &ContentDna, catalog: &SubredditCatalog, max: usize) -> Vec<SubredditPick> {
    let targets = catalog
        .targets
        .iter()
        .find(|t| dna.content_type.matches(&t.content_type));

    let mut picks: Vec<SubredditPick> = catalog
        .subreddits
        .iter()
        .map(|sub| SubredditPick {
            subreddit: sub.name.clone(),
            score: score(dna, sub, targets),
            reason: reason(dna, sub),
        })
        .filter(|pick| pick.score > 0.0)
        .collect();

    picks.sort_by(|a, b| b.score.total_cmp(&a.score));
    picks.truncate(max);
    picks
}

fn score(dna: &ContentDna, sub: &Subreddit, targets: Option<&ContentTypeTargets>) -> f64 {
    let listed = |list: &[String]| list.iter().any(|name| name.eq_ignore_ascii_case(&sub.name));
    let mut score = match targets {
        Some(t) if listed(&t.primary) => 10.0,
        Some(t) if listed(&t.secondary) => 5.0,
        _ => 1.0,
    };

    let audience = dna.target_audience.to_lowercase();
    for keyword in audience.split_whitespace() {
        for tag in &sub.tags {
            let tag = tag.to_lowercase();
            if keyword.contains(&tag) || tag.contains(keyword) {
                score += 2.0;
            }
        }
    }

    let technical = dna.technical_details.len() > 2
        || dna.technical_details.iter().any(|d| d.eq_ignore_ascii_case("technical"));
    if technical && sub.has(CommunityTrait::TechnicalDepthRequired) {
        score += 3.0;
    }

    let pitch = format!("{} {}", dna.value_proposition, dna.problem_solved).to_lowercase();
    if BUSINESS_INDICATORS.iter().any(|w| pitch.contains(w))
        && sub.has(CommunityTrait::EntrepreneurFriendly)
    {
        score += 4.0;
    }

    score + sub.self_promotion.points()
}

fn reason(dna: &ContentDna, sub: &Subreddit) -> String {
    let mut reasons = Vec::new();
    if dna.content_type.matches("tool_launch") {
        if sub.has(CommunityTrait::TechnicalDepthRequired) {
            reasons.push("technical tool showcase");
        } else if sub.has(CommunityTrait::EntrepreneurFriendly) {
            reasons.push("indie project launch");
        }
    }
    if sub.has(CommunityTrait::BeginnerFriendly) {
        reasons.push("welcoming community");
    }
    if sub.has(CommunityTrait::EntrepreneurFriendly) {
        reasons.push("business-focused audience");
    }
    if sub.has(CommunityTrait::TechnicalDepthRequired) {
        reasons.push("appreciates technical depth");
    }
    if sub.self_promotion == SelfPromotion::Encouraged {
        reasons.push("encourages self-promotion");
    }

    if reasons.is_empty() {
        "general relevance".to_string()
    } else {
        reasons.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentType;
    use pretty_assertions::assert_eq;

    fn sub(name: &str, tags: &[&str], culture: &[CommunityTrait], promo: SelfPromotion) -> Subreddit {
        Subreddit {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            culture: culture.to_vec(),
            self_promotion: promo,
        }
    }

    fn catalog() -> SubredditCatalog {
        SubredditCatalog {
            subreddits: vec![
                sub("programming", &["programming", "developers"], &[CommunityTrait::TechnicalDepthRequired], SelfPromotion::Limited),
                sub("sideproject", &["makers", "projects"], &[CommunityTrait::EntrepreneurFriendly, CommunityTrait::BeginnerFriendly], SelfPromotion::Encouraged),
                sub("gaming", &["gamers"], &[], SelfPromotion::Forbidden),
            ],
            targets: vec![ContentTypeTargets {
                content_type: "tool_launch".to_string(),
                primary: vec!["sideproject".to_string()],
                secondary: vec!["programming".to_string()],
            }],
        }
    }

    fn dna() -> ContentDna {
        ContentDna {
            content_type: ContentType::new("tool_launch").unwrap(),
            target_audience: "Developers and makers".to_string(),
            value_proposition: "A SaaS for release notes".to_string(),
            technical_details: vec!["rust".into(), "sqlite".into(), "wasm".into()],
            ..ContentDna::minimal_from_source("source")
        }
    }

    #[test]
    fn scores_follow_the_signal_table() {
        let picks = select_subreddits(&dna(), &catalog(), 3);
        let ranked: Vec<(&str, f64)> = picks.iter().map(|p| (p.subreddit.as_str(), p.score)).collect();
        // sideproject: 10 primary + 2 "makers" + 4 business + 2 encouraged.
        // programming: 5 secondary + 2 "developers" + 3 technical - 1 limited.
        assert_eq!(ranked, vec![("sideproject", 18.0), ("programming", 9.0)]);
    }

    #[test]
    fn reasons_describe_the_community() {
        let picks = select_subreddits(&dna(), &catalog(), 3);
        assert_eq!(
            picks[0].reason,
            "indie project launch; welcoming community; business-focused audience; encourages self-promotion"
        );
        assert_eq!(picks[1].reason, "technical tool showcase; appreciates technical depth");
    }

    #[test]
    fn unlisted_content_type_and_max_are_honoured() {
        let mut dna = dna();
        dna.content_type = ContentType::new("opinion").unwrap();
        dna.value_proposition = "Thoughts".into();
        dna.technical_details.clear();
        dna.target_audience = "everyone".into();

        let picks = select_subreddits(&dna, &catalog(), 1);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].subreddit, "sideproject");
        assert_eq!(picks[0].score, 3.0);
    }
}
