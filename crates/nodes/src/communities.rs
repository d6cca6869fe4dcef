//! Built-in subreddit catalog for [`pipeline::select_subreddits`].

use pipeline::{CommunityTrait, ContentTypeTargets, SelfPromotion, Subreddit, SubredditCatalog};

use CommunityTrait::{BeginnerFriendly, EntrepreneurFriendly, TechnicalDepthRequired};

pub fn builtin_subreddits() -> SubredditCatalog {
    SubredditCatalog {
        subreddits: vec![
            community(
                "programming",
                &["technical", "software", "developers"],
                &[TechnicalDepthRequired],
                SelfPromotion::Limited,
            ),
            community(
                "webdev",
                &["web", "development", "frontend"],
                &[BeginnerFriendly],
                SelfPromotion::Allowed,
            ),
            community(
                "rust",
                &["rust", "systems", "performance"],
                &[TechnicalDepthRequired],
                SelfPromotion::Allowed,
            ),
            community(
                "opensource",
                &["open source", "maintainers", "contributors"],
                &[],
                SelfPromotion::Allowed,
            ),
            community(
                "sideproject",
                &["makers", "indie", "projects"],
                &[EntrepreneurFriendly, BeginnerFriendly],
                SelfPromotion::Encouraged,
            ),
            community(
                "indiehackers",
                &["startup", "business", "indie"],
                &[EntrepreneurFriendly],
                SelfPromotion::Encouraged,
            ),
            community(
                "entrepreneur",
                &["business", "founders", "entrepreneurs"],
                &[EntrepreneurFriendly],
                SelfPromotion::Limited,
            ),
            community(
                "saas",
                &["saas", "founders", "subscription"],
                &[EntrepreneurFriendly],
                SelfPromotion::Allowed,
            ),
            community(
                "startups",
                &["startup", "founders"],
                &[EntrepreneurFriendly],
                SelfPromotion::Forbidden,
            ),
            community(
                "learnprogramming",
                &["beginners", "learning", "students"],
                &[BeginnerFriendly],
                SelfPromotion::Forbidden,
            ),
            community(
                "devops",
                &["devops", "operations", "infrastructure", "sre"],
                &[TechnicalDepthRequired],
                SelfPromotion::Limited,
            ),
            community(
                "selfhosted",
                &["self-hosting", "homelab", "sysadmins"],
                &[],
                SelfPromotion::Allowed,
            ),
        ],
        targets: vec![
            targets(
                "tool_launch",
                &["sideproject", "programming"],
                &["webdev", "opensource", "selfhosted"],
            ),
            targets("tutorial", &["learnprogramming", "webdev"], &["programming", "rust"]),
            targets("case_study", &["programming", "devops"], &["saas", "indiehackers"]),
            targets("opinion", &["programming"], &["webdev", "entrepreneur"]),
            targets("announcement", &["opensource"], &["programming", "sideproject"]),
        ],
    }
}

fn community(
    name: &str,
    tags: &[&str],
    culture: &[CommunityTrait],
    self_promotion: SelfPromotion,
) -> Subreddit {
    Subreddit {
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        culture: culture.to_vec(),
        self_promotion,
    }
}

fn targets(content_type: &str, primary: &[&str], secondary: &[&str]) -> ContentTypeTargets {
    ContentTypeTargets {
        content_type: content_type.to_string(),
        primary: primary.iter().map(|s| s.to_string()).collect(),
        secondary: secondary.iter().map(|s| s.to_string()).collect(),
    }
}
