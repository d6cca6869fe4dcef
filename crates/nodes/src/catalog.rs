//! Built-in platform catalog.
//!
//! Twelve platforms, each with an audience profile for fit selection, a
//! validation rule set assembled from the shared primitives in
//! [`pipeline::validation`] plus a few platform-specific checks, and the
//! posting windows its audience is active in.

use pipeline::{
    Field, Finding, FnRule, ForbiddenTerms, LengthBound, PlatformArtifact, PlatformId,
    PlatformProfile, RequiredElement, RequiredField, RuleSet, Severity, StructuralElement,
    TimingProfile, Weekday,
};

use Weekday::{Mon, Sun, Thu, Tue, Wed};

/// Marketing phrases that read as hype on every platform. Reported as warnings.
pub const MARKETING_TERMS: &[&str] = &[
    "revolutionary",
    "game-changing",
    "game changer",
    "amazing",
    "incredible",
    "unlock",
    "empower",
    "leverage",
    "seamless",
    "cutting-edge",
    "next-generation",
    "supercharge",
    "unprecedented",
    "industry-leading",
    "world-class",
    "don't miss out",
    "limited time",
    "sign up now",
];

/// Words Hacker News readers treat as disqualifying in a title.
const HACKERNEWS_FORBIDDEN: &[&str] = &[
    "revolutionary",
    "game-changing",
    "amazing",
    "incredible",
    "ultimate",
    "disruptive",
    "best ever",
];

/// Jargon that, all used together, makes a post read as generic.
const VAGUE_TERMS: &[&str] = &["solution", "platform", "experience", "ecosystem"];

/// Phrases that show a first-hand account.
const AUTHENTIC_VOICE: &[&str] = &[
    "i built",
    "i made",
    "we created",
    "struggled with",
    "limitation",
    "challenge",
];

const HN_TECHNICAL_TERMS: &[&str] = &[
    "algorithm",
    "implementation",
    "architecture",
    "benchmark",
    "performance",
    "optimization",
    "code",
    "technical",
];

const HN_HONESTY_TERMS: &[&str] = &[
    "limitation",
    "challenge",
    "issue",
    "problem",
    "not yet",
    "working on",
    "beta",
    "experimental",
];

/// A catalog entry: who the platform is for, what its content must satisfy,
/// and when to post it.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    pub profile: PlatformProfile,
    pub rules: RuleSet,
    pub timing: TimingProfile,
}

/// Returns the built-in catalog in its canonical order.
pub fn builtin() -> Vec<PlatformDefinition> {
    vec![
        hackernews(),
        twitter(),
        reddit(),
        medium(),
        devto(),
        linkedin(),
        producthunt(),
        indiehackers(),
        substack(),
        hashnode(),
        lobsters(),
        peerlist(),
    ]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn platform_id(id: &'static str) -> PlatformId {
    PlatformId::new(id).expect("catalog platform ids are non-empty literals")
}

fn profile(
    id: &'static str,
    audience: &str,
    sweet_spot: &[&str],
    avoid: &[&str],
    needs: &str,
    red_flags: &str,
) -> PlatformProfile {
    PlatformProfile {
        id: platform_id(id),
        audience: audience.to_string(),
        sweet_spot: sweet_spot.iter().map(|s| s.to_string()).collect(),
        avoid: avoid.iter().map(|s| s.to_string()).collect(),
        needs: needs.to_string(),
        red_flags: red_flags.to_string(),
    }
}

/// Rules every platform starts from: marketing-hype warnings on title and
/// body, and tone checks on the body.
fn shared_rules() -> RuleSet {
    RuleSet::new()
        .with(ForbiddenTerms::new(
            Field::Title,
            MARKETING_TERMS.iter().copied(),
            Severity::Warning,
        ))
        .with(ForbiddenTerms::new(
            Field::Body,
            MARKETING_TERMS.iter().copied(),
            Severity::Warning,
        ))
        .with(FnRule::new("tone", tone_findings))
}

fn tone_findings(artifact: &PlatformArtifact) -> Vec<Finding> {
    let body = artifact.body.trim();
    if body.is_empty() {
        return Vec::new();
    }
    let lower = body.to_lowercase();
    let mut findings = Vec::new();

    let exclamations = body.matches('!').count();
    if exclamations > 3 {
        findings.push(Finding::warning(format!(
            "Too many exclamation marks ({exclamations}) - sounds overly enthusiastic"
        )));
    }
    if count_present(&lower, VAGUE_TERMS) > 3 {
        findings.push(Finding::suggestion(
            "Consider being more specific - detected generic tech jargon",
        ));
    }
    if count_present(&lower, AUTHENTIC_VOICE) == 0 {
        findings.push(Finding::suggestion(
            "Consider adding personal context or honest challenges faced",
        ));
    }
    findings
}

fn hn_submission_findings(artifact: &PlatformArtifact) -> Vec<Finding> {
    let mut findings = Vec::new();
    if artifact.title.contains("Show HN:") && !artifact.title.contains(" - ") {
        findings.push(Finding::suggestion(
            "Consider format: 'Show HN: [Tool] - [What it does]'",
        ));
    }
    let body = artifact.body.to_lowercase();
    if count_present(&body, HN_TECHNICAL_TERMS) < 2 {
        findings.push(Finding::suggestion(
            "Add more technical details - HN users appreciate depth",
        ));
    }
    if count_present(&body, HN_HONESTY_TERMS) == 0 {
        findings.push(Finding::suggestion(
            "Consider mentioning limitations or challenges for authenticity",
        ));
    }
    findings
}

/// Number of distinct `terms` found in already lowercased `text`.
fn count_present(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| text.contains(*term)).count()
}

fn warn_max(field: Field, max: usize) -> LengthBound {
    LengthBound::max(field, max).severity(Severity::Warning)
}

fn warn_min(field: Field, min: usize) -> LengthBound {
    LengthBound::min(field, min).severity(Severity::Warning)
}

fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F600..=0x1F64F | 0x1F300..=0x1F5FF | 0x1F680..=0x1F6FF | 0x1F1E0..=0x1F1FF
    )
}

// ---------------------------------------------------------------------------
// Platforms
// ---------------------------------------------------------------------------

fn hackernews() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(LengthBound::max(Field::Title, 60))
        .with(ForbiddenTerms::new(
            Field::Title,
            HACKERNEWS_FORBIDDEN.iter().copied(),
            Severity::Error,
        ))
        .with(
            RequiredElement::new(
                Field::Title,
                StructuralElement::Prefix("Show HN:".to_string()),
                Severity::Error,
            )
            .with_message("Title should start with 'Show HN:' for tool submissions"),
        )
        .with(FnRule::new("hn_title_style", |artifact: &PlatformArtifact| {
            let title = &artifact.title;
            let mut findings = Vec::new();
            if title.contains('!') {
                findings.push(Finding::warning("Exclamation marks discouraged on HN"));
            }
            if title.contains('?') && !title.trim_end().ends_with('?') {
                findings.push(Finding::warning(
                    "Question marks should only be at end for Ask HN",
                ));
            }
            if title.chars().any(is_emoji) {
                findings.push(Finding::error("Emoji not allowed in HN titles"));
            }
            let words = title.split_whitespace().count();
            if words > 0 && words < 4 {
                findings.push(Finding::warning("Title is very short; add what it does"));
            }
            findings
        }))
        .with(FnRule::new("hn_submission_quality", hn_submission_findings))
        .with(warn_min(Field::Body, 100))
        .with(warn_max(Field::Body, 2000));

    PlatformDefinition {
        profile: profile(
            "hackernews",
            "engineers, founders, intellectually curious hackers",
            &["tool_launch", "case_study", "opinion"],
            &["tutorial"],
            "technical depth, novelty, honest trade-offs",
            "marketing speak, no technical substance, beginner content",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu],
            &[14, 15, 16],
            &["Saturday", "Sunday", "Monday morning"],
            "Peaks mid-week, mid-morning US East Coast. Weekends bring lower traffic and a different crowd.",
        ),
    }
}

fn twitter() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::metadata("thread")))
        .with(FnRule::new("tweet_length", |artifact: &PlatformArtifact| {
            let Some(thread) = artifact.metadata.get("thread").and_then(|t| t.as_array()) else {
                return Vec::new();
            };
            let mut findings = Vec::new();
            for (index, tweet) in thread.iter().enumerate() {
                let text = tweet
                    .get("content")
                    .and_then(|c| c.as_str())
                    .or_else(|| tweet.as_str())
                    .unwrap_or_default();
                let len = text.chars().count();
                let number = index + 1;
                if len > 280 {
                    findings.push(Finding::error(format!(
                        "Tweet {number} exceeds 280 characters ({len})"
                    )));
                } else if len > 260 {
                    findings.push(Finding::warning(format!(
                        "Tweet {number} is very long ({len}/280)"
                    )));
                }
            }
            findings
        }))
        .with(warn_max(Field::metadata("hashtags"), 3));

    PlatformDefinition {
        profile: profile(
            "twitter",
            "tech twitter, founders, developers",
            &["tool_launch", "opinion", "announcement"],
            &[],
            "punchy hooks, visual content, thread-worthy insights",
            "dry content, no hook, nothing quotable",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu],
            &[13, 14, 17, 18],
            &["Late night US time", "Major news events"],
            "Depends on your followers' timezones. Threads do well mid-morning.",
        ),
    }
}

fn reddit() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(RequiredField::new(Field::Body))
        .with(LengthBound::max(Field::Title, 300));

    PlatformDefinition {
        profile: profile(
            "reddit",
            "varies wildly by subreddit",
            &["tool_launch", "tutorial", "case_study"],
            &[],
            "genuine value, subreddit-specific framing, not self-promo",
            "obvious marketing, wrong subreddit, no community fit",
        ),
        rules,
        timing: TimingProfile::new(
            &[Mon, Tue, Wed],
            &[13, 14, 15],
            &["Friday afternoon", "Weekends for professional subs"],
            "Varies by subreddit. Programming subs peak on weekday mornings; hobby subs on weekends.",
        ),
    }
}

fn medium() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(RequiredField::new(Field::Body))
        .with(LengthBound::max(Field::Title, 100))
        .with(warn_min(Field::Title, 10))
        .with(warn_min(Field::Body, 500))
        .with(warn_max(Field::metadata("tags"), 5));

    PlatformDefinition {
        profile: profile(
            "medium",
            "general tech readers, professionals",
            &["tutorial", "case_study", "opinion"],
            &["announcement"],
            "personal narrative, lessons learned, 1500+ words",
            "too short, no personal angle, pure announcement",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Sun],
            &[13, 14, 15],
            &["Friday", "Saturday"],
            "Readers browse on weekday mornings and Sunday evenings. Friday posts often get lost.",
        ),
    }
}

fn devto() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(RequiredField::new(Field::Body))
        .with(LengthBound::max(Field::Title, 250))
        .with(warn_min(Field::Body, 300))
        .with(RequiredElement::new(
            Field::Body,
            StructuralElement::FencedCodeBlock,
            Severity::Suggestion,
        ))
        .with(RequiredElement::new(
            Field::Body,
            StructuralElement::SectionHeader,
            Severity::Warning,
        ))
        .with(RequiredField::new(Field::metadata("tags")).severity(Severity::Warning))
        .with(warn_max(Field::metadata("tags"), 4))
        .with(warn_max(Field::metadata("description"), 160));

    PlatformDefinition {
        profile: profile(
            "devto",
            "developers, beginners welcome",
            &["tutorial", "tool_launch", "case_study"],
            &[],
            "code examples, beginner-friendly, practical",
            "no code, too theoretical, gatekeeping tone",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu],
            &[14, 15, 16],
            &["Weekends"],
            "Forgiving on timing, but weekday mornings US time get more initial engagement.",
        ),
    }
}

fn linkedin() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Body))
        .with(LengthBound::max(Field::Body, 3000))
        .with(warn_max(Field::Body, 1300))
        .with(FnRule::new("linkedin_external_links", |artifact: &PlatformArtifact| {
            if artifact.body.contains("http://") || artifact.body.contains("https://") {
                vec![Finding::error(
                    "External links reduce reach; move them to the first comment",
                )]
            } else {
                Vec::new()
            }
        }));

    PlatformDefinition {
        profile: profile(
            "linkedin",
            "professionals, b2b, career-focused",
            &["announcement", "case_study", "opinion"],
            &["tutorial"],
            "professional angle, lessons, achievement framing",
            "too technical, no professional relevance",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu],
            &[12, 13, 14],
            &["Weekends", "Friday afternoon", "Monday morning"],
            "A workday platform. Early engagement from your network drives reach.",
        ),
    }
}

fn producthunt() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(RequiredField::new(Field::metadata("tagline")))
        .with(LengthBound::max(Field::metadata("tagline"), 80))
        .with(warn_min(Field::metadata("tagline"), 20))
        .with(LengthBound::max(Field::metadata("description"), 260))
        .with(RequiredField::new(Field::metadata("first_comment")));

    PlatformDefinition {
        profile: profile(
            "producthunt",
            "early adopters, product people, makers",
            &["tool_launch"],
            &["tutorial", "opinion", "case_study"],
            "launchable product, visuals, clear value prop",
            "not a product, no demo, just an article",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu],
            &[8],
            &["Monday", "Friday", "Weekends"],
            "The day resets at 00:01 PST (08:00 UTC). Launch then for the full runway.",
        ),
    }
}

fn indiehackers() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(RequiredField::new(Field::Body))
        .with(warn_max(Field::Title, 200))
        .with(warn_min(Field::Body, 300));

    PlatformDefinition {
        profile: profile(
            "indiehackers",
            "indie founders, bootstrappers, solopreneurs",
            &["tool_launch", "case_study"],
            &[],
            "founder story, metrics transparency, lessons",
            "no founder angle, VC-speak, no indie relevance",
        ),
        rules,
        timing: TimingProfile::new(
            &[Mon, Tue, Wed],
            &[14, 15, 16],
            &["Weekends"],
            "Global but US-heavy. Monday posts about weekend work do well.",
        ),
    }
}

fn substack() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(RequiredField::new(Field::Body))
        .with(warn_max(Field::Title, 80));

    PlatformDefinition {
        profile: profile(
            "substack",
            "newsletter readers, thought leadership seekers",
            &["opinion", "case_study"],
            &["announcement"],
            "distinctive voice, deep insights, email-worthy",
            "shallow, no unique perspective, pure promo",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu, Sun],
            &[14, 15],
            &["Saturday"],
            "Email open rates peak Tuesday to Thursday mornings.",
        ),
    }
}

fn hashnode() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(RequiredField::new(Field::Body))
        .with(warn_max(Field::Title, 100))
        .with(warn_min(Field::Body, 500))
        .with(warn_max(Field::metadata("tags"), 5));

    PlatformDefinition {
        profile: profile(
            "hashnode",
            "developers, technical bloggers",
            &["tutorial", "tool_launch", "case_study"],
            &[],
            "technical depth, code, practical value",
            "no code, not developer-focused",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu],
            &[6, 7, 14, 15],
            &["Weekends"],
            "Strong Indian developer community; India morning hours reach it.",
        ),
    }
}

fn lobsters() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Title))
        .with(LengthBound::max(Field::Title, 100))
        .with(RequiredField::new(Field::metadata("tags")))
        .with(LengthBound::max(Field::metadata("tags"), 4));

    PlatformDefinition {
        profile: profile(
            "lobsters",
            "senior engineers, systems programmers, strict quality",
            &["tool_launch", "case_study"],
            &["opinion", "announcement"],
            "technical excellence, programming focus, novel approach",
            "marketing, business focus, not programming-related",
        ),
        rules,
        timing: TimingProfile::new(
            &[Tue, Wed, Thu],
            &[14, 15, 16],
            &["Weekends"],
            "Lower volume than HN, so a post stays visible longer.",
        ),
    }
}

fn peerlist() -> PlatformDefinition {
    let rules = shared_rules()
        .with(RequiredField::new(Field::Body))
        .with(warn_max(Field::Title, 100))
        .with(warn_max(Field::Body, 2000))
        .with(warn_min(Field::Body, 50));

    PlatformDefinition {
        profile: profile(
            "peerlist",
            "indian tech professionals, career showcasing",
            &["tool_launch", "announcement", "case_study"],
            &[],
            "professional achievement angle, brevity",
            "too long, no professional relevance",
        ),
        rules,
        timing: TimingProfile::new(
            &[Mon, Tue, Wed],
            &[4, 5, 6, 14, 15],
            &["Weekends"],
            "Strong Indian tech community; 04:00-06:00 UTC is India morning.",
        ),
    }
}
