//! Conference sponsors
//!
//! Sponsors are bundled with the app and grouped by tier for the home
//! screen. Each sponsor has a detail page addressed by slug.

use serde::{Deserialize, Serialize};
use std::fmt;

const BUNDLED_SPONSORS: &str = include_str!("../data/sponsors.json");

/// Sponsorship tier, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SponsorLevel {
    /// Top tier
    Diamond,
    /// Second tier
    Platinum,
    /// Third tier
    Gold,
    /// Fourth tier
    Silver,
}

impl SponsorLevel {
    /// All tiers in display order
    pub const ALL: [SponsorLevel; 4] =
        [SponsorLevel::Diamond, SponsorLevel::Platinum, SponsorLevel::Gold, SponsorLevel::Silver];

    /// Heading color of the tier
    pub fn color(&self) -> &'static str {
        match self {
            SponsorLevel::Diamond => "#38bdf8",
            SponsorLevel::Platinum => "#e5e4e2",
            SponsorLevel::Gold => "#f59e42",
            SponsorLevel::Silver => "#a3a3a3",
        }
    }

    /// Section heading, e.g. `"GOLD SPONSORS"`
    pub fn heading(&self) -> String {
        format!("{} SPONSORS", self.to_string().to_uppercase())
    }
}

impl fmt::Display for SponsorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SponsorLevel::Diamond => "Diamond",
            SponsorLevel::Platinum => "Platinum",
            SponsorLevel::Gold => "Gold",
            SponsorLevel::Silver => "Silver",
        };
        f.write_str(name)
    }
}

/// A sponsor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    /// URL slug
    pub slug: String,
    /// Company name
    pub name: String,
    /// Tier
    pub level: SponsorLevel,
    /// Logo asset
    #[serde(default)]
    pub image: Option<String>,
    /// Greek description
    #[serde(default)]
    pub description_gr: Option<String>,
    /// Primary link
    #[serde(default)]
    pub link: Option<String>,
    /// Second link
    #[serde(default)]
    pub link2: Option<String>,
    /// Third link
    #[serde(default)]
    pub link3: Option<String>,
}

impl Sponsor {
    /// Non-empty links in order
    pub fn links(&self) -> Vec<&str> {
        [&self.link, &self.link2, &self.link3]
            .into_iter()
            .filter_map(|l| l.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Description, if it has any text
    pub fn description(&self) -> Option<&str> {
        self.description_gr.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }
}

/// Sponsor directory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sponsors {
    sponsors: Vec<Sponsor>,
}

impl Sponsors {
    /// The sponsors shipped with the app
    pub fn bundled() -> serde_json::Result<Self> {
        Self::from_json(BUNDLED_SPONSORS)
    }

    /// Parse a sponsor list from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self { sponsors: serde_json::from_str(json)? })
    }

    /// All sponsors in file order
    pub fn all(&self) -> &[Sponsor] {
        &self.sponsors
    }

    /// Sponsors grouped by tier, empty tiers omitted
    pub fn by_level(&self) -> Vec<(SponsorLevel, Vec<&Sponsor>)> {
        SponsorLevel::ALL
            .into_iter()
            .map(|level| (level, self.sponsors.iter().filter(|s| s.level == level).collect::<Vec<_>>()))
            .filter(|(_, sponsors)| !sponsors.is_empty())
            .collect()
    }

    /// Look up a sponsor by slug
    pub fn find(&self, slug: &str) -> Option<&Sponsor> {
        self.sponsors.iter().find(|s| s.slug == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_sponsors_grouped_in_tier_order() {
        let sponsors = Sponsors::bundled().unwrap();
        let groups = sponsors.by_level();

        let levels: Vec<SponsorLevel> = groups.iter().map(|(l, _)| *l).collect();
        assert_eq!(
            levels,
            vec![SponsorLevel::Diamond, SponsorLevel::Platinum, SponsorLevel::Gold, SponsorLevel::Silver]
        );
        assert_eq!(groups[2].1.len(), 2);
    }

    #[test]
    fn test_empty_tiers_omitted() {
        let sponsors = Sponsors::from_json(
            r#"[{"slug": "a", "name": "A", "level": "Silver"},
                {"slug": "b", "name": "B", "level": "Diamond"}]"#,
        )
        .unwrap();

        let groups = sponsors.by_level();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, SponsorLevel::Diamond);
        assert_eq!(groups[1].1[0].slug, "a");
    }

    #[test]
    fn test_find_by_slug() {
        let sponsors = Sponsors::bundled().unwrap();
        assert_eq!(sponsors.find("aegean-grid").unwrap().name, "Aegean Grid");
        assert!(sponsors.find("missing").is_none());
    }

    #[test]
    fn test_links_skip_empty() {
        let sponsors = Sponsors::bundled().unwrap();
        assert_eq!(sponsors.find("northwind-semiconductors").unwrap().links().len(), 2);
        assert_eq!(sponsors.find("pelagos-software").unwrap().links().len(), 3);
        assert_eq!(sponsors.find("kastro-labs").unwrap().links(), vec!["https://kastrolabs.example.com"]);
    }

    #[test]
    fn test_blank_description_hidden() {
        let sponsors = Sponsors::bundled().unwrap();
        assert!(sponsors.find("olympus-robotics").unwrap().description().is_none());
        assert!(sponsors.find("aegean-grid").unwrap().description().is_some());
    }

    #[test]
    fn test_level_heading() {
        assert_eq!(SponsorLevel::Gold.heading(), "GOLD SPONSORS");
        assert_eq!(SponsorLevel::Diamond.color(), "#38bdf8");
    }
}
