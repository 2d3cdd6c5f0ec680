//! Profile registry and device matching
//!
//! Maps a discovered device fingerprint (manufacturer/model strings read
//! off the wire) onto a profile reference. Matching is case-insensitive:
//! exact pattern equality first, bounded wildcard matching second. Device
//! identifiers are untrusted input and are validated before any
//! comparison.

use crate::profile::{InverterDefinition, bundled_profiles, load_bundled};

/// Longest accepted device identifier
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Wildcard patterns with more pieces than this never match
/// (algorithmic-complexity guard for semi-trusted profile input).
const MAX_PATTERN_PIECES: usize = 100;

/// Reference to a loadable profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRef {
    /// Identifier the profile loads under
    pub id: String,
    pub manufacturer: String,
    /// Model patterns; `*` matches any run of characters
    pub patterns: Vec<String>,
}

impl ProfileRef {
    pub fn new<S: Into<String>>(id: S, manufacturer: S, patterns: Vec<String>) -> Self {
        Self {
            id: id.into(),
            manufacturer: manufacturer.into(),
            patterns,
        }
    }

    /// Build a reference from a loaded definition.
    pub fn from_definition(definition: &InverterDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            manufacturer: definition.info.manufacturer.clone(),
            patterns: definition.info.models.clone(),
        }
    }
}

/// Identity strings read from a discovered device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFingerprint {
    pub manufacturer: String,
    pub model: String,
    pub serial: String,
}

impl DeviceFingerprint {
    pub fn new<S: Into<String>>(manufacturer: S, model: S, serial: S) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            serial: serial.into(),
        }
    }
}

impl std::fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.manufacturer, self.model)
    }
}

/// Outcome of matching a fingerprint against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// A profile pattern matched the model
    Found(ProfileRef),
    /// Manufacturer is represented but no model pattern matched; the
    /// suggestion is the first profile of the same manufacturer
    Unsupported { suggestion: Option<ProfileRef> },
    /// Nothing matched at all
    Unknown,
}

/// An ordered collection of profile references.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<ProfileRef>,
}

impl ProfileRegistry {
    pub fn new(profiles: Vec<ProfileRef>) -> Self {
        Self { profiles }
    }

    /// Registry over every profile bundled with the crate.
    pub fn from_bundled() -> Self {
        let profiles = bundled_profiles()
            .iter()
            .filter_map(|id| load_bundled(id).ok())
            .map(|definition| ProfileRef::from_definition(&definition))
            .collect();
        Self { profiles }
    }

    pub fn profiles(&self) -> &[ProfileRef] {
        &self.profiles
    }

    /// Match a device fingerprint against the registry.
    ///
    /// Declaration order decides between profiles of equal precedence: the
    /// first exact pattern wins, then the first wildcard match.
    pub fn find(&self, device: &DeviceFingerprint) -> MatchResult {
        if !valid_identifier(&device.manufacturer) || !valid_identifier(&device.model) {
            return MatchResult::Unknown;
        }

        let model = device.model.to_lowercase();
        let manufacturer = device.manufacturer.to_lowercase();

        for profile in &self.profiles {
            if profile
                .patterns
                .iter()
                .any(|pattern| pattern.to_lowercase() == model)
            {
                return MatchResult::Found(profile.clone());
            }
        }

        for profile in &self.profiles {
            if profile
                .patterns
                .iter()
                .any(|pattern| wildcard_match(&pattern.to_lowercase(), &model))
            {
                return MatchResult::Found(profile.clone());
            }
        }

        let suggestion = self
            .profiles
            .iter()
            .find(|profile| profile.manufacturer.to_lowercase() == manufacturer);
        match suggestion {
            Some(profile) => MatchResult::Unsupported {
                suggestion: Some(profile.clone()),
            },
            None => MatchResult::Unknown,
        }
    }
}

/// Device identifiers must be short and printable. C0 controls, DEL and C1
/// controls are rejected outright; these strings come straight off the
/// wire.
fn valid_identifier(text: &str) -> bool {
    if text.chars().count() > MAX_IDENTIFIER_LENGTH {
        return false;
    }
    !text.chars().any(|ch| {
        let scalar = ch as u32;
        scalar < 0x20 || scalar == 0x7F || (0x80..=0x9F).contains(&scalar)
    })
}

/// Bounded glob matching; `*` matches any run of characters, nothing else
/// is special. Patterns splitting into more than 100 pieces never match.
fn wildcard_match(pattern: &str, input: &str) -> bool {
    let pieces: Vec<&str> = pattern.split('*').collect();
    if pieces.len() > MAX_PATTERN_PIECES {
        return false;
    }
    if pieces.len() == 1 {
        // no wildcard at all
        return pattern == input;
    }

    let first = pieces[0];
    let last = pieces[pieces.len() - 1];

    let mut position = 0;
    if !first.is_empty() {
        if !input.starts_with(first) {
            return false;
        }
        position = first.len();
    }

    for piece in &pieces[1..pieces.len() - 1] {
        if piece.is_empty() {
            continue;
        }
        match input[position..].find(piece) {
            Some(found) => position = position + found + piece.len(),
            None => return false,
        }
    }

    if last.is_empty() {
        // trailing wildcard swallows the rest
        return true;
    }
    input.len() >= position + last.len() && input[position..].ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProfileRegistry {
        ProfileRegistry::new(vec![
            ProfileRef::new(
                "deye_sun_12k",
                "DEYE",
                vec!["SUN-12K-SG04LP3*".to_string()],
            ),
            ProfileRef::new(
                "deye_hybrid_generic",
                "DEYE",
                vec!["SUN-*-SG*LP3*".to_string()],
            ),
            ProfileRef::new("sofar_hyd3k", "SOFAR", vec!["HYD 3K*".to_string()]),
        ])
    }

    fn device(manufacturer: &str, model: &str) -> DeviceFingerprint {
        DeviceFingerprint::new(manufacturer, model, "SN0001")
    }

    #[test]
    fn specific_pattern_wins_by_declaration_order() {
        let result = registry().find(&device("DEYE", "SUN-12K-SG04LP3-EU"));
        match result {
            MatchResult::Found(profile) => assert_eq!(profile.id, "deye_sun_12k"),
            other => panic!("expected found, got {:?}", other),
        }
    }

    #[test]
    fn generic_wildcard_catches_other_sizes() {
        let result = registry().find(&device("DEYE", "SUN-10K-SG04LP3-EU"));
        match result {
            MatchResult::Found(profile) => assert_eq!(profile.id, "deye_hybrid_generic"),
            other => panic!("expected found, got {:?}", other),
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        let result = registry().find(&device("deye", "sun-12k-sg04lp3-eu"));
        assert!(matches!(result, MatchResult::Found(p) if p.id == "deye_sun_12k"));
    }

    #[test]
    fn known_manufacturer_unsupported_model_suggests() {
        let result = registry().find(&device("Deye", "SG01HP3-EU-BM4"));
        match result {
            MatchResult::Unsupported { suggestion } => {
                assert_eq!(suggestion.unwrap().id, "deye_sun_12k");
            }
            other => panic!("expected unsupported, got {:?}", other),
        }
    }

    #[test]
    fn unknown_manufacturer() {
        assert_eq!(
            registry().find(&device("Fronius", "Symo 10.0-3-M")),
            MatchResult::Unknown
        );
    }

    #[test]
    fn control_characters_are_rejected() {
        for model in ["SUN\t12K", "SUN\x0012K", "SUN\x7F", "SUN\u{0085}12K"] {
            assert_eq!(
                registry().find(&device("DEYE", model)),
                MatchResult::Unknown,
                "model {:?} must be rejected",
                model
            );
        }
        assert_eq!(
            registry().find(&device("DE\u{009F}YE", "SUN-12K-SG04LP3-EU")),
            MatchResult::Unknown
        );
    }

    #[test]
    fn oversized_identifiers_are_rejected() {
        let long = "X".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert_eq!(registry().find(&device("DEYE", &long)), MatchResult::Unknown);
        assert_eq!(
            registry().find(&device(long.as_str(), "SUN-12K-SG04LP3-EU")),
            MatchResult::Unknown
        );
        // exactly at the limit is fine
        let exact = "X".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(matches!(
            registry().find(&device("DEYE", exact.as_str())),
            MatchResult::Unsupported { .. }
        ));
    }

    #[test]
    fn wildcard_basics() {
        assert!(wildcard_match("*", "anything at all"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("sun-*", "sun-12k"));
        assert!(wildcard_match("*lp3-eu", "sun-12k-sg04lp3-eu"));
        assert!(wildcard_match("sun-*-sg*lp3*", "sun-12k-sg04lp3-eu"));
        assert!(!wildcard_match("sun-*-sg*lp3", "sun-12k-sg04lp3-eu"));
        assert!(!wildcard_match("sun-12k", "sun-12k-sg04lp3-eu"));
        assert!(wildcard_match("sun-12k", "sun-12k"));
    }

    #[test]
    fn wildcard_anchors() {
        // first piece anchors to the start
        assert!(!wildcard_match("12k*", "sun-12k"));
        // last piece anchors to the end
        assert!(!wildcard_match("*sun", "sun-12k"));
        // pieces must appear in order
        assert!(!wildcard_match("*lp3*sg04*", "sun-12k-sg04lp3-eu"));
    }

    #[test]
    fn wildcard_piece_cap() {
        let pathological = "a*".repeat(101);
        assert!(!wildcard_match(&pathological, &"a".repeat(200)));
        // just below the cap still works
        let heavy = format!("{}b", "*".repeat(50));
        assert!(wildcard_match(&heavy, "aaab"));
    }

    #[test]
    fn bundled_registry_matches_bundled_devices() {
        let registry = ProfileRegistry::from_bundled();
        assert!(!registry.profiles().is_empty());
        let result = registry.find(&device("Deye", "SUN-12K-SG04LP3-EU"));
        assert!(matches!(result, MatchResult::Found(_)));
    }
}
