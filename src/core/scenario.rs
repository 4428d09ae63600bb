use std::fmt;
use std::str::FromStr;

/// Named scripted caller sequences used for demo playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scenario {
    #[default]
    Suicide,
    Accident,
    Medical,
}

const SUICIDE_SCRIPT: &[&str] = &[
    "I don't know if I can do this anymore...",
    "I have pills here and I'm thinking about ending it all.",
    "Everything feels so hopeless right now.",
    "I just want the pain to stop.",
];

const ACCIDENT_SCRIPT: &[&str] = &[
    "There's been a terrible accident on the highway.",
    "Multiple cars are involved and there's debris everywhere.",
    "I can see people trapped in their vehicles.",
    "We need emergency services immediately!",
];

const MEDICAL_SCRIPT: &[&str] = &[
    "My husband is having severe chest pain.",
    "He's having trouble breathing and looks pale.",
    "I think it might be a heart attack.",
    "Please send an ambulance quickly!",
];

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Suicide, Scenario::Accident, Scenario::Medical];

    pub fn key(&self) -> &'static str {
        match self {
            Scenario::Suicide => "suicide",
            Scenario::Accident => "accident",
            Scenario::Medical => "medical",
        }
    }

    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(Scenario::key).collect()
    }

    pub fn script(&self) -> &'static [&'static str] {
        match self {
            Scenario::Suicide => SUICIDE_SCRIPT,
            Scenario::Accident => ACCIDENT_SCRIPT,
            Scenario::Medical => MEDICAL_SCRIPT,
        }
    }

    /// Unrecognized keys fall back to `fallback` instead of failing.
    pub fn resolve(key: Option<&str>, fallback: Scenario) -> Scenario {
        key.and_then(|k| k.parse().ok()).unwrap_or(fallback)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.key() == s.trim())
            .ok_or_else(|| format!("unknown scenario '{}'", s))
    }
}
