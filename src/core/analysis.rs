//! Keyword-based risk scoring over a call transcript.
//!
//! This is the offline fallback for the dashboard's "AI" panel: it only looks
//! for fixed phrases, never calls out, and never changes call state.

use crate::domain::model::{CallId, TranscriptEntry};
use serde::Serialize;

const CRISIS_KEYWORDS: &[&str] = &["kill", "die", "end it", "pills", "suicide"];

const SUICIDAL_PHRASES: &[&str] = &["kill", "die", "end it"];
const HOPELESS_PHRASES: &[&str] = &["tired", "hopeless", "no point"];
const ANGRY_PHRASES: &[&str] = &["angry", "furious"];
const SCARED_PHRASES: &[&str] = &["scared", "afraid"];
const OVERDOSE_PHRASES: &[&str] = &["pills", "medication"];
const ALONE_PHRASES: &[&str] = &["alone", "no one"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Emergency,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalysis {
    pub call_id: CallId,
    pub risk_level: RiskLevel,
    pub tone: String,
    pub alerts: Vec<Alert>,
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

pub fn risk_level(transcript: &[TranscriptEntry]) -> RiskLevel {
    let text = transcript
        .iter()
        .map(|entry| entry.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let hits = CRISIS_KEYWORDS
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .count();

    match hits {
        0 => RiskLevel::Low,
        1 => RiskLevel::Medium,
        2 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

pub fn tone(utterance: &str) -> &'static str {
    let text = utterance.to_lowercase();
    if contains_any(&text, SUICIDAL_PHRASES) {
        "Suicidal/Desperate"
    } else if contains_any(&text, HOPELESS_PHRASES) {
        "Hopeless/Desperate"
    } else if contains_any(&text, ANGRY_PHRASES) {
        "Angry/Agitated"
    } else if contains_any(&text, SCARED_PHRASES) {
        "Scared/Anxious"
    } else {
        "Calm/Neutral"
    }
}

pub fn alerts(utterance: &str) -> Vec<Alert> {
    let text = utterance.to_lowercase();
    let mut alerts = Vec::new();

    if contains_any(&text, SUICIDAL_PHRASES) {
        alerts.push(Alert {
            kind: AlertKind::Emergency,
            title: "SUICIDAL THOUGHTS DETECTED".to_string(),
            message: "Caller used language indicating intent to self-harm".to_string(),
        });
    }
    if contains_any(&text, OVERDOSE_PHRASES) {
        alerts.push(Alert {
            kind: AlertKind::Warning,
            title: "OVERDOSE RISK".to_string(),
            message: "Mentioned having pills available".to_string(),
        });
    }
    if contains_any(&text, ALONE_PHRASES) {
        alerts.push(Alert {
            kind: AlertKind::Info,
            title: "ALONE AT HOME".to_string(),
            message: "No other persons detected in background".to_string(),
        });
    }

    alerts
}

/// Scores the whole transcript and the newest line. `None` for an empty transcript.
pub fn analyze(call_id: &str, transcript: &[TranscriptEntry]) -> Option<CallAnalysis> {
    let latest = transcript.last()?;
    Some(CallAnalysis {
        call_id: call_id.to_string(),
        risk_level: risk_level(transcript),
        tone: tone(&latest.text).to_string(),
        alerts: alerts(&latest.text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scenario::Scenario;

    fn transcript(lines: &[&str]) -> Vec<TranscriptEntry> {
        lines
            .iter()
            .map(|text| TranscriptEntry::new("call", "Caller", *text))
            .collect()
    }

    #[test]
    fn test_risk_level_counts_distinct_keywords() {
        assert_eq!(risk_level(&transcript(&["hello"])), RiskLevel::Low);
        assert_eq!(risk_level(&transcript(&["I have pills", "more pills"])), RiskLevel::Medium);
        assert_eq!(risk_level(&transcript(&["pills", "I want to die"])), RiskLevel::High);
        assert_eq!(
            risk_level(&transcript(&["pills", "die", "suicide"])),
            RiskLevel::Critical
        );
    }

    #[test]
    fn test_tone_precedence() {
        assert_eq!(tone("I want to END IT"), "Suicidal/Desperate");
        assert_eq!(tone("Everything feels so hopeless"), "Hopeless/Desperate");
        assert_eq!(tone("I'm furious"), "Angry/Agitated");
        assert_eq!(tone("I'm scared"), "Scared/Anxious");
        assert_eq!(tone("There's been an accident"), "Calm/Neutral");
    }

    #[test]
    fn test_alerts_for_pills_line() {
        let found = alerts("I have pills here and I'm thinking about ending it all.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AlertKind::Warning);
        assert_eq!(found[0].title, "OVERDOSE RISK");
    }

    #[test]
    fn test_full_suicide_script_is_medium_risk() {
        // 只有 "pills" 命中，"ending it" 不算 "end it"
        let analysis = analyze("call", &transcript(Scenario::Suicide.script())).unwrap();
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.call_id, "call");
    }

    #[test]
    fn test_empty_transcript_has_no_analysis() {
        assert!(analyze("call", &[]).is_none());
    }

    #[test]
    fn test_wire_shape() {
        let analysis = analyze("sim_1", &transcript(&["I'm alone"])).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["riskLevel"], "LOW");
        assert_eq!(json["alerts"][0]["type"], "info");
    }
}
