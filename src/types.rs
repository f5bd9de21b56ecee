use crate::grammar::{Step, StepError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire form of a plan, as produced by the reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawPlan {
    pub explanation: String,
    pub steps: Vec<String>,
}

/// A validated plan. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub explanation: String,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(explanation: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            explanation: explanation.into(),
            steps,
        }
    }

    pub fn info(explanation: impl Into<String>) -> Self {
        Self::new(explanation, Vec::new())
    }

    pub fn is_informational(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_strings(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.to_string()).collect()
    }
}

impl TryFrom<RawPlan> for Plan {
    type Error = StepError;

    fn try_from(raw: RawPlan) -> Result<Self, Self::Error> {
        let steps = raw
            .steps
            .iter()
            .map(|s| Step::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Plan::new(raw.explanation, steps))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    Openai,
    Keyword,
}

impl GeneratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::Openai => "openai",
            GeneratorKind::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    pub plan: Plan,
    pub source: GeneratorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Cancelled,
    Error,
    InfoOnly,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Cancelled => "cancelled",
            Outcome::Error => "error",
            Outcome::InfoOnly => "info_only",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the user's input arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Voice,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Voice => "voice",
        }
    }
}

/// How Sol answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseModality {
    Text,
    Voice,
    Both,
}
