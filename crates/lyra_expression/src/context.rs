use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Conversational frame: what the exchange is for and what it must avoid.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicContext {
    pub objective: String,
    pub tone: String,
    pub themes: Vec<String>,
    pub forbidden: Vec<String>,
    pub resources: Vec<String>,
}

impl DynamicContext {
    pub fn new(objective: &str) -> Self {
        Self {
            objective: objective.to_string(),
            tone: "poetic".to_string(),
            themes: Vec::new(),
            forbidden: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_tone(mut self, tone: &str) -> Self {
        self.tone = tone.to_string();
        self
    }

    pub fn with_themes(mut self, themes: Vec<String>) -> Self {
        self.themes = themes;
        self
    }

    pub fn with_forbidden(mut self, forbidden: Vec<String>) -> Self {
        self.forbidden = forbidden;
        self
    }

    /// Deviations of `message` from this context, case-insensitive.
    pub fn analyze(&self, message: &str) -> Vec<String> {
        let lower = message.to_lowercase();
        let mut deviations: Vec<String> = self
            .forbidden
            .iter()
            .filter(|word| lower.contains(&word.to_lowercase()))
            .map(|word| format!("Contains a forbidden term: {}", word))
            .collect();

        if !self.themes.is_empty()
            && !self
                .themes
                .iter()
                .any(|theme| lower.contains(&theme.to_lowercase()))
        {
            deviations.push("Does not match the main themes.".to_string());
        }
        deviations
    }
}

/// Short rolling window of received fragments.
#[derive(Debug, Clone)]
pub struct ContextualMemory {
    fragments: VecDeque<(DateTime<Local>, String)>,
    max_size: usize,
}

impl Default for ContextualMemory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ContextualMemory {
    pub fn new(max_size: usize) -> Self {
        Self {
            fragments: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn record(&mut self, fragment: &str) {
        self.fragments.push_back((Local::now(), fragment.to_string()));
        while self.fragments.len() > self.max_size {
            self.fragments.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|(_, f)| f.as_str())
    }

    /// One `[HH:MM:SS] fragment` line per entry.
    pub fn render(&self) -> String {
        self.fragments
            .iter()
            .map(|(at, f)| format!("[{}] {}", at.format("%H:%M:%S"), f))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
