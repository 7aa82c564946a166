//! Emotional core: seven bounded intensities that react to incoming text and
//! color outgoing text.
//!
//! Styling applies every emotion holding at least 10% of the total weight,
//! strongest first, so each layer wraps the previous one.

use crate::context::{ContextualMemory, DynamicContext};
use chrono::Local;
use lyra_core::Stylist;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Emotions below this share of the total weight leave no mark on the text.
const STYLE_SHARE_FLOOR: f64 = 0.1;

/// Entries kept by [`EmotionalCore::history`]; older ones are dropped first.
pub const JOURNAL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Tenderness,
    Sarcasm,
    Anger,
    Melancholy,
    Joy,
    Absurd,
    Minimalism,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Tenderness,
        Emotion::Sarcasm,
        Emotion::Anger,
        Emotion::Melancholy,
        Emotion::Joy,
        Emotion::Absurd,
        Emotion::Minimalism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Tenderness => "tenderness",
            Emotion::Sarcasm => "sarcasm",
            Emotion::Anger => "anger",
            Emotion::Melancholy => "melancholy",
            Emotion::Joy => "joy",
            Emotion::Absurd => "absurd",
            Emotion::Minimalism => "minimalism",
        }
    }

    /// Words that nudge this emotion upward when heard.
    fn triggers(&self) -> &'static [&'static str] {
        match self {
            Emotion::Anger => &["useless", "idiot", "stupid"],
            Emotion::Melancholy => &["empty", "sad", "tired"],
            Emotion::Joy => &["great", "awesome", "yay"],
            Emotion::Absurd => &["absurd", "nonsense", "weird"],
            Emotion::Tenderness => &["thanks", "thank you", "pretty", "tender"],
            Emotion::Sarcasm | Emotion::Minimalism => &[],
        }
    }

    fn decorate(&self, text: &str) -> String {
        match self {
            Emotion::Tenderness => format!("~ {} ~", text.to_lowercase()),
            Emotion::Sarcasm => format!("Oh, great. {} (really.)", text),
            Emotion::Anger => format!("[{}...]", text.to_uppercase()),
            Emotion::Melancholy => format!("(sigh) {}...", text),
            Emotion::Joy => format!("!!! {} !!!", text.to_uppercase()),
            Emotion::Absurd => format!("{} 💥 with mental noodles.", text),
            Emotion::Minimalism => format!("{}…", text.chars().take(20).collect::<String>()),
        }
    }
}

pub struct EmotionalCore {
    intensities: BTreeMap<Emotion, f64>,
    sensitivity: f64,
    context: Option<DynamicContext>,
    memory: ContextualMemory,
    journal: VecDeque<String>,
}

impl Default for EmotionalCore {
    fn default() -> Self {
        Self::new(0.5, None)
    }
}

fn initial_intensities() -> BTreeMap<Emotion, f64> {
    Emotion::ALL
        .iter()
        .map(|&e| {
            let base = match e {
                Emotion::Tenderness => 0.3,
                Emotion::Sarcasm => 0.1,
                Emotion::Melancholy => 0.2,
                _ => 0.0,
            };
            (e, base)
        })
        .collect()
}

impl EmotionalCore {
    pub fn new(sensitivity: f64, context: Option<DynamicContext>) -> Self {
        Self {
            intensities: initial_intensities(),
            sensitivity,
            context,
            memory: ContextualMemory::default(),
            journal: VecDeque::with_capacity(JOURNAL_CAPACITY),
        }
    }

    pub fn intensity(&self, emotion: Emotion) -> f64 {
        self.intensities.get(&emotion).copied().unwrap_or(0.0)
    }

    /// Set one intensity, clamped to [0, 1].
    pub fn adjust(&mut self, emotion: Emotion, value: f64) {
        self.intensities.insert(emotion, value.clamp(0.0, 1.0));
    }

    pub fn modulate(&mut self, variations: &[(Emotion, f64)]) {
        for &(emotion, value) in variations {
            self.adjust(emotion, value);
        }
    }

    pub fn memory(&self) -> &ContextualMemory {
        &self.memory
    }

    /// Timestamped log of the most recent expressions.
    pub fn history(&self) -> String {
        self.journal.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }

    /// Current intensities and the recent fragments, for debugging.
    pub fn introspect(&self) -> String {
        let state = self
            .intensities
            .iter()
            .map(|(e, v)| format!("  - {}: {:.2}", e.as_str(), v))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "=== Current state ===\n{}\n=== Recent fragments ===\n{}",
            state,
            self.memory.render()
        )
    }

    fn evaluate(&self, message: &str) -> Vec<String> {
        let mut critiques = self
            .context
            .as_ref()
            .map(|ctx| ctx.analyze(message))
            .unwrap_or_default();
        if message.to_lowercase().contains("beautiful") && self.intensity(Emotion::Sarcasm) > 0.5 {
            critiques.push("'Beautiful' may sound ironic in a sarcastic context.".to_string());
        }
        if message.trim().chars().count() < 10 {
            critiques.push("Fragment too short.".to_string());
        }
        critiques
    }

    fn stylize(&self, message: &str) -> String {
        let total: f64 = self.intensities.values().sum();
        let total = if total > 0.0 { total } else { 1.0 };

        let mut ranked: Vec<(Emotion, f64)> =
            self.intensities.iter().map(|(&e, &v)| (e, v)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .filter(|(_, weight)| weight / total >= STYLE_SHARE_FLOOR)
            .fold(message.to_string(), |text, (emotion, _)| emotion.decorate(&text))
    }

    fn log(&mut self, entry: String) {
        tracing::debug!("{}", entry);
        self.journal
            .push_back(format!("[{}] {}", Local::now().format("%H:%M:%S"), entry));
        while self.journal.len() > JOURNAL_CAPACITY {
            self.journal.pop_front();
        }
    }
}

impl Stylist for EmotionalCore {
    fn react_to(&mut self, text: &str) {
        self.memory.record(text);
        let content = text.to_lowercase();
        let bump = 0.2 * self.sensitivity;
        for emotion in Emotion::ALL {
            if emotion.triggers().iter().any(|w| content.contains(w)) {
                let next = self.intensity(emotion) + bump;
                self.adjust(emotion, next);
            }
        }
    }

    fn express(&mut self, text: &str) -> String {
        let critiques = self.evaluate(text);
        let styled = self.stylize(text);
        self.log(format!("Output: {} | Analysis: {:?}", styled, critiques));
        if critiques.is_empty() {
            styled
        } else {
            format!("{}\n[Analysis] {}", styled, critiques.join("; "))
        }
    }

    fn emotional_state(&self) -> BTreeMap<String, f64> {
        self.intensities
            .iter()
            .map(|(e, v)| (e.as_str().to_string(), *v))
            .collect()
    }

    fn reset(&mut self) {
        self.intensities = initial_intensities();
        self.memory.clear();
        self.journal.clear();
    }
}
