//! Best-effort text features built on a model backend
//!
//! `FallbackGenerator` walks a model chain with caching; `Assistant` turns its
//! output into suggestions, difficulty ratings, insights and chat replies and
//! substitutes a rule-based answer whenever generation fails.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::ai::{AiError, ModelBackend, ModelChains, OfflineBackend, ResponseCache, TaskKind};
use crate::analytics::WeeklyReview;
use crate::domain::{ChatMessage, ChatRole, Streak, Tag, MAX_NAME_CHARS};
use crate::engine::difficulty::{clamp_rating, DEFAULT_DIFFICULTY};

/// Chat turns included in a prompt
const CHAT_HISTORY_TURNS: usize = 10;

/// Longest model analysis kept on a habit
const MAX_ANALYSIS_CHARS: usize = 600;

/// Asks each model of a chain in turn and caches the first answer
pub struct FallbackGenerator {
    backend: Box<dyn ModelBackend>,
    chains: ModelChains,
    cache: ResponseCache,
}

impl FallbackGenerator {
    pub fn new(backend: Box<dyn ModelBackend>, chains: ModelChains, cache_ttl: Duration) -> Self {
        Self {
            backend,
            chains,
            cache: ResponseCache::new(cache_ttl),
        }
    }

    pub fn chains(&self) -> &ModelChains {
        &self.chains
    }

    pub async fn generate(&self, prompt: &str, task: TaskKind) -> Result<String, AiError> {
        if let Some(hit) = self.cache.get(task, prompt, Instant::now()) {
            tracing::debug!("Cache hit for {} prompt", task);
            return Ok(hit);
        }

        for model in self.chains.for_task(task) {
            match self.backend.complete(model, prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    let text = text.trim().to_string();
                    self.cache.put(task, prompt, text.clone(), Instant::now());
                    return Ok(text);
                }
                Ok(_) => {
                    let err = AiError::EmptyResponse { model: model.clone() };
                    tracing::warn!("{}; trying next model", err);
                }
                Err(err) => {
                    tracing::warn!("Model {} failed for {} task: {}", model, task, err);
                }
            }
        }

        Err(AiError::UpstreamUnavailable(format!(
            "no model in the {} chain answered",
            task
        )))
    }
}

/// Where a piece of generated text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitSuggestion {
    pub name: String,
    pub emoji: String,
    pub tags: Vec<Tag>,
    pub difficulty_rating: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DifficultyAssessment {
    pub rating: u8,
    pub analysis: String,
    pub source: InsightSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedText {
    pub lines: Vec<String>,
    pub source: InsightSource,
}

const FALLBACK_SUGGESTIONS: &[(&str, &str, &[Tag], u8)] = &[
    ("Drink a glass of water", "💧", &[Tag::Vit], 1),
    ("Read 10 pages", "📚", &[Tag::Int], 2),
    ("Morning stretch", "🧘", &[Tag::Agi, Tag::Vit], 1),
    ("20 pushups", "💪", &[Tag::Str], 3),
    ("Journal for 5 minutes", "✍️", &[Tag::Int, Tag::Per], 2),
    ("Walk 8000 steps", "🚶", &[Tag::Vit, Tag::Agi], 3),
    ("Meditate 10 minutes", "🧠", &[Tag::Per], 2),
    ("No phone after 10pm", "📵", &[Tag::Per], 4),
    ("Cook a healthy meal", "🥗", &[Tag::Vit], 3),
    ("Practice an instrument", "🎸", &[Tag::Int, Tag::Agi], 3),
];

const STRENUOUS_WORDS: &[&str] = &[
    "run", "gym", "workout", "lift", "marathon", "study", "cold shower", "fast", "practice", "write",
];

const EASY_WORDS: &[&str] = &["water", "vitamin", "floss", "bed", "stretch", "walk"];

/// Rule-based difficulty: start at 2, adjust for effort words and size
pub fn heuristic_difficulty(name: &str, subtask_count: usize) -> u8 {
    let lower = name.to_lowercase();
    let mut rating: i32 = 2;
    if STRENUOUS_WORDS.iter().any(|w| lower.contains(w)) {
        rating += 1;
    }
    if EASY_WORDS.iter().any(|w| lower.contains(w)) {
        rating -= 1;
    }
    if subtask_count >= 3 {
        rating += 1;
    }
    rating.clamp(1, 5) as u8
}

/// First digit 1-5 in a model reply, if any
pub fn parse_rating(reply: &str) -> Option<u8> {
    reply
        .chars()
        .filter_map(|c| c.to_digit(10))
        .find(|d| (1..=5).contains(d))
        .map(|d| d as u8)
}

/// Strip list markers like "-", "*", "•" or "3." from a line
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

/// Parse `name | emoji | TAG, TAG | rating`; everything after the name is optional
fn parse_suggestion(line: &str) -> Option<HabitSuggestion> {
    let mut parts = strip_list_marker(line).split('|').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty())?;
    if name.chars().count() > MAX_NAME_CHARS {
        return None;
    }

    let emoji = parts
        .next()
        .filter(|e| !e.is_empty())
        .unwrap_or(crate::domain::DEFAULT_EMOJI);
    let tags = parts
        .next()
        .map(|raw| {
            raw.split(',')
                .filter_map(|t| Tag::parse(t).ok())
                .take(3)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let difficulty_rating = parts
        .next()
        .and_then(parse_rating)
        .unwrap_or(DEFAULT_DIFFICULTY);

    Some(HabitSuggestion {
        name: name.to_string(),
        emoji: emoji.to_string(),
        tags,
        difficulty_rating,
    })
}

fn non_empty_lines(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(strip_list_marker)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// The tracker's coach. Never fails; degrades to rules.
pub struct Assistant {
    generator: FallbackGenerator,
}

impl Assistant {
    pub fn new(generator: FallbackGenerator) -> Self {
        Self { generator }
    }

    /// No backend: every feature uses its fallback
    pub fn offline() -> Self {
        Self::new(FallbackGenerator::new(
            Box::new(OfflineBackend),
            ModelChains::default(),
            super::cache::DEFAULT_TTL,
        ))
    }

    /// Up to `count` new habit ideas that don't duplicate `existing` names
    pub async fn suggest_habits(&self, existing: &[String], count: usize) -> Vec<HabitSuggestion> {
        let taken: Vec<String> = existing.iter().map(|n| n.to_lowercase()).collect();
        let is_new = |s: &HabitSuggestion| !taken.contains(&s.name.to_lowercase());

        let prompt = format!(
            "Suggest {} small daily habits. The user already tracks: {}.\n\
             One per line as: name | emoji | tags from STR,AGI,INT,VIT,PER | difficulty 1-5",
            count,
            if existing.is_empty() { "nothing yet".to_string() } else { existing.join(", ") }
        );

        let mut suggestions: Vec<HabitSuggestion> = match self.generator.generate(&prompt, TaskKind::Simple).await {
            Ok(reply) => reply.lines().filter_map(parse_suggestion).filter(|s| is_new(s)).collect(),
            Err(err) => {
                tracing::warn!("Using built-in habit suggestions: {}", err);
                Vec::new()
            }
        };
        suggestions.dedup_by(|a, b| a.name.eq_ignore_ascii_case(&b.name));
        suggestions.truncate(count);

        for (name, emoji, tags, rating) in FALLBACK_SUGGESTIONS {
            if suggestions.len() >= count {
                break;
            }
            let candidate = HabitSuggestion {
                name: name.to_string(),
                emoji: emoji.to_string(),
                tags: tags.to_vec(),
                difficulty_rating: *rating,
            };
            if is_new(&candidate) && !suggestions.iter().any(|s| s.name == candidate.name) {
                suggestions.push(candidate);
            }
        }

        suggestions
    }

    /// Rate a habit 1-5 with a short explanation
    pub async fn rate_difficulty(&self, name: &str, subtasks: &[String]) -> DifficultyAssessment {
        let prompt = format!(
            "Rate how hard this daily habit is from 1 (trivial) to 5 (very hard). \
             Start your reply with the number, then one or two sentences why.\n\
             Habit: {}\nSteps: {}",
            name,
            if subtasks.is_empty() { "none".to_string() } else { subtasks.join("; ") }
        );

        if let Ok(reply) = self.generator.generate(&prompt, TaskKind::Difficulty).await {
            if let Some(rating) = parse_rating(&reply) {
                return DifficultyAssessment {
                    rating: clamp_rating(rating),
                    analysis: truncate_chars(&reply, MAX_ANALYSIS_CHARS),
                    source: InsightSource::Model,
                };
            }
            tracing::warn!("Difficulty reply had no rating, using heuristic");
        }

        let rating = heuristic_difficulty(name, subtasks.len());
        DifficultyAssessment {
            rating,
            analysis: format!(
                "Estimated {}/5 from the habit's wording and its {} step{}.",
                rating,
                subtasks.len(),
                if subtasks.len() == 1 { "" } else { "s" }
            ),
            source: InsightSource::Heuristic,
        }
    }

    /// Observations about a week; `fallback` is used if no model answers
    pub async fn weekly_insights(&self, review: &WeeklyReview, fallback: Vec<String>) -> GeneratedText {
        let habits = review
            .habits
            .iter()
            .map(|h| format!("{} {}/7", h.name, h.completed_days))
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "Give up to 4 short, encouraging, specific observations about this habit week \
             ({} to {}), one per line.\nDays logged: {}. Perfect days: {}. Average completion: {}%. \
             Habits: {}.",
            review.start,
            review.end,
            review.days_logged,
            review.perfect_days,
            review.average_completion,
            habits
        );

        match self.generator.generate(&prompt, TaskKind::Analysis).await {
            Ok(reply) => {
                let mut lines = non_empty_lines(&reply);
                lines.truncate(4);
                if !lines.is_empty() {
                    return GeneratedText {
                        lines,
                        source: InsightSource::Model,
                    };
                }
            }
            Err(err) => tracing::warn!("Using rule-based weekly insights: {}", err),
        }

        GeneratedText {
            lines: fallback,
            source: InsightSource::Heuristic,
        }
    }

    /// One line of encouragement for the current daily streak
    pub async fn motivation(&self, streak: &Streak) -> String {
        let prompt = format!(
            "Write one upbeat sentence for someone on a {} day habit streak (best ever {}).",
            streak.current_streak, streak.longest_streak
        );
        match self.generator.generate(&prompt, TaskKind::Simple).await {
            Ok(reply) => non_empty_lines(&reply)
                .into_iter()
                .next()
                .unwrap_or_else(|| streak.motivational_message()),
            Err(_) => streak.motivational_message(),
        }
    }

    /// Reply to a chat message given recent history and a progress summary
    pub async fn chat(&self, history: &[ChatMessage], message: &str, context: &str) -> GeneratedText {
        let start = history.len().saturating_sub(CHAT_HISTORY_TURNS);
        let transcript = history[start..]
            .iter()
            .map(|m| {
                let who = match m.role {
                    ChatRole::User => "User",
                    ChatRole::Assistant => "Coach",
                };
                format!("{}: {}", who, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "You are a friendly habit coach. The user's progress: {}\n\n{}\nUser: {}\nCoach:",
            context, transcript, message
        );

        match self.generator.generate(&prompt, TaskKind::Chat).await {
            Ok(reply) => GeneratedText {
                lines: vec![reply],
                source: InsightSource::Model,
            },
            Err(err) => {
                tracing::warn!("Chat falling back to canned reply: {}", err);
                GeneratedText {
                    lines: vec![format!(
                        "I can't reach my coaching brain right now, but here's where you stand: {}",
                        context
                    )],
                    source: InsightSource::Heuristic,
                }
            }
        }
    }
}
