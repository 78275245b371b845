//! Prompt construction for the Script Orchestrator's four LLM stages
//! (spec §4.5). Kept separate from `mod.rs` so the drafting control flow
//! isn't buried under prompt string literals, mirroring the teacher's
//! split between clustering's pipeline and judge modules.

use super::{AnchorArticle, Topic};

pub const FALLBACK_INTRO: &str =
    "Welcome back. Here's what's happening today.";
pub const FALLBACK_OUTRO: &str =
    "That's all for this episode. Thanks for listening, and we'll catch you next time.";

const MAX_BODY_CHARS: usize = 5000;

fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Metadata stage: top-3-by-importance articles → `{title, tone}`.
pub fn metadata_prompt(top3: &[AnchorArticle]) -> (String, String) {
    let system = "You are a podcast producer choosing an episode title and \
                  overall tone from today's top stories. Respond with the \
                  requested JSON fields only."
        .to_string();

    let mut user = String::from("Today's top stories by importance:\n\n");
    for (i, article) in top3.iter().enumerate() {
        user.push_str(&format!("{}. {}\n", i + 1, article.title));
    }
    user.push_str(
        "\nPropose a concise episode title (no date, no \"Episode N\" prefix) \
         and a one-word-or-short-phrase tone (e.g. \"measured\", \"urgent\", \
         \"upbeat\") that fits the mix of stories above.",
    );

    (system, user)
}

/// Summarizer stage: top-N titles → a one-paragraph description.
pub fn summarizer_prompt(top_n: &[AnchorArticle]) -> (String, String) {
    let system = "You write one-paragraph podcast episode descriptions. \
                  Be factual and avoid hyperbole."
        .to_string();

    let mut user = String::from("Write a 2-3 sentence description for an episode covering:\n\n");
    for article in top_n {
        user.push_str(&format!("- {}\n", article.title));
    }

    (system, user)
}

/// Framing stage: tone (+ optional listener name) → intro/outro, returned
/// as a single blob separated by a literal `---` line for `split_framing`.
pub fn framing_prompt(tone: &str, user_display_name: Option<&str>) -> (String, String) {
    let system = format!(
        "You write the intro and outro narration for a personalized news \
         podcast. Match this tone: {tone}. Keep each under 40 words."
    );

    let user = match user_display_name {
        Some(name) => format!(
            "Write an intro that greets {name} by name, then a line \
             containing only `---`, then a sign-off outro."
        ),
        None => "Write a generic intro, then a line containing only `---`, \
                 then a sign-off outro."
            .to_string(),
    };

    (system, user)
}

/// Splits a framing completion on the `---` separator line, falling back
/// to the canned strings if the model didn't follow the format.
pub fn split_framing(text: &str) -> (String, String) {
    match text.split_once("---") {
        Some((intro, outro)) => {
            let intro = intro.trim();
            let outro = outro.trim();
            if intro.is_empty() || outro.is_empty() {
                (FALLBACK_INTRO.to_string(), FALLBACK_OUTRO.to_string())
            } else {
                (intro.to_string(), outro.to_string())
            }
        }
        None => (FALLBACK_INTRO.to_string(), FALLBACK_OUTRO.to_string()),
    }
}

/// TopicBody stage: drafts one topic's paragraph within
/// `[0.85 * budget, 1.05 * budget]` words, grounded only in the supplied
/// article bodies (spec §4.5 grounding rule — no outside knowledge).
pub fn topic_body_prompt(topic: &Topic, tone: &str) -> (String, String) {
    let min_words = (topic.word_budget * 0.85).round() as i64;
    let max_words = (topic.word_budget * 1.05).round() as i64;

    let system = format!(
        "You write one segment of a news podcast script in a {tone} tone. \
         Use only the facts given below — do not add outside knowledge or \
         speculate beyond the sources. Write between {min_words} and \
         {max_words} words. Do not include a heading or bullet points, \
         write flowing narration."
    );

    let mut user = format!("Topic: {}\n\nSources:\n\n", topic.name);
    for article in &topic.articles {
        user.push_str(&format!(
            "### {}\n{}\n\n",
            article.title,
            truncate_body(&article.body)
        ));
    }

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_framing_parses_separator() {
        let text = "Hi there, welcome back.\n---\nThanks for tuning in.";
        let (intro, outro) = split_framing(text);
        assert_eq!(intro, "Hi there, welcome back.");
        assert_eq!(outro, "Thanks for tuning in.");
    }

    #[test]
    fn split_framing_falls_back_without_separator() {
        let (intro, outro) = split_framing("no separator here");
        assert_eq!(intro, FALLBACK_INTRO);
        assert_eq!(outro, FALLBACK_OUTRO);
    }

    #[test]
    fn truncate_body_caps_at_max_chars() {
        let long = "a".repeat(MAX_BODY_CHARS + 500);
        assert_eq!(truncate_body(&long).len(), MAX_BODY_CHARS);
    }
}
