// src/services/dataset.rs
//! Extraction of a post and its interactions from scraper dataset items.
//!
//! Actors differ in output shape. Two layouts are recognized:
//! post-shaped items carrying `comments` / `reactions` / `likes` arrays, and
//! flat interaction-shaped items, one per like or comment.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::InteractionType;

const NAME_KEYS: &[&str] = &["name", "fullName", "full_name", "authorName", "actorName"];
const HEADLINE_KEYS: &[&str] = &[
    "headline",
    "occupation",
    "authorHeadline",
    "actorHeadline",
    "title",
    "subtitle",
];
const PROFILE_URL_KEYS: &[&str] = &[
    "profileUrl",
    "profile_url",
    "authorProfileUrl",
    "actorProfileUrl",
    "linkedinUrl",
];
/// Path marker of a LinkedIn member profile
const PROFILE_PATH: &str = "/in/";
const URN_KEYS: &[&str] = &["urn", "profileUrn", "authorUrn", "actorUrn", "profileId"];
const ACTOR_OBJECT_KEYS: &[&str] = &["actor", "author", "profile", "user", "reactor"];
const COMMENT_TEXT_KEYS: &[&str] = &["commentText", "comment", "text", "content"];
const TIME_KEYS: &[&str] = &["createdAt", "reactedAt", "postedAt", "timestamp", "date"];

const POST_TEXT_KEYS: &[&str] = &["postText", "postContent", "text", "content"];
const POST_AUTHOR_KEYS: &[&str] = &["postAuthor", "authorName", "author"];
const POST_TIME_KEYS: &[&str] = &["postedAt", "postedAtISO", "postDate", "publishedAt"];

/// One like or comment with its actor
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedInteraction {
    pub interaction_type: InteractionType,
    pub actor_key: String,
    pub name: Option<String>,
    pub headline: Option<String>,
    pub profile_url: Option<String>,
    pub urn: Option<String>,
    pub content: Option<String>,
    pub reacted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPost {
    pub text: Option<String>,
    pub author_name: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub interactions: Vec<ScrapedInteraction>,
}

impl ScrapedPost {
    pub fn comment_count(&self) -> i64 {
        self.count(InteractionType::Comment)
    }

    pub fn like_count(&self) -> i64 {
        self.count(InteractionType::Like)
    }

    fn count(&self, kind: InteractionType) -> i64 {
        self.interactions
            .iter()
            .filter(|i| i.interaction_type == kind)
            .count() as i64
    }
}

/// Build a post from dataset items. Later duplicates of the same (type, actor) are dropped.
pub fn extract_post(items: &[Value]) -> ScrapedPost {
    let mut post = ScrapedPost::default();
    let mut seen: HashSet<(InteractionType, String)> = HashSet::new();
    let mut skipped = 0usize;

    let mut push = |post: &mut ScrapedPost, interaction: Option<ScrapedInteraction>| match interaction {
        Some(i) => {
            if seen.insert((i.interaction_type, i.actor_key.clone())) {
                post.interactions.push(i);
            }
        }
        None => skipped += 1,
    };

    for item in items {
        let Some(obj) = item.as_object() else {
            continue;
        };

        if is_post_shaped(obj) {
            fill_post_metadata(&mut post, obj, POST_TEXT_KEYS);
            for comment in array(obj, "comments") {
                push(&mut post, interaction_from(comment, InteractionType::Comment));
            }
            for key in ["reactions", "likes"] {
                for like in array(obj, key) {
                    push(&mut post, interaction_from(like, InteractionType::Like));
                }
            }
        } else {
            // Flat items may repeat the post fields, but never under `text`, which is the comment.
            fill_post_metadata(&mut post, obj, &["postText", "postContent"]);
            let kind = detect_type(obj);
            push(&mut post, interaction_from(item, kind));
        }
    }

    if skipped > 0 {
        warn!("Skipped {} dataset entries without actor identity", skipped);
    }
    debug!(
        "Extracted {} interactions ({} comments, {} likes)",
        post.interactions.len(),
        post.comment_count(),
        post.like_count()
    );
    post
}

fn is_post_shaped(obj: &Map<String, Value>) -> bool {
    ["comments", "reactions", "likes"]
        .iter()
        .any(|key| obj.get(*key).map(Value::is_array).unwrap_or(false))
}

fn array<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn fill_post_metadata(post: &mut ScrapedPost, obj: &Map<String, Value>, text_keys: &[&str]) {
    if post.text.is_none() {
        post.text = first_str(obj, text_keys);
    }
    if post.author_name.is_none() {
        post.author_name = first_str(obj, POST_AUTHOR_KEYS).or_else(|| {
            obj.get("author")
                .and_then(Value::as_object)
                .and_then(|author| first_str(author, NAME_KEYS))
        });
    }
    if post.posted_at.is_none() {
        post.posted_at = first_time(obj, POST_TIME_KEYS);
    }
}

fn detect_type(obj: &Map<String, Value>) -> InteractionType {
    let declared = first_str(obj, &["type", "interactionType"]).map(|s| s.to_uppercase());
    match declared.as_deref() {
        Some(t) if t.contains("COMMENT") => InteractionType::Comment,
        Some(t) if t.contains("LIKE") || t.contains("REACTION") => InteractionType::Like,
        _ if obj.contains_key("reactionType") => InteractionType::Like,
        _ if first_str(obj, &["commentText", "comment", "text"]).is_some() => {
            InteractionType::Comment
        }
        _ => InteractionType::Like,
    }
}

/// Actor identity: URN, else profile URL, else name
fn interaction_from(value: &Value, kind: InteractionType) -> Option<ScrapedInteraction> {
    let obj = value.as_object()?;
    let nested = ACTOR_OBJECT_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_object));
    let actor = nested.unwrap_or(obj);

    let lookup = |keys: &[&str]| first_str(actor, keys).or_else(|| first_str(obj, keys));

    let name = lookup(NAME_KEYS);
    let headline = lookup(HEADLINE_KEYS);
    let urn = lookup(URN_KEYS);
    // A bare `url` names the post or comment unless it sits on the actor and points at a profile
    let profile_url = lookup(PROFILE_URL_KEYS).or_else(|| {
        nested
            .and_then(|actor| first_str(actor, &["url"]))
            .filter(|url| url.contains(PROFILE_PATH))
    });

    let actor_key = urn
        .clone()
        .or_else(|| profile_url.clone())
        .or_else(|| name.clone())?;

    let content = match kind {
        InteractionType::Comment => first_str(obj, COMMENT_TEXT_KEYS),
        InteractionType::Like => None,
    };

    Some(ScrapedInteraction {
        interaction_type: kind,
        actor_key,
        name,
        headline,
        profile_url,
        urn,
        content,
        reacted_at: first_time(obj, TIME_KEYS),
    })
}

fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn first_time(obj: &Map<String, Value>, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|key| obj.get(*key).and_then(parse_time))
}

/// RFC 3339 strings, `YYYY-MM-DD HH:MM:SS`, or epoch seconds/milliseconds
pub fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw > 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}
