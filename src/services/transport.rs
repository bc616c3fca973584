//! Quiz transport codec.
//! Serializes a quiz into a compact URL-safe share code: embedded data-URI
//! images are externalized into a side registry, the stripped quiz is
//! JSON-serialized and Base64-encoded over raw UTF-8 bytes so non-ASCII
//! prompts survive the round trip.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::warn;
use thiserror::Error;

use crate::models::Quiz;
use crate::services::storage::Store;

/// Soft ceiling against URL length limits in common browsers and servers.
/// Advisory only, never blocking.
const SHARE_CODE_WARN_LEN: usize = 8000;

const DATA_URI_PREFIX: &str = "data:";
const LOCAL_TOKEN_PREFIX: &str = "local:";
/// Older share codes carried bare Base64 image blobs without a scheme.
const LEGACY_IMAGE_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("share payload is not a quiz document: {0}")]
    Json(#[from] serde_json::Error),
}

/// A share code plus the image registry extracted while encoding. The
/// registry must be persisted under the quiz id for `local:` tokens to
/// resolve on the receiving side.
#[derive(Debug, Clone)]
pub struct EncodedQuiz {
    pub share_code: String,
    pub registry: HashMap<String, String>,
}

/// Encodes a quiz into a share code. The input quiz is cloned, never
/// mutated; every `data:` image on a question or choice is swapped for a
/// `local:imgN` token and parked in the returned registry.
pub fn encode(quiz: &Quiz) -> Result<EncodedQuiz, TransportError> {
    let mut stripped = quiz.clone();
    let mut registry = HashMap::new();
    let mut counter: u32 = 1;

    for_each_image(&mut stripped, |slot| {
        if slot.starts_with(DATA_URI_PREFIX) {
            let token = format!("img{counter}");
            counter += 1;
            registry.insert(token.clone(), std::mem::take(slot));
            *slot = format!("{LOCAL_TOKEN_PREFIX}{token}");
        }
    });

    let json = serde_json::to_string(&stripped)?;
    let share_code = BASE64.encode(json.as_bytes());

    if share_code.len() > SHARE_CODE_WARN_LEN {
        warn!(
            "share code for quiz {} is {} chars, may exceed URL limits",
            quiz.id,
            share_code.len()
        );
    }

    Ok(EncodedQuiz {
        share_code,
        registry,
    })
}

/// Decodes a share code back into a quiz. `local:` image tokens resolve
/// through `lookup(quiz_id, img_id)`; an unresolvable image degrades to an
/// empty string rather than failing the decode. Bare schemeless image blobs
/// get the legacy jpeg data-URI prefix.
pub fn decode<F>(share_code: &str, quiz_id: &str, lookup: F) -> Result<Quiz, TransportError>
where
    F: Fn(&str, &str) -> Option<String>,
{
    let bytes = BASE64.decode(share_code.trim())?;
    let json = String::from_utf8(bytes)?;
    let mut quiz: Quiz = serde_json::from_str(&json)?;

    for_each_image(&mut quiz, |slot| {
        if let Some(img_id) = slot.strip_prefix(LOCAL_TOKEN_PREFIX) {
            match lookup(quiz_id, img_id) {
                Some(data) => *slot = data,
                None => {
                    warn!("image {img_id} for quiz {quiz_id} not in registry, dropping");
                    slot.clear();
                }
            }
        } else if !slot.is_empty()
            && !slot.starts_with(DATA_URI_PREFIX)
            && !slot.starts_with("http://")
            && !slot.starts_with("https://")
        {
            *slot = format!("{LEGACY_IMAGE_PREFIX}{slot}");
        }
    });

    Ok(quiz)
}

/// Resolves the overloaded `?quiz=` URL parameter. A share code decodes
/// against the store's image registry; anything that fails Base64/JSON is
/// the expected other encoding and falls back to a plain storage lookup.
pub fn resolve_quiz_param(param: &str, store: &Store) -> anyhow::Result<Option<Quiz>> {
    // probe for the quiz id so registry lookups key correctly
    let quiz_id = BASE64
        .decode(param.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|json| serde_json::from_str::<Quiz>(&json).ok())
        .map(|quiz| quiz.id);

    match quiz_id {
        Some(quiz_id) => {
            let quiz = decode(param, &quiz_id, |quiz_id, img_id| {
                store.image_from_registry(quiz_id, img_id).ok().flatten()
            })?;
            Ok(Some(quiz))
        }
        None => store.load_quiz(param),
    }
}

fn for_each_image<F>(quiz: &mut Quiz, mut visit: F)
where
    F: FnMut(&mut String),
{
    for question in &mut quiz.questions {
        if let Some(image) = question.image.as_mut() {
            visit(image);
        }
        for choice in &mut question.choices {
            if let Some(image) = choice.image.as_mut() {
                visit(image);
            }
        }
    }
}
