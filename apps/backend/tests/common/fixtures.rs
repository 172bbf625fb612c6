//! Test fixtures and factory functions for creating test data.

use exercise_core::NewExercise;
use serde_json::{json, Value};

/// `{"<id>": "<prefix><id>"}` for every id in `ids`.
pub fn choice_map(ids: std::ops::RangeInclusive<i64>, prefix: &str) -> Value {
    let map: serde_json::Map<String, Value> = ids
        .map(|id| (id.to_string(), json!(format!("{prefix}{id}"))))
        .collect();
    Value::Object(map)
}

fn parse(value: Value) -> NewExercise {
    serde_json::from_value(value).expect("fixture must match the creation schema")
}

/// Create an order sentence request body.
pub fn order_sentence_request(term_reference: i64) -> Value {
    json!({
        "kind": "order-sentence",
        "language": "en-US",
        "term_reference": term_reference,
        "level": "A1",
        "sentence": ["I", "like", "pizza"],
        "distractors": ["like", "you", "eat"]
    })
}

pub fn order_sentence(term_reference: i64) -> NewExercise {
    parse(order_sentence_request(term_reference))
}

pub fn listen_term(term_reference: i64) -> NewExercise {
    parse(json!({
        "kind": "listen-term",
        "language": "en-US",
        "term_reference": term_reference,
        "audio_url": "https://cdn.example.com/audio/house.mp3",
        "answer": "House"
    }))
}

pub fn term_image_text_mchoice(term_reference: i64) -> NewExercise {
    parse(json!({
        "kind": "term-image-text-mchoice",
        "language": "en-US",
        "term_reference": term_reference,
        "image_url": "https://cdn.example.com/images/cat.svg",
        "answer": "cat",
        "distractors": choice_map(100..=105, "animal")
    }))
}

/// Term connection with connections 1..=8 and distractors 101..=116.
pub fn term_connection(term_reference: i64) -> NewExercise {
    parse(json!({
        "kind": "term-connection",
        "language": "en-US",
        "term_reference": term_reference,
        "content": "dog",
        "connections": choice_map(1..=8, "related"),
        "distractors": choice_map(101..=116, "unrelated")
    }))
}

pub fn speak_sentence(term_reference: i64) -> NewExercise {
    parse(json!({
        "kind": "speak-sentence",
        "language": "en-US",
        "term_reference": term_reference,
        "audio_url": "https://cdn.example.com/audio/pizza.mp3",
        "phonetic": "aɪ laɪk ˈpiːtsə",
        "answer": "I like pizza"
    }))
}

/// Create a check request body.
pub fn check_request(answer: Value) -> Value {
    json!({
        "time_to_answer": 4.2,
        "answer": answer,
        "device": "test"
    })
}

/// Mono 16-bit PCM WAV of `seconds` seconds of silence at 16 kHz.
pub fn wav_silence(seconds: f64) -> Vec<u8> {
    wav(1, 1, 16, 16_000, (16_000.0 * seconds) as u32)
}

pub fn wav(format: u16, channels: u16, bits: u16, sample_rate: u32, frames: u32) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let data_len = frames * block_align as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&format.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(out.len() + data_len as usize, 0);
    out
}

/// Generate a term reference unlikely to collide with other test runs.
pub fn unique_term_reference() -> i64 {
    let id = uuid::Uuid::new_v4().as_u128();
    (id % 1_000_000_000_000) as i64
}
