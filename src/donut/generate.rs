//! Greedy sequence generation
//!
//! The decoding loop is independent of the inference runtime: callers supply
//! a closure that maps the current token sequence to next-token logits.

/// Stopping and filtering rules for a generation pass
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Upper bound on the total sequence length, prompt included
    pub max_length: usize,
    /// Generation stops once this token is produced
    pub eos_token_id: i64,
    /// Tokens that are never selected (the unknown token, for Donut)
    pub banned_token_ids: Vec<i64>,
}

/// Extend `prompt` one token at a time, always picking the highest scoring
/// token that is not banned.
///
/// The returned sequence includes the prompt and, when generation stopped on
/// it, the EOS token.
pub fn greedy_decode<F, E>(
    prompt: &[i64],
    params: &GenerationParams,
    mut next_token_logits: F,
) -> Result<Vec<i64>, E>
where
    F: FnMut(&[i64]) -> Result<Vec<f32>, E>,
{
    let mut sequence = prompt.to_vec();

    while sequence.len() < params.max_length {
        let logits = next_token_logits(&sequence)?;

        let Some(next) = argmax_excluding(&logits, &params.banned_token_ids) else {
            break;
        };

        sequence.push(next);
        if next == params.eos_token_id {
            break;
        }
    }

    Ok(sequence)
}

/// Index of the largest logit, skipping banned ids and NaN scores
pub fn argmax_excluding(logits: &[f32], banned: &[i64]) -> Option<i64> {
    let mut best: Option<(i64, f32)> = None;

    for (index, &score) in logits.iter().enumerate() {
        let id = index as i64;
        if score.is_nan() || banned.contains(&id) {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((id, score)),
        }
    }

    best.map(|(id, _)| id)
}
