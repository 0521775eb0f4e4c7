//! Lexicon sentiment scoring.
//!
//! Each lexicon hit contributes a polarity in `[-1, 1]` and a subjectivity in
//! `[0, 1]`; the text score is the mean over hits. A preceding intensifier
//! scales the hit, a negation within two tokens flips and halves polarity.

const LEXICON: &[(&str, f32, f32)] = &[
    ("amazing", 0.6, 0.9),
    ("angry", -0.5, 1.0),
    ("annoying", -0.8, 0.9),
    ("awesome", 1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("bad", -0.7, 0.67),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("broken", -0.4, 0.4),
    ("confusing", -0.3, 0.7),
    ("difficult", -0.5, 1.0),
    ("disappointed", -0.75, 0.75),
    ("easy", 0.43, 0.83),
    ("excellent", 1.0, 1.0),
    ("expensive", -0.5, 0.7),
    ("fantastic", 0.4, 0.9),
    ("fast", 0.2, 0.6),
    ("fine", 0.42, 0.5),
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("happy", 0.8, 1.0),
    ("hate", -0.8, 0.9),
    ("helpful", 0.5, 0.5),
    ("horrible", -1.0, 1.0),
    ("interesting", 0.5, 0.5),
    ("like", 0.2, 0.4),
    ("love", 0.5, 0.6),
    ("nice", 0.6, 1.0),
    ("perfect", 1.0, 1.0),
    ("poor", -0.4, 0.6),
    ("problem", -0.3, 0.4),
    ("reliable", 0.5, 0.5),
    ("sad", -0.5, 1.0),
    ("slow", -0.3, 0.4),
    ("terrible", -1.0, 1.0),
    ("thanks", 0.2, 0.2),
    ("unhappy", -0.6, 0.9),
    ("useful", 0.3, 0.0),
    ("useless", -0.5, 0.2),
    ("worst", -1.0, 1.0),
    ("wrong", -0.5, 0.9),
];

const INTENSIFIERS: &[(&str, f32)] = &[
    ("extremely", 1.5),
    ("quite", 1.1),
    ("really", 1.3),
    ("slightly", 0.5),
    ("so", 1.2),
    ("very", 1.3),
];

const NEGATIONS: &[&str] = &["never", "no", "not", "nothing", "dont", "isnt", "wasnt"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sentiment {
    pub polarity: f32,
    pub subjectivity: f32,
}

impl Sentiment {
    const NEUTRAL: Self = Self {
        polarity: 0.0,
        subjectivity: 0.0,
    };
}

pub(crate) fn analyze(text: &str) -> Sentiment {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase().replace('\'', ""))
        .collect();

    let mut polarity_sum = 0.0f32;
    let mut subjectivity_sum = 0.0f32;
    let mut hits = 0u32;
    for (idx, token) in tokens.iter().enumerate() {
        let Some(&(_, mut polarity, mut subjectivity)) =
            LEXICON.iter().find(|(word, _, _)| word == token)
        else {
            continue;
        };
        if let Some(prev) = idx.checked_sub(1).map(|i| tokens[i].as_str())
            && let Some(&(_, factor)) = INTENSIFIERS.iter().find(|(word, _)| *word == prev)
        {
            polarity = (polarity * factor).clamp(-1.0, 1.0);
            subjectivity = (subjectivity * factor).clamp(0.0, 1.0);
        }
        let window = &tokens[idx.saturating_sub(2)..idx];
        if window.iter().any(|word| NEGATIONS.contains(&word.as_str())) {
            polarity *= -0.5;
        }
        polarity_sum += polarity;
        subjectivity_sum += subjectivity;
        hits += 1;
    }
    if hits == 0 {
        return Sentiment::NEUTRAL;
    }
    let polarity = polarity_sum / hits as f32;
    let subjectivity = subjectivity_sum / hits as f32;
    if !polarity.is_finite() || !subjectivity.is_finite() {
        return Sentiment::NEUTRAL;
    }
    Sentiment {
        polarity: polarity.clamp(-1.0, 1.0),
        subjectivity: subjectivity.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicon_is_sorted() {
        assert!(LEXICON.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn neutral_text_scores_zero() {
        assert_eq!(analyze("what is the price"), Sentiment::NEUTRAL);
        assert_eq!(analyze(""), Sentiment::NEUTRAL);
    }

    #[test]
    fn positive_and_negative_words_move_polarity() {
        assert!(analyze("this is great").polarity > 0.5);
        assert!(analyze("the app is terrible").polarity < -0.5);
    }

    #[test]
    fn negation_flips_polarity() {
        let plain = analyze("good service");
        let negated = analyze("not good service");
        assert!(plain.polarity > 0.0);
        assert!(negated.polarity < 0.0);
        assert_eq!(plain.subjectivity, negated.subjectivity);
    }

    #[test]
    fn intensifier_is_clamped() {
        let score = analyze("extremely excellent");
        assert_eq!(score.polarity, 1.0);
        assert_eq!(score.subjectivity, 1.0);
    }
}
