//! Cue-word sentiment for the text surrounding a brand mention.

use citescope_core::{DetectorConfig, Sentiment};

/// Classify the sentiment of `text` by counting lexicon cues.
///
/// Positive when positive cues outnumber negative ones, negative for the
/// reverse, neutral on a tie (including no cues at all). Multi-word cues
/// such as `"top choice"` match as whole-word phrases.
#[must_use]
pub fn classify_sentiment(text: &str, config: &DetectorConfig) -> Sentiment {
    let words = tokenize(text);
    let positive = count_cues(&words, &config.positive_cues);
    let negative = count_cues(&words, &config.negative_cues);

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn count_cues(words: &[String], cues: &[String]) -> usize {
    cues.iter()
        .map(|cue| {
            let phrase: Vec<String> = tokenize(cue);
            if phrase.is_empty() || phrase.len() > words.len() {
                return 0;
            }
            words
                .windows(phrase.len())
                .filter(|window| *window == phrase.as_slice())
                .count()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DetectorConfig {
        DetectorConfig::default()
    }

    #[test]
    fn empty_text_is_neutral() {
        assert_eq!(classify_sentiment("", &config()), Sentiment::Neutral);
    }

    #[test]
    fn unknown_text_is_neutral() {
        assert_eq!(
            classify_sentiment("the quick brown fox", &config()),
            Sentiment::Neutral
        );
    }

    #[test]
    fn positive_cue_wins() {
        assert_eq!(
            classify_sentiment("Soldier Data is the best tool here", &config()),
            Sentiment::Positive
        );
    }

    #[test]
    fn negative_cue_wins() {
        assert_eq!(
            classify_sentiment("It is expensive and complicated.", &config()),
            Sentiment::Negative
        );
    }

    #[test]
    fn tie_is_neutral() {
        assert_eq!(
            classify_sentiment("excellent reports but expensive plans", &config()),
            Sentiment::Neutral
        );
    }

    #[test]
    fn multi_word_cue_matches_as_phrase() {
        assert_eq!(
            classify_sentiment("Many call it a Top Choice.", &config()),
            Sentiment::Positive
        );
        assert_eq!(
            classify_sentiment("It is worse than the rest", &config()),
            Sentiment::Negative
        );
    }

    #[test]
    fn cue_inside_longer_word_does_not_count() {
        // "slowly" must not count as "slow"
        assert_eq!(
            classify_sentiment("pages load slowly", &config()),
            Sentiment::Neutral
        );
    }

    #[test]
    fn punctuation_stripped_from_words() {
        assert_eq!(classify_sentiment("best!", &config()), Sentiment::Positive);
    }
}
