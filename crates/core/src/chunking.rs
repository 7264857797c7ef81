use crate::error::IngestError;
use crate::models::IngestionOptions;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&IngestionOptions::default())
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
            min_chars: value.min_chunk_chars,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than window {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub start: usize,
    pub text: String,
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn chunk_spans(text: &str, config: ChunkingConfig) -> Result<Vec<TextSpan>, IngestError> {
    config.validate()?;

    let normalized = normalize_whitespace(text);
    let chars: Vec<char> = normalized.chars().collect();
    let stride = config.stride();

    let mut spans = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + config.max_chars).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();

        if trimmed.chars().count() > config.min_chars {
            spans.push(TextSpan {
                start,
                text: trimmed.to_string(),
            });
        }

        start += stride;
    }

    Ok(spans)
}

pub fn chunk_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    Ok(chunk_spans(text, config)?
        .into_iter()
        .map(|span| span.text)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(words: usize) -> String {
        (0..words)
            .map(|index| format!("word{index}\n\t"))
            .collect::<String>()
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "  A  \t  lot\nof   spacing \u{a0} ";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() -> Result<(), IngestError> {
        assert!(chunk_text("", ChunkingConfig::default())?.is_empty());
        assert!(chunk_text(" \n\t ", ChunkingConfig::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn short_text_below_minimum_is_dropped() -> Result<(), IngestError> {
        let exactly_fifty = "x".repeat(50);
        assert!(chunk_text(&exactly_fifty, ChunkingConfig::default())?.is_empty());

        let fifty_one = "x".repeat(51);
        assert_eq!(chunk_text(&fifty_one, ChunkingConfig::default())?, vec![fifty_one]);
        Ok(())
    }

    #[test]
    fn windows_use_stride_and_overlap() -> Result<(), IngestError> {
        let text = "a".repeat(4_000);
        let spans = chunk_spans(&text, ChunkingConfig::default())?;

        let starts = spans.iter().map(|span| span.start).collect::<Vec<_>>();
        assert_eq!(starts, vec![0, 1_800, 3_600]);
        assert_eq!(spans[0].text.chars().count(), 2_000);
        assert_eq!(spans[1].text.chars().count(), 2_000);
        assert_eq!(spans[2].text.chars().count(), 400);
        Ok(())
    }

    #[test]
    fn short_tail_window_is_dropped() -> Result<(), IngestError> {
        let text = "b".repeat(1_830);
        let spans = chunk_spans(&text, ChunkingConfig::default())?;
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        Ok(())
    }

    #[test]
    fn chunking_is_deterministic_and_ordered() -> Result<(), IngestError> {
        let text = sample_text(3_000);
        let first = chunk_spans(&text, ChunkingConfig::default())?;
        let second = chunk_spans(&text, ChunkingConfig::default())?;

        assert_eq!(first, second);
        assert!(first.len() > 2);
        assert!(first.windows(2).all(|pair| pair[0].start < pair[1].start));
        assert!(first.iter().all(|span| span.text.trim().chars().count() > 50));
        Ok(())
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() -> Result<(), IngestError> {
        let text = "投标文件".repeat(1_000);
        let chunks = chunk_text(&text, ChunkingConfig::default())?;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 2_000);
        Ok(())
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let config = ChunkingConfig {
            max_chars: 100,
            overlap_chars: 100,
            min_chars: 10,
        };
        assert!(matches!(
            chunk_text("anything", config),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }
}
