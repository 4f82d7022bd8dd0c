//! Integration tests for tokenizer-safe chunking.

use pdf_pii::chunking::{chunk, Chunk, ChunkerConfig, Delimiter, TextChunker};
use proptest::prelude::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn single_block(text: &str) -> Vec<Vec<String>> {
    vec![vec![text.to_string()]]
}

#[test]
fn test_period_delimited_chunks() {
    init();
    let config = ChunkerConfig::new(10, 4096).with_delimiter(Delimiter::Text(".".into()));
    let chunks: Vec<Chunk> = chunk(&single_block("AAAAA.BBBBB.CCCCC."), &config).collect();

    assert_eq!(
        chunks,
        vec![
            Chunk { text: "AAAAA.".into(), base_offset: 0 },
            Chunk { text: "BBBBB.".into(), base_offset: 6 },
            Chunk { text: "CCCCC.".into(), base_offset: 12 },
        ]
    );
}

#[test]
fn test_blocks_across_pages_share_one_offset_space() {
    init();
    let blocks = vec![
        vec!["Page one. ".to_string(), "Second block.".to_string()],
        vec![],
        vec!["Page three.".to_string()],
    ];
    let config = ChunkerConfig::new(15, 4096);
    let chunks: Vec<Chunk> = chunk(&blocks, &config).collect();

    let offsets: Vec<usize> = chunks.iter().map(|c| c.base_offset).collect();
    assert_eq!(offsets, vec![0, 10, 23]);
    assert_eq!(chunks[2].text, "Page three.");
}

#[test]
fn test_byte_ceiling_with_safety_margin() {
    init();
    // 1024 + 9 bytes: three 3-byte characters per chunk after the margin
    let config = ChunkerConfig::new(1000, 1033);
    let chunks: Vec<Chunk> = chunk(&single_block("個人情報保護法"), &config).collect();
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["個人情", "報保護", "法"]);
}

#[test]
fn test_giant_block_without_delimiters_terminates() {
    init();
    let text = "x".repeat(10_000);
    let config = ChunkerConfig::new(7, 4096).with_delimiter(Delimiter::Text("\n".into()));
    let chunker = TextChunker::new(&single_block(&text), &config);
    let chunks: Vec<Chunk> = chunker.chunks().collect();
    assert_eq!(chunks.len(), 10_000usize.div_ceil(7));
    assert_eq!(chunks.last().map(Chunk::char_len), Some(10_000 % 7));
}

fn blocks_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[a-z .é東]{0,15}", 0..5), 0..4)
}

proptest! {
    #[test]
    fn prop_chunks_partition_the_canonical_text(
        blocks in blocks_strategy(),
        max_chars in 1usize..20,
        max_bytes in 4usize..40,
        use_period in any::<bool>(),
    ) {
        let mut config = ChunkerConfig::new(max_chars, max_bytes).with_byte_safety_margin(0);
        if use_period {
            config = config.with_delimiter(Delimiter::Text(".".into()));
        }
        let canonical: String = blocks.iter().flatten().map(String::as_str).collect();
        let chunks: Vec<Chunk> = chunk(&blocks, &config).collect();

        let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
        prop_assert_eq!(&rebuilt, &canonical);

        let mut expected_base = 0;
        for c in &chunks {
            prop_assert!(!c.text.is_empty());
            prop_assert_eq!(c.base_offset, expected_base);
            prop_assert!(c.char_len() <= max_chars);
            prop_assert!(c.text.len() <= max_bytes);
            expected_base += c.char_len();
        }
    }

    #[test]
    fn prop_chunk_char_maps_to_canonical_offset(
        blocks in blocks_strategy(),
        max_chars in 1usize..12,
    ) {
        let canonical: Vec<char> = blocks.iter().flatten().flat_map(|b| b.chars()).collect();
        let config = ChunkerConfig::new(max_chars, 4096);
        for c in chunk(&blocks, &config) {
            for (i, ch) in c.text.chars().enumerate() {
                prop_assert_eq!(canonical[c.base_offset + i], ch);
            }
        }
    }
}
