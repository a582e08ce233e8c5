//! Property-based tests for record reassembly.
//!
//! However a stream body is split into chunks, the reassembler must emit
//! the same records, in order, byte for byte.

use edc_stream::parser::{find_record, Reassembler, CLOSE_MARKER, OPEN_MARKER};
use proptest::prelude::*;

mod generators;

use generators::{split_at, stream_body, SyntheticActivity};

fn reassemble(chunks: &[Vec<u8>]) -> (Vec<Vec<u8>>, Reassembler) {
    let mut reassembler = Reassembler::new();
    let mut records = Vec::new();
    for chunk in chunks {
        for record in reassembler.feed(chunk).records {
            records.push(record.as_bytes().to_vec());
        }
    }
    (records, reassembler)
}

fn expected_records(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|n| SyntheticActivity::new(n).to_xml().into_bytes())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Any split of a stream body yields exactly the records it was built from.
    #[test]
    fn arbitrary_splits_yield_every_record(
        count in 1usize..6,
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..40),
    ) {
        let body = stream_body(count).into_bytes();
        let offsets: Vec<usize> = cuts.iter().map(|c| c.index(body.len() + 1)).collect();

        let (records, reassembler) = reassemble(&split_at(&body, &offsets));

        prop_assert_eq!(records, expected_records(count));
        prop_assert_eq!(reassembler.buffered_len(), 0);
    }

    /// Cuts landing inside the open and close markers are handled.
    #[test]
    fn splits_inside_markers(open_cut in 1usize..6, close_cut in 1usize..8) {
        let body = stream_body(2).into_bytes();
        let close = body.windows(CLOSE_MARKER.len()).position(|w| w == CLOSE_MARKER).unwrap();
        let second_open = close + CLOSE_MARKER.len();
        prop_assert!(body[second_open..].starts_with(OPEN_MARKER));

        let offsets = [close + close_cut, second_open + open_cut.min(OPEN_MARKER.len() - 1)];
        let (records, _) = reassemble(&split_at(&body, &offsets));

        prop_assert_eq!(records, expected_records(2));
    }

    /// Feeding one byte at a time matches feeding the whole body at once.
    #[test]
    fn byte_at_a_time_matches_single_chunk(count in 1usize..4) {
        let body = stream_body(count).into_bytes();
        let single = reassemble(&[body.clone()]).0;
        let bytes: Vec<Vec<u8>> = body.iter().map(|b| vec![*b]).collect();

        prop_assert_eq!(reassemble(&bytes).0, single);
    }

    /// A record prefix is retained untouched until the record completes.
    #[test]
    fn incomplete_record_is_retained(cut in any::<prop::sample::Index>()) {
        let record = SyntheticActivity::new(0).to_xml().into_bytes();
        let cut = 1 + cut.index(record.len() - 1);

        let mut reassembler = Reassembler::new();
        let feed = reassembler.feed(&record[..cut]);
        prop_assert!(feed.records.is_empty());
        prop_assert_eq!(reassembler.buffered(), &record[..cut]);

        let feed = reassembler.feed(&record[cut..]);
        prop_assert_eq!(feed.records.len(), 1);
        prop_assert_eq!(feed.records[0].as_bytes(), &record[..]);
    }

    /// Text before a record is skipped and never merged into it.
    #[test]
    fn leading_noise_is_skipped(noise in "[a-z0-9 ]{0,40}") {
        let record = SyntheticActivity::new(3).to_xml();
        let body = format!("{noise}{record}").into_bytes();

        let (records, reassembler) = reassemble(&[body]);
        prop_assert_eq!(records, vec![record.into_bytes()]);
        prop_assert_eq!(reassembler.buffered_len(), 0);
    }

    /// Arbitrary bytes never panic, and every emitted record is a full span.
    #[test]
    fn arbitrary_bytes_never_panic(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32),
    ) {
        let (records, _) = reassemble(&chunks);
        for record in records {
            prop_assert!(record.starts_with(OPEN_MARKER));
            prop_assert!(record.ends_with(CLOSE_MARKER));
            prop_assert_eq!(find_record(&record), Some(0..record.len()));
        }
    }
}
