// Block sources: raw chunking, member delimiting, signature scanning, fallbacks.

mod common;

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use gzblock_core::compression::{compress_member, decode_members};
    use gzblock_core::headers::MemberHeader;
    use gzblock_core::stream::source::{BlockSource, MemberSource, RawChunkSource, SignatureScanner};
    use gzblock_core::types::StreamError;

    use crate::common::{foreign_gzip, noise, text};

    fn drain(source: &dyn BlockSource) -> Vec<(u64, Vec<u8>)> {
        let mut out = Vec::new();
        while let Some(block) = source.produce_next_block().unwrap() {
            out.push((block.index, block.payload.to_vec()));
        }
        out
    }

    fn member_source(bytes: Vec<u8>, window: usize, max_fallback: usize) -> MemberSource {
        let len = bytes.len() as u64;
        MemberSource::new(Box::new(Cursor::new(bytes)), window, max_fallback, Some(len))
    }

    // ------------------------------------------------------------
    // RawChunkSource
    // ------------------------------------------------------------
    #[test]
    fn raw_chunks_have_sequential_indices() {
        let data = text(10);
        let src = RawChunkSource::new(Box::new(Cursor::new(data.clone())), 4, Some(10));

        let blocks = drain(&src);
        let sizes: Vec<usize> = blocks.iter().map(|(_, b)| b.len()).collect();
        let indices: Vec<u64> = blocks.iter().map(|(i, _)| *i).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(src.bytes_provided(), 10);
        assert_eq!(src.bytes_total(), Some(10));

        // Exhausted sources stay exhausted.
        assert!(src.produce_next_block().unwrap().is_none());
    }

    #[test]
    fn raw_exact_multiple_ends_cleanly() {
        let src = RawChunkSource::new(Box::new(Cursor::new(text(8))), 4, None);
        assert_eq!(drain(&src).len(), 2);
        assert_eq!(src.bytes_total(), None);
    }

    #[test]
    fn concurrent_callers_get_distinct_increasing_indices() {
        let src = Arc::new(RawChunkSource::new(Box::new(Cursor::new(noise(64 * 1024, 7))), 256, None));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let src = src.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(block) = src.produce_next_block().unwrap() {
                        seen.push(block.index);
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for h in handles {
            let seen = h.join().unwrap();
            assert!(seen.windows(2).all(|w| w[0] < w[1]), "per-caller order broken: {:?}", seen);
            all.extend(seen);
        }
        all.sort_unstable();
        assert_eq!(all, (0..256).collect::<Vec<u64>>());
        assert_eq!(src.bytes_provided(), 64 * 1024);
    }

    // ------------------------------------------------------------
    // MemberSource: delimited
    // ------------------------------------------------------------
    #[test]
    fn delimited_blocks_are_whole_members() {
        let members: Vec<Vec<u8>> = [text(3000), noise(500, 3), text(1)]
            .iter()
            .map(|d| compress_member(d, 6).unwrap())
            .collect();
        let src = member_source(members.concat(), 1024, 1 << 20);

        let blocks = drain(&src);
        assert!(src.is_delimited());
        assert_eq!(blocks.len(), 3);
        for (i, (index, bytes)) in blocks.iter().enumerate() {
            assert_eq!(*index, i as u64);
            assert_eq!(bytes, &members[i]);
        }
        assert_eq!(src.bytes_provided(), members.concat().len() as u64);
    }

    #[test]
    fn declared_size_below_header_is_malformed() {
        let mut header = MemberHeader::default();
        header.set_member_size(5).unwrap();
        let mut wire = header.into_bytes();
        wire.extend_from_slice(&[0u8; 32]);

        let err = member_source(wire, 1024, 1 << 20).produce_next_block().unwrap_err();
        assert!(matches!(err, StreamError::MalformedHeader(_)), "{:?}", err);
    }

    #[test]
    fn truncated_member_is_a_read_failure() {
        let mut member = compress_member(&text(4000), 6).unwrap();
        member.truncate(member.len() - 5);

        let err = member_source(member, 1024, 1 << 20).produce_next_block().unwrap_err();
        assert!(matches!(err, StreamError::SourceReadFailure(_)), "{:?}", err);
    }

    #[test]
    fn garbage_input_is_malformed() {
        let err = member_source(b"definitely not gzip".to_vec(), 1024, 1 << 20)
            .produce_next_block()
            .unwrap_err();
        assert!(matches!(err, StreamError::MalformedHeader(_)));
    }

    // ------------------------------------------------------------
    // MemberSource: scanning and tail
    // ------------------------------------------------------------
    #[test]
    fn foreign_members_are_scanned() {
        let parts = [text(5000), text(7000)];
        let wire: Vec<u8> = parts.iter().flat_map(|p| foreign_gzip(p)).collect();
        let src = member_source(wire.clone(), 64, 1 << 20);

        let blocks: Vec<Vec<u8>> = drain(&src).into_iter().map(|(_, b)| b).collect();
        assert!(!src.is_delimited());
        assert!(blocks.len() >= 2);
        assert!(blocks.iter().all(|b| b.len() <= 1 << 20));
        // Blocks partition the input, whatever the cut points.
        assert_eq!(blocks.concat(), wire);
        assert_eq!(decode_members(&blocks.concat()).unwrap(), parts.concat());
    }

    #[test]
    fn scanning_respects_the_block_cap() {
        let wire = foreign_gzip(&noise(10_000, 11));
        let src = member_source(wire.clone(), 512, 2048);

        let blocks: Vec<Vec<u8>> = drain(&src).into_iter().map(|(_, b)| b).collect();
        assert!(blocks.iter().all(|b| b.len() <= 2048));
        assert_eq!(blocks.concat(), wire);
    }

    #[test]
    fn scanned_blocks_stay_near_the_window_under_a_large_limit() {
        let wire = foreign_gzip(&noise(3 << 20, 5));
        let src = member_source(wire.clone(), 1024, 512 << 20);
        assert_eq!(src.scan_cap(), 4096);

        let blocks: Vec<Vec<u8>> = drain(&src).into_iter().map(|(_, b)| b).collect();
        assert!(blocks.len() > 1);
        assert!(blocks.iter().all(|b| b.len() <= 4096), "largest {}", blocks.iter().map(Vec::len).max().unwrap());
        assert_eq!(blocks.concat(), wire);
    }

    #[test]
    fn declared_size_may_exceed_the_fallback_limit() {
        let member = compress_member(&noise(4096, 3), 9).unwrap();
        assert!(member.len() > 4096);

        let blocks = drain(&member_source(member.clone(), 4096, 4096));
        assert_eq!(blocks, vec![(0, member)]);
    }

    #[test]
    fn opaque_extra_field_is_scanned() {
        let data = text(5000);
        let mut wire = foreign_gzip(&data);
        wire[3] |= 0x04;
        wire.splice(10..10, [3, 0, b'a', b'b', b'c']);

        let src = member_source(wire.clone(), 256, 1 << 20);
        let blocks: Vec<Vec<u8>> = drain(&src).into_iter().map(|(_, b)| b).collect();
        assert!(!src.is_delimited());
        assert_eq!(blocks.concat(), wire);
    }

    #[test]
    fn untagged_member_after_tagged_becomes_tail() {
        let first = compress_member(&text(2000), 6).unwrap();
        let second = compress_member(&text(100), 6).unwrap();
        let tail: Vec<u8> = [foreign_gzip(&text(300)), foreign_gzip(&text(400))].concat();
        let wire = [first.clone(), second.clone(), tail.clone()].concat();

        let blocks = drain(&member_source(wire, 1024, 1 << 20));
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].1, first);
        assert_eq!(blocks[1].1, second);
        assert_eq!(blocks[2], (2, tail));
    }

    #[test]
    fn oversized_tail_is_unsupported() {
        let first = compress_member(&text(50), 6).unwrap();
        assert!(first.len() < 200);
        let wire = [first, foreign_gzip(&noise(2000, 5))].concat();

        let src = member_source(wire, 1024, 200);
        assert!(src.produce_next_block().unwrap().is_some());
        let err = src.produce_next_block().unwrap_err();
        assert!(matches!(err, StreamError::UnsupportedFallback(_)), "{:?}", err);
    }

    // ------------------------------------------------------------
    // SignatureScanner
    // ------------------------------------------------------------
    const SIG: [u8; 3] = [0x1f, 0x8b, 0x08];

    fn segment() -> impl Strategy<Value = Vec<u8>> {
        // Payload bytes below 0x1f can never start a signature.
        proptest::collection::vec(0u8..0x1f, 0..40).prop_map(|body| [&SIG[..], &body].concat())
    }

    proptest! {
        #[test]
        fn scanner_cuts_exactly_at_signatures(
            segments in proptest::collection::vec(segment(), 1..8),
            window in 1usize..16,
        ) {
            let mut r = Cursor::new(segments.concat());
            let mut scanner = SignatureScanner::new(Vec::new(), window, usize::MAX);

            let mut got = Vec::new();
            while let Some(block) = scanner.next_block(&mut r).unwrap() {
                got.push(block);
            }
            prop_assert_eq!(got, segments);
        }

        #[test]
        fn scanner_never_exceeds_cap(
            data in proptest::collection::vec(any::<u8>(), 1..400),
            window in 1usize..32,
            cap in 1usize..64,
        ) {
            let mut r = Cursor::new(data.clone());
            let mut scanner = SignatureScanner::new(Vec::new(), window, cap);

            let mut got = Vec::new();
            while let Some(block) = scanner.next_block(&mut r).unwrap() {
                prop_assert!(!block.is_empty() && block.len() <= cap);
                got.push(block);
            }
            prop_assert_eq!(got.concat(), data);
        }
    }

    #[test]
    fn seed_bytes_lead_the_first_block() {
        let mut r = Cursor::new(vec![0xaa, 0x1f, 0x8b, 0x08, 0xbb]);
        let mut scanner = SignatureScanner::new(SIG.to_vec(), 2, usize::MAX);
        assert_eq!(scanner.next_block(&mut r).unwrap().unwrap(), vec![0x1f, 0x8b, 0x08, 0xaa]);
        assert_eq!(scanner.next_block(&mut r).unwrap().unwrap(), vec![0x1f, 0x8b, 0x08, 0xbb]);
        assert!(scanner.next_block(&mut r).unwrap().is_none());
    }
}
