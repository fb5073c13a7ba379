// Ordered release of out-of-order blocks.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use gzblock_core::stream::reorder::ReorderBuffer;
    use gzblock_core::types::StreamError;

    #[test]
    fn releases_contiguous_runs() {
        let mut buf = ReorderBuffer::new();
        assert!(buf.push(2, "c").unwrap().is_empty());
        assert!(buf.push(1, "b").unwrap().is_empty());
        assert_eq!(buf.pending_len(), 2);
        assert_eq!(buf.first_pending(), Some(1));

        assert_eq!(buf.push(0, "a").unwrap(), vec!["a", "b", "c"]);
        assert!(buf.is_empty());
        assert_eq!(buf.next_index(), 3);
    }

    #[test]
    fn stale_index_is_rejected() {
        let mut buf = ReorderBuffer::new();
        buf.push(0, ()).unwrap();
        assert!(matches!(buf.push(0, ()), Err(StreamError::Pipeline(_))));
    }

    #[test]
    fn duplicate_pending_index_is_rejected() {
        let mut buf = ReorderBuffer::new();
        buf.push(5, 1).unwrap();
        let err = buf.push(5, 2).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert_eq!(buf.pending_len(), 1);
    }

    proptest! {
        #[test]
        fn any_arrival_order_is_released_in_order(
            order in Just((0u64..64).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let mut buf = ReorderBuffer::new();
            let mut released = Vec::new();
            for index in order {
                released.extend(buf.push(index, index).unwrap());
                // Nothing past the first gap is ever released.
                prop_assert_eq!(released.len() as u64, buf.next_index());
            }
            prop_assert_eq!(released, (0u64..64).collect::<Vec<_>>());
            prop_assert!(buf.is_empty());
        }
    }
}
