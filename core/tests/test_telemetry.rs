mod common;

#[cfg(test)]
mod telemetry_snapshot_tests {
    use std::time::Duration;

    use gzblock_core::stream::{compress_stream, decompress_stream, DecodeStrategy, InputSource, Mode, OutputSink};
    use gzblock_core::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};

    use crate::common::{small_config, text};

    fn make_counters() -> TelemetryCounters {
        TelemetryCounters {
            blocks_read: 4,
            blocks_processed: 4,
            blocks_written: 4,
            bytes_in: 4000,
            bytes_out: 1000,
            blocks_reordered: 1,
        }
    }

    fn make_timer() -> TelemetryTimer {
        let mut timer = TelemetryTimer::new();
        std::thread::sleep(Duration::from_millis(20)); // ensure elapsed > 0
        timer.add_stage_time(Stage::Read, Duration::from_millis(5));
        timer.add_stage_time(Stage::Compress, Duration::from_millis(7));
        timer.add_stage_time(Stage::Write, Duration::from_millis(10));
        timer.finish();
        timer
    }

    // ------------------------------------------------------------
    // Snapshot construction
    // ------------------------------------------------------------
    #[test]
    fn snapshot_initializes_output_none() {
        let snapshot = TelemetrySnapshot::from(Mode::Compress, &make_counters(), &make_timer(), 2, None);
        assert!(snapshot.output.is_none());
        assert_eq!(snapshot.workers_used, 2);
        assert_eq!(snapshot.blocks_reordered, 1);
    }

    #[test]
    fn attach_output_sets_output_field() {
        let mut snapshot = TelemetrySnapshot::from(Mode::Compress, &make_counters(), &make_timer(), 1, None);
        snapshot.attach_output(vec![1, 2, 3, 4]);
        assert_eq!(snapshot.output.unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn ratio_is_compressed_over_uncompressed_in_both_directions() {
        let counters = make_counters();
        let enc = TelemetrySnapshot::from(Mode::Compress, &counters, &make_timer(), 1, None);
        assert!((enc.compression_ratio - 0.25).abs() < 1e-9);

        let swapped = TelemetryCounters { bytes_in: 1000, bytes_out: 4000, ..counters };
        let dec = TelemetrySnapshot::from(
            Mode::Decompress,
            &swapped,
            &make_timer(),
            1,
            Some(DecodeStrategy::Parallel),
        );
        assert!((dec.compression_ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn ratio_is_not_clamped_for_incompressible_input() {
        let counters = TelemetryCounters { bytes_in: 100, bytes_out: 130, ..make_counters() };
        let snapshot = TelemetrySnapshot::from(Mode::Compress, &counters, &make_timer(), 1, None);
        assert!(snapshot.compression_ratio > 1.0);
    }

    #[test]
    fn zero_input_has_zero_ratio() {
        let snapshot =
            TelemetrySnapshot::from(Mode::Compress, &TelemetryCounters::default(), &make_timer(), 0, None);
        assert_eq!(snapshot.compression_ratio, 0.0);
        assert_eq!(snapshot.throughput_bytes_per_sec, 0.0);
    }

    #[test]
    fn throughput_is_computed() {
        let snapshot = TelemetrySnapshot::from(Mode::Compress, &make_counters(), &make_timer(), 1, None);
        assert!(snapshot.throughput_bytes_per_sec > 0.0);
        assert!(snapshot.elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn json_leaves_output_out() {
        let mut snapshot = TelemetrySnapshot::from(Mode::Compress, &make_counters(), &make_timer(), 1, None);
        snapshot.attach_output(vec![9; 16]);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"blocks_read\":4"));
        assert!(json.contains("\"mode\":\"Compress\""));
        assert!(!json.contains("\"output\""));
    }

    // ------------------------------------------------------------
    // Counters and stage times
    // ------------------------------------------------------------
    #[test]
    fn counters_merge_field_by_field() {
        let mut total = TelemetryCounters::default();
        total.merge(&make_counters());
        total += make_counters();
        assert_eq!(total.blocks_read, 8);
        assert_eq!(total.bytes_in, 8000);
        assert_eq!(total.blocks_reordered, 2);
    }

    #[test]
    fn stage_times_accumulate_and_merge() {
        let mut a = StageTimes::default();
        a.add(Stage::Read, Duration::from_millis(3));
        a.add(Stage::Read, Duration::from_millis(4));

        let mut b = StageTimes::default();
        b.add(Stage::Write, Duration::from_millis(5));
        a.merge(&b);

        assert_eq!(a.get(Stage::Read), Duration::from_millis(7));
        assert_eq!(a.total(), Duration::from_millis(12));
        assert!(a.has_all(&[Stage::Read, Stage::Write]));
        assert!(!a.has_all(&[Stage::Decompress]));
        assert!((a.get_ms(Stage::Write) - 5.0).abs() < 1e-9);
    }

    // ------------------------------------------------------------
    // Snapshots from real runs
    // ------------------------------------------------------------
    #[test]
    fn compress_run_counts_every_block() {
        let data = text(256 * 1024);
        let snapshot =
            compress_stream(InputSource::Memory(data.clone()), OutputSink::Memory, &small_config(16 * 1024, 3))
                .unwrap();

        assert_eq!(snapshot.mode, Mode::Compress);
        assert_eq!(snapshot.blocks_read, 16);
        assert_eq!(snapshot.blocks_written, 16);
        assert_eq!(snapshot.bytes_in, data.len() as u64);
        assert_eq!(snapshot.bytes_out, snapshot.output.as_ref().unwrap().len() as u64);
        assert!(snapshot.compression_ratio < 1.0);
        assert!(snapshot.has_all_stages(&[Stage::Read, Stage::Compress, Stage::Write]));
        assert_eq!(snapshot.decode_strategy, None);
    }

    #[test]
    fn decompress_run_mirrors_compress_run() {
        let data = text(128 * 1024);
        let cfg = small_config(8 * 1024, 2);
        let enc = compress_stream(InputSource::Memory(data.clone()), OutputSink::Memory, &cfg).unwrap();
        let packed = enc.output.clone().unwrap();

        let dec = decompress_stream(InputSource::Memory(packed.clone()), OutputSink::Memory, &cfg).unwrap();
        assert_eq!(dec.bytes_in, packed.len() as u64);
        assert_eq!(dec.bytes_out, data.len() as u64);
        assert_eq!(dec.blocks_read, enc.blocks_written);
        assert!((dec.compression_ratio - enc.compression_ratio).abs() < 1e-9);
        assert!(dec.has_all_stages(&[Stage::Read, Stage::Decompress, Stage::Write]));
    }
}
