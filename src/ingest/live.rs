//! Live ingestion
//!
//! Streams lines from an async reader (standard input in the binary) into
//! the pipeline while a wall-clock timer runs the queries every period.
//! A line holding only `\x04` or the end of input ends the run.

use crate::ingest::pipeline::Pipeline;
use crate::ingest::IngestError;
use crate::storage::BackingStore;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// End-of-transmission marker that terminates a live run
pub const END_OF_TRANSMISSION: u8 = 0x04;

fn is_end_marker(line: &[u8]) -> bool {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    line[..end] == [END_OF_TRANSMISSION]
}

/// Run until the input ends, then flush and run the queries one last time
pub async fn run_live<S, R>(
    pipeline: &mut Pipeline<S>,
    mut input: R,
    period: Duration,
) -> Result<(), IngestError>
where
    S: BackingStore,
    R: AsyncBufRead + Unpin,
{
    tracing::info!(period_secs = period.as_secs_f64(), "Starting live ingestion");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Partial reads stay in `line` when the timer wins the race
    let mut line = Vec::new();

    loop {
        tokio::select! {
            read = input.read_until(b'\n', &mut line) => {
                if read? == 0 {
                    // bytes read before a timer tick interrupted the line
                    if !line.is_empty() && !is_end_marker(&line) {
                        pipeline.push_line(&line)?;
                    }
                    tracing::info!("End of input");
                    break;
                }
                if is_end_marker(&line) {
                    tracing::info!("End-of-transmission received");
                    break;
                }
                pipeline.push_line(&line)?;
                line.clear();
            }
            _ = ticker.tick() => {
                tracing::debug!("Running scheduled queries");
                pipeline.run_periodic_queries()?;
            }
        }
    }

    pipeline.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::indexer::tests::ncsa_line;
    use crate::ingest::buffer::FlushTrigger;
    use crate::ingest::pipeline::tests::ncsa_pipeline;
    use crate::ingest::pipeline::RunSchedule;
    use tempfile::tempdir;
    use tokio::io::{AsyncWriteExt, BufReader};

    fn lines(from: i64, count: i64) -> String {
        (from..from + count)
            .map(|ts| format!("{}\n", ncsa_line(ts)))
            .collect()
    }

    #[test]
    fn test_end_marker() {
        assert!(is_end_marker(b"\x04\n"));
        assert!(is_end_marker(b"\x04\r\n"));
        assert!(is_end_marker(b"\x04"));
        assert!(!is_end_marker(b"\x04x\n"));
        assert!(!is_end_marker(b"\n"));
    }

    #[tokio::test]
    async fn test_below_threshold_then_end_marker() {
        let dir = tempdir().unwrap();
        let mut pipeline = ncsa_pipeline(dir.path(), FlushTrigger::Lines(100), RunSchedule::Live);

        let input = format!("{}\x04\n{}", lines(0, 99), lines(500, 5));
        let reader = BufReader::new(input.as_bytes());

        run_live(&mut pipeline, reader, Duration::from_secs(60))
            .await
            .unwrap();

        let stats = pipeline.stats();
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.records_inserted, 99);
        assert_eq!(stats.periodic_query_runs, 0);
        assert_eq!(stats.query_runs, 1);

        let text = std::fs::read_to_string(dir.path().join("query0.csv")).unwrap();
        assert_eq!(text, "99\n");
    }

    #[tokio::test]
    async fn test_end_of_input_terminates() {
        let dir = tempdir().unwrap();
        let mut pipeline = ncsa_pipeline(dir.path(), FlushTrigger::Lines(10), RunSchedule::Live);

        // last line without a trailing newline still counts
        let mut input = lines(0, 25);
        input.push_str(&ncsa_line(25));
        let reader = BufReader::new(input.as_bytes());

        run_live(&mut pipeline, reader, Duration::from_secs(60))
            .await
            .unwrap();

        let stats = pipeline.stats();
        assert_eq!(stats.records_inserted, 26);
        assert_eq!(stats.flushes, 3);
        assert_eq!(pipeline.buffered(), 0);
    }

    #[tokio::test]
    async fn test_unterminated_line_split_by_timer() {
        let dir = tempdir().unwrap();
        let mut pipeline = ncsa_pipeline(dir.path(), FlushTrigger::Lines(100), RunSchedule::Live);
        let (reader, mut writer) = tokio::io::duplex(64 * 1024);

        let feed = async move {
            let line = ncsa_line(1);
            let (head, tail) = line.split_at(line.len() / 2);
            writer.write_all(lines(0, 1).as_bytes()).await.unwrap();
            writer.write_all(head.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            writer.write_all(tail.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(writer);
        };

        let (result, _) = tokio::join!(
            run_live(&mut pipeline, BufReader::new(reader), Duration::from_millis(50)),
            feed
        );
        result.unwrap();

        let stats = pipeline.stats();
        assert!(stats.periodic_query_runs >= 1);
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.records_inserted, 2);
        let text = std::fs::read_to_string(dir.path().join("query0.csv")).unwrap();
        assert_eq!(text, "2\n");
    }

    #[tokio::test]
    async fn test_timer_overwrites_output() {
        let dir = tempdir().unwrap();
        let mut pipeline = ncsa_pipeline(dir.path(), FlushTrigger::Lines(5), RunSchedule::Live);
        let (reader, mut writer) = tokio::io::duplex(64 * 1024);

        let feed = async move {
            writer.write_all(lines(0, 10).as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(250)).await;
            writer.write_all(b"\x04\n").await.unwrap();
        };

        let (result, _) = tokio::join!(
            run_live(&mut pipeline, BufReader::new(reader), Duration::from_millis(50)),
            feed
        );
        result.unwrap();

        let stats = pipeline.stats();
        assert!(stats.periodic_query_runs >= 1);
        assert_eq!(stats.query_runs, stats.periodic_query_runs + 1);

        let text = std::fs::read_to_string(dir.path().join("query0.csv")).unwrap();
        assert_eq!(text, "10\n");
    }
}
