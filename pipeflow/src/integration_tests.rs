//! End-to-end scenarios across sources, transforms, fan-in and cancellation.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::PipelineConfig;
    use crate::errors::{ItemError, PipelineError};
    use crate::events::{StageEvent, STAGE_CANCELLED, STAGE_CLOSED, STAGE_STARTED};
    use crate::fan_in::{merge, or_combine};
    use crate::sequence::{Sequence, Signal};
    use crate::stages::{
        filter, generate, map, repeat, repeat_with, take, try_map, MapStage, Stage, StageContext,
    };
    use crate::testing::{assert_drains_to, assert_fires_within, assert_stays_pending, TestRun};
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn context() -> StageContext {
        StageContext::new(Arc::new(CancellationToken::new())).unwrap()
    }

    fn multiply(ctx: &StageContext, input: Sequence<i32>, by: i32) -> Sequence<i32> {
        map(ctx, input, move |v| v * by).unwrap()
    }

    fn add(ctx: &StageContext, input: Sequence<i32>, n: i32) -> Sequence<i32> {
        map(ctx, input, move |v| v + n).unwrap()
    }

    #[tokio::test]
    async fn test_nested_pipeline() {
        let ctx = context();
        let out = multiply(
            &ctx,
            add(&ctx, multiply(&ctx, generate(&ctx, vec![1, 2, 3, 4]).unwrap(), 2), 1),
            2,
        );
        assert_drains_to(out, vec![6, 10, 14, 18]).await;
    }

    #[tokio::test]
    async fn test_composed_pipeline_matches_nested() {
        let ctx = context();
        let pipeline = crate::compose!(
            MapStage::new(|v: i32| v * 2),
            MapStage::new(|v: i32| v + 1),
            MapStage::new(|v: i32| v * 2),
        );
        let out = pipeline
            .attach(&ctx, generate(&ctx, vec![1, 2, 3, 4]).unwrap())
            .unwrap();
        assert_drains_to(out, vec![6, 10, 14, 18]).await;

        ctx.join().await;
        assert_eq!(ctx.active_stages(), 0);
    }

    #[tokio::test]
    async fn test_take_from_repeat() {
        let ctx = context();
        let out = take(&ctx, repeat(&ctx, vec![1, 2]).unwrap(), 10).unwrap();
        assert_drains_to(out, vec![1, 2, 1, 2, 1, 2, 1, 2, 1, 2]).await;
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_returns_to_baseline() {
        let run = TestRun::new().unwrap();
        let ctx = &run.ctx;
        assert_eq!(ctx.active_stages(), 0);

        let source = repeat_with(ctx, || 1_u64).unwrap();
        let doubled = map(ctx, source, |v| v * 2).unwrap();
        let mut evens = filter(ctx, doubled, |v| v % 2 == 0).unwrap();

        for _ in 0..5 {
            assert_eq!(evens.recv().await, Some(2));
        }
        assert_eq!(ctx.active_stages(), 3);

        ctx.cancel("consumer done");
        ctx.join().await;
        assert_eq!(ctx.active_stages(), 0);

        let cancelled: Vec<StageEvent> = run
            .events
            .events()
            .into_iter()
            .filter(|e| e.kind == STAGE_CANCELLED)
            .collect();
        assert!(!cancelled.is_empty());
        assert!(cancelled.iter().all(|e| e.reason.as_deref() == Some("consumer done")));

        run.finish(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_random_stream_released_by_consumer() {
        let run = TestRun::new().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let randoms = repeat_with(&run.ctx, move || rng.gen_range(0..100_u32)).unwrap();

        let first_three = take(&run.ctx, randoms, 3).unwrap().collect_all().await;
        assert_eq!(first_three.len(), 3);
        assert!(first_three.iter().all(|v| *v < 100));

        // No cancel: the endless source exits because take let go of it
        run.ctx.join().await;
        assert_eq!(run.ctx.active_stages(), 0);
        assert!(!run.ctx.token().is_cancelled());
        let kinds = run.events.kinds_for("repeat_with");
        assert_eq!(kinds.last().map(String::as_str), Some(STAGE_CLOSED));
    }

    #[tokio::test]
    async fn test_status_checks_continue_past_failures() {
        let ctx = context();
        let hosts = generate(&ctx, vec!["a.example", "bad host", "b.example", ""]).unwrap();
        let mut index = 0;
        let checks = try_map(&ctx, hosts, move |host: &str| {
            let i = index;
            index += 1;
            if host.is_empty() || host.contains(' ') {
                Err(ItemError::new(i, format!("invalid host {host:?}")))
            } else {
                Ok(format!("{host}: 200"))
            }
        })
        .unwrap();

        let results: Vec<_> = checks.collect().await;
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_deref().ok(), Some("a.example: 200"));
        assert_eq!(results[1].as_ref().map_err(|e| e.index), Err(1));
        assert_eq!(results[2].as_deref().ok(), Some("b.example: 200"));
        assert_eq!(results[3].as_ref().map_err(|e| e.index), Err(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_or_of_exit_monitors() {
        let ctx = context();
        let start = Instant::now();
        let monitors = [7200, 300, 1, 3600, 60]
            .into_iter()
            .map(|secs| Signal::after(Duration::from_secs(secs)))
            .collect();

        or_combine(&ctx, monitors).unwrap().wait().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1));
        assert!(elapsed < Duration::from_secs(60));

        ctx.join().await;
        assert_eq!(ctx.active_stages(), 0);
    }

    #[tokio::test]
    async fn test_or_of_stage_completion() {
        let ctx = context();
        // A stage's output doubles as a done signal once it closes
        let (_held, idle) = crate::sequence::channel::<()>(1);
        let stalled = map(&ctx, idle, |()| ()).unwrap();
        let quick = map(&ctx, generate(&ctx, Vec::<()>::new()).unwrap(), |()| ()).unwrap();

        let signals = vec![Signal::never(), stalled.into(), quick.into()];
        let combined = or_combine(&ctx, signals).unwrap();
        assert_fires_within(combined, Duration::from_secs(1)).await;

        // The stalled stage is blocked on a read, so only cancellation frees it
        assert!(ctx.active_stages() >= 1);
        ctx.shutdown("done").await.unwrap();
        assert_eq!(ctx.active_stages(), 0);
    }

    #[tokio::test]
    async fn test_or_with_token_releases_on_cancel() {
        let ctx = context();
        let stop = Arc::new(CancellationToken::new());
        let signals = vec![Signal::never(), Signal::from_token(stop.clone())];
        let waiting = or_combine(&ctx, signals).unwrap();
        let waiting = assert_stays_pending(waiting, Duration::from_millis(10)).await;

        stop.cancel("first");
        stop.cancel("second");
        assert_eq!(stop.reason().as_deref(), Some("first"));
        assert_fires_within(waiting, Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_merge_of_parallel_workers() {
        let run = TestRun::new().unwrap();
        let ctx = &run.ctx;
        let workers: Vec<_> = (0..4)
            .map(|w| {
                let slice = generate(ctx, (0..40).filter(move |v| v % 4 == w)).unwrap();
                map(ctx, slice, |v| v + 1).unwrap()
            })
            .collect();

        let mut values = merge(ctx, workers).unwrap().collect_all().await;
        values.sort_unstable();
        assert_eq!(values, (1..=40).collect::<Vec<_>>());

        run.ctx.join().await;
        assert_eq!(run.events.kinds_for("merge").first().map(String::as_str), Some(STAGE_STARTED));
        run.finish(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_stage_limit_surfaces_to_composer() {
        let config = PipelineConfig::default().with_max_stages(2);
        let ctx = StageContext::with_config(Arc::new(CancellationToken::new()), config).unwrap();

        let source = repeat(&ctx, vec![1]).unwrap();
        let doubled = map(&ctx, source, |v: i32| v * 2).unwrap();
        let err = map(&ctx, doubled, |v| v + 1).unwrap_err();
        assert!(matches!(err, PipelineError::StageLimitExceeded { active: 2, limit: 2 }));

        ctx.shutdown("limit reached").await.unwrap();
        assert_eq!(ctx.active_stages(), 0);
    }

    #[tokio::test]
    async fn test_events_share_run_id_and_serialize() {
        let run = TestRun::new().unwrap();
        let out = map(&run.ctx, generate(&run.ctx, vec![1, 2]).unwrap(), |v: i32| v).unwrap();
        assert_drains_to(out, vec![1, 2]).await;
        run.ctx.join().await;

        let events = run.events.events();
        assert!(events.iter().all(|e| e.run_id == run.ctx.run_id()));

        let closed = events
            .iter()
            .find(|e| e.stage == "generate" && e.kind == STAGE_CLOSED)
            .unwrap();
        assert_eq!(closed.emitted, 2);
        let json = closed.to_json();
        assert_eq!(json["kind"], STAGE_CLOSED);
        assert_eq!(json["state"], "closed");
    }

    #[tokio::test]
    async fn test_events_disabled() {
        let run = TestRun::with_config(PipelineConfig::default().with_events(false)).unwrap();
        assert_drains_to(generate(&run.ctx, vec![1]).unwrap(), vec![1]).await;
        run.ctx.join().await;
        assert!(run.events.is_empty());
    }
}
