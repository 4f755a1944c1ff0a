mod common;

use cleaner_core::Message;
use common::{fixture, CommentSpec};
use comment_pipeline::{ChangeWatcher, Verdict};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(100);

fn append(f: &common::Fixture, text: &str) {
    f.pipeline
        .document_mut()
        .append_to("#comments", &CommentSpec::new(text).likes("12").html())
        .unwrap();
}

fn set_enabled(f: &common::Fixture, enabled: bool) {
    f.bus.publish(Message::SettingsChanged {
        enabled,
        api_key: "test-key".to_string(),
    });
}

#[tokio::test(start_paused = true)]
async fn test_bursts_coalesce_into_one_rescan() {
    let f = fixture(&[], "1").await;
    f.pipeline.start().await;
    let watcher = ChangeWatcher::attach(&f.pipeline, f.bus.subscribe(), DEBOUNCE);
    let (stop, stopped) = oneshot::channel::<()>();

    let driver = async {
        sleep(Duration::from_millis(1)).await;
        assert_eq!(f.pipeline.rescan_count(), 1);

        append(&f, "First comment in the burst");
        sleep(Duration::from_millis(30)).await;
        append(&f, "Second comment in the burst");
        sleep(Duration::from_millis(30)).await;
        assert_eq!(f.pipeline.rescan_count(), 1);

        sleep(Duration::from_millis(60)).await;
        assert_eq!(f.pipeline.rescan_count(), 2);
        assert_eq!(f.pipeline.seen_count(), 2);
        stop.send(()).ok();
    };

    tokio::join!(
        watcher.run(async {
            stopped.await.ok();
        }),
        driver
    );
}

#[tokio::test(start_paused = true)]
async fn test_batches_without_comments_are_ignored() {
    let f = fixture(&[], "1").await;
    f.pipeline.start().await;
    let watcher = ChangeWatcher::attach(&f.pipeline, f.bus.subscribe(), DEBOUNCE);
    let (stop, stopped) = oneshot::channel::<()>();

    let driver = async {
        sleep(Duration::from_millis(1)).await;
        f.pipeline
            .document_mut()
            .append_to("#comments", "<p>sponsored banner</p>")
            .unwrap();
        sleep(Duration::from_millis(300)).await;
        assert_eq!(f.pipeline.rescan_count(), 1);
        stop.send(()).ok();
    };

    tokio::join!(
        watcher.run(async {
            stopped.await.ok();
        }),
        driver
    );
}

#[tokio::test(start_paused = true)]
async fn test_disabling_drops_pending_rescan() {
    let f = fixture(&[], "1").await;
    f.pipeline.start().await;
    let watcher = ChangeWatcher::attach(&f.pipeline, f.bus.subscribe(), DEBOUNCE);
    let (stop, stopped) = oneshot::channel::<()>();

    let driver = async {
        sleep(Duration::from_millis(1)).await;
        append(&f, "Comment arriving before the toggle");
        sleep(Duration::from_millis(20)).await;
        set_enabled(&f, false);
        sleep(Duration::from_millis(300)).await;
        assert_eq!(f.pipeline.rescan_count(), 1);
        assert_eq!(f.pipeline.seen_count(), 0);

        // Mutations while disabled schedule nothing
        append(&f, "Comment arriving while disabled");
        sleep(Duration::from_millis(300)).await;
        assert_eq!(f.pipeline.rescan_count(), 1);

        // Re-enabling rescans immediately, without waiting for the debounce window
        set_enabled(&f, true);
        sleep(Duration::from_millis(1)).await;
        assert_eq!(f.pipeline.rescan_count(), 2);
        assert_eq!(f.pipeline.seen_count(), 2);
        stop.send(()).ok();
    };

    tokio::join!(
        watcher.run(async {
            stopped.await.ok();
        }),
        driver
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_analysis_does_not_hold_up_new_comments() {
    let f = fixture(
        &[CommentSpec::new("Emphasized comment waiting on the remote score")
            .likes("250")
            .bold()],
        "1",
    )
    .await;
    f.backend.set_delay(Duration::from_secs(10));
    f.pipeline.start().await;
    let slow = f.renderers()[0];
    let watcher = ChangeWatcher::attach(&f.pipeline, f.bus.subscribe(), DEBOUNCE);
    let (stop, stopped) = oneshot::channel::<()>();

    let driver = async {
        sleep(Duration::from_millis(50)).await;
        assert_eq!(f.backend.calls(), 1);
        append(&f, "Fresh comment arriving during the remote call");

        sleep(Duration::from_millis(500)).await;
        assert_eq!(f.pipeline.rescan_count(), 2);
        assert_eq!(f.pipeline.seen_count(), 2);
        assert_eq!(f.pipeline.verdict_for(slow), None);

        // Messages are still applied while the call is outstanding
        set_enabled(&f, false);
        sleep(Duration::from_millis(1)).await;
        assert!(!f.pipeline.is_enabled());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(
            f.pipeline.verdict_for(slow),
            Some(Verdict::Kept {
                heuristic: 1,
                remote: 1
            })
        );
        stop.send(()).ok();
    };

    tokio::join!(
        watcher.run(async {
            stopped.await.ok();
        }),
        driver
    );
}
