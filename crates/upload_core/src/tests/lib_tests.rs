use super::*;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Semaphore;

struct InstantPacer;

#[async_trait]
impl StepPacer for InstantPacer {
    async fn pause(&self) {}
}

/// Pacer that blocks on a semaphore so tests can hold a session mid-flight.
struct GatedPacer {
    gate: Semaphore,
}

#[async_trait]
impl StepPacer for GatedPacer {
    async fn pause(&self) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

fn text_file(name: &str, content: &str) -> FileRef {
    FileRef::from_bytes(name, Arc::from(content.as_bytes()))
}

fn missing_file(name: &str) -> FileRef {
    FileRef::from_path(PathBuf::from("/definitely/not/here").join(name))
}

fn recording_controller(
    pacer: Arc<dyn StepPacer>,
) -> (Arc<UploadController>, Arc<Mutex<Vec<String>>>) {
    let loaded: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&loaded);
    let controller =
        UploadController::new_with_dependencies(pacer, Arc::new(FsContentReader), move |content| {
            sink.lock().expect("loaded sink").push(content);
        });
    (controller, loaded)
}

fn drain(rx: &mut broadcast::Receiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn progress_percents(events: &[UploadEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            UploadEvent::ProgressStepped { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

fn phases(events: &[UploadEvent]) -> Vec<UploadPhase> {
    events
        .iter()
        .filter_map(|event| match event {
            UploadEvent::PhaseChanged(phase) => Some(*phase),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn completed_session_steps_every_even_percent_once() {
    let (controller, _loaded) = recording_controller(Arc::new(InstantPacer));
    let mut rx = controller.subscribe_events();

    controller
        .ingest(vec![text_file("metrics.csv", "a,b\n1,2\n")])
        .await
        .expect("ingest");

    let events = drain(&mut rx);
    let expected: Vec<u8> = (0..=100).step_by(PROGRESS_STEP as usize).collect();
    assert_eq!(progress_percents(&events), expected);
    assert_eq!(
        phases(&events),
        vec![UploadPhase::Processing, UploadPhase::Done, UploadPhase::Idle]
    );

    for event in &events {
        if let UploadEvent::ProgressStepped { percent, message } = event {
            assert_eq!(*message, stage_message(*percent));
        }
    }
}

#[tokio::test]
async fn callback_receives_first_file_content_exactly_once() {
    let (controller, loaded) = recording_controller(Arc::new(InstantPacer));
    let mut rx = controller.subscribe_events();

    controller
        .ingest(vec![
            text_file("first.log", "first wins"),
            text_file("second.log", "ignored"),
            text_file("third.log", "also ignored"),
        ])
        .await
        .expect("ingest");

    let contents = loaded.lock().expect("loaded sink").clone();
    assert_eq!(contents, vec!["first wins".to_string()]);

    let events = drain(&mut rx);
    let loaded_names: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            UploadEvent::Loaded { file_name } => Some(file_name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(loaded_names, vec!["first.log"]);

    assert_eq!(controller.snapshot().phase, UploadPhase::Idle);
    assert_eq!(controller.snapshot().progress, 0);
}

#[tokio::test]
async fn empty_selection_changes_nothing() {
    let (controller, loaded) = recording_controller(Arc::new(InstantPacer));
    let mut rx = controller.subscribe_events();

    controller.ingest(Vec::new()).await.expect("empty ingest");

    assert!(drain(&mut rx).is_empty());
    assert!(loaded.lock().expect("loaded sink").is_empty());
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, UploadPhase::Idle);
    assert_eq!(snapshot.progress, 0);
}

#[tokio::test]
async fn unreadable_file_fails_once_and_resets_without_callback() {
    let (controller, loaded) = recording_controller(Arc::new(InstantPacer));
    let mut rx = controller.subscribe_events();

    controller
        .ingest(vec![missing_file("orders.csv")])
        .await
        .expect("ingest runs the session even when the read fails");

    assert!(loaded.lock().expect("loaded sink").is_empty());

    let events = drain(&mut rx);
    let failures: Vec<(&str, &str)> = events
        .iter()
        .filter_map(|event| match event {
            UploadEvent::Failed { file_name, reason } => {
                Some((file_name.as_str(), reason.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "orders.csv");
    assert!(failures[0].1.contains("orders.csv"));

    assert_eq!(
        phases(&events),
        vec![
            UploadPhase::Processing,
            UploadPhase::Failed,
            UploadPhase::Idle
        ]
    );

    // The progress sequence still ran to completion before the read.
    assert_eq!(progress_percents(&events).last(), Some(&100));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, UploadPhase::Idle);
    assert_eq!(snapshot.progress, 0);
}

#[tokio::test]
async fn failed_session_leaves_the_controller_ready_for_the_next() {
    let (controller, loaded) = recording_controller(Arc::new(InstantPacer));
    let mut rx = controller.subscribe_events();

    controller
        .ingest(vec![missing_file("gone.log")])
        .await
        .expect("failing session still runs");
    assert!(loaded.lock().expect("loaded sink").is_empty());
    assert_eq!(controller.snapshot().phase, UploadPhase::Idle);

    controller
        .ingest(vec![text_file("retry.log", "second attempt")])
        .await
        .expect("retry ingest");

    assert_eq!(
        loaded.lock().expect("loaded sink").clone(),
        vec!["second attempt".to_string()]
    );

    let events = drain(&mut rx);
    assert_eq!(
        phases(&events),
        vec![
            UploadPhase::Processing,
            UploadPhase::Failed,
            UploadPhase::Idle,
            UploadPhase::Processing,
            UploadPhase::Done,
            UploadPhase::Idle,
        ]
    );

    // Both sessions run their own full progress sweep.
    let percents = progress_percents(&events);
    assert_eq!(percents.len(), 2 * (100 / PROGRESS_STEP as usize + 1));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, UploadPhase::Idle);
    assert_eq!(snapshot.progress, 0);
}

#[tokio::test]
async fn second_ingest_while_processing_is_rejected() {
    let pacer = Arc::new(GatedPacer {
        gate: Semaphore::new(0),
    });
    let (controller, loaded) = recording_controller(pacer.clone());

    let background = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.ingest(vec![text_file("held.txt", "held")]).await }
    });

    let mut reached_processing = false;
    for _ in 0..10_000 {
        if controller.snapshot().phase == UploadPhase::Processing {
            reached_processing = true;
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(reached_processing, "first session never started processing");

    let second = controller.ingest(vec![text_file("late.txt", "late")]).await;
    assert!(matches!(second, Err(UploadError::SessionActive)));
    assert_eq!(controller.snapshot().phase, UploadPhase::Processing);

    // Release every remaining pause and let the first session finish.
    pacer.gate.add_permits(256);
    background
        .await
        .expect("join")
        .expect("first session completes");

    let contents = loaded.lock().expect("loaded sink").clone();
    assert_eq!(contents, vec!["held".to_string()]);
    assert_eq!(controller.snapshot().phase, UploadPhase::Idle);
}

#[tokio::test]
async fn drag_transitions_only_move_between_idle_and_dragging() {
    let (controller, _loaded) = recording_controller(Arc::new(InstantPacer));

    // Empty hover set is ignored.
    controller.drag_entered(0);
    assert_eq!(controller.snapshot().phase, UploadPhase::Idle);

    controller.drag_entered(2);
    assert_eq!(controller.snapshot().phase, UploadPhase::Dragging);

    // Re-entering while already dragging changes nothing.
    controller.drag_entered(1);
    assert_eq!(controller.snapshot().phase, UploadPhase::Dragging);

    controller.drag_left();
    assert_eq!(controller.snapshot().phase, UploadPhase::Idle);

    // Leaving while idle stays idle.
    controller.drag_left();
    assert_eq!(controller.snapshot().phase, UploadPhase::Idle);
}

#[tokio::test]
async fn drop_while_dragging_starts_the_session() {
    let (controller, loaded) = recording_controller(Arc::new(InstantPacer));

    controller.drag_entered(1);
    assert_eq!(controller.snapshot().phase, UploadPhase::Dragging);

    controller
        .ingest(vec![text_file("notes.txt", "dropped")])
        .await
        .expect("ingest");

    assert_eq!(
        loaded.lock().expect("loaded sink").clone(),
        vec!["dropped".to_string()]
    );
    assert_eq!(controller.snapshot().phase, UploadPhase::Idle);
}
