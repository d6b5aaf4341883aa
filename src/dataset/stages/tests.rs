use std::sync::Mutex;

use super::*;
use crate::dataset::DatasetError;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(Stage, StageStatus, String)>>,
}

impl Recorder {
    fn take(&self) -> Vec<(Stage, StageStatus, String)> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl StageObserver for Recorder {
    fn on_event(&self, event: &StageEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.stage, event.status, event.message.clone()));
    }
}

struct SkipsBody;

impl StageWrapper for SkipsBody {
    fn run(
        &self,
        _stage: Stage,
        _observer: &dyn StageObserver,
        _body: &mut dyn FnMut() -> Result<(), DatasetError>,
    ) -> Result<(), DatasetError> {
        Ok(())
    }
}

#[test]
fn announced_registry_wraps_disk_stages_only() {
    let registry = StageRegistry::announced();
    let wrapped: Vec<Stage> = Stage::ALL
        .into_iter()
        .filter(|stage| registry.is_wrapped(*stage))
        .collect();
    assert_eq!(
        wrapped,
        vec![Stage::Materialize, Stage::Write, Stage::Metadata, Stage::Extras]
    );
}

#[test]
fn announce_reports_start_and_completion_and_returns_value() {
    let registry = StageRegistry::announced();
    let recorder = Recorder::default();
    let value = registry
        .dispatch(Stage::Write, &recorder, || Ok::<_, DatasetError>(42))
        .unwrap();
    assert_eq!(value, 42);
    let message = "Writing out dataset locally...".to_string();
    assert_eq!(
        recorder.take(),
        vec![
            (Stage::Write, StageStatus::Started, message.clone()),
            (Stage::Write, StageStatus::Completed, message),
        ]
    );
}

#[test]
fn announce_reports_failure_and_propagates_original_error() {
    let registry = StageRegistry::announced();
    let recorder = Recorder::default();
    let err = registry
        .dispatch(Stage::Metadata, &recorder, || -> Result<(), DatasetError> {
            Err(DatasetError::configuration("field", "boom"))
        })
        .unwrap_err();
    match err {
        DatasetError::Configuration { field, reason } => {
            assert_eq!(field, "field");
            assert_eq!(reason, "boom");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let statuses: Vec<StageStatus> = recorder.take().into_iter().map(|(_, s, _)| s).collect();
    assert_eq!(statuses, vec![StageStatus::Started, StageStatus::Failed]);
}

#[test]
fn unwrapped_stage_runs_silently() {
    let registry = StageRegistry::announced();
    let recorder = Recorder::default();
    registry
        .dispatch(Stage::Discover, &recorder, || Ok::<_, DatasetError>(()))
        .unwrap();
    assert!(recorder.take().is_empty());
}

#[test]
fn later_registration_replaces_wrapper() {
    let mut registry = StageRegistry::announced();
    let previous = registry.register(Stage::Write, Announce::new("Exporting TFRecords..."));
    assert!(previous.is_some());
    let recorder = Recorder::default();
    registry
        .dispatch(Stage::Write, &recorder, || Ok::<_, DatasetError>(()))
        .unwrap();
    let events = recorder.take();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|(_, _, message)| message == "Exporting TFRecords..."));
}

#[test]
fn opting_out_keeps_stage_running_without_events() {
    let mut registry = StageRegistry::announced();
    registry.opt_out(Stage::Extras);
    let recorder = Recorder::default();
    let mut ran = false;
    registry
        .dispatch(Stage::Extras, &recorder, || {
            ran = true;
            Ok::<_, DatasetError>(())
        })
        .unwrap();
    assert!(ran);
    assert!(recorder.take().is_empty());
}

#[test]
fn wrapper_that_skips_body_is_rejected() {
    let mut registry = StageRegistry::empty();
    registry.register(Stage::Write, SkipsBody);
    let err = registry
        .dispatch(Stage::Write, &TracingObserver, || Ok::<_, DatasetError>(()))
        .unwrap_err();
    assert!(matches!(err, DatasetError::WrapperMisuse { stage: Stage::Write, .. }));
}
