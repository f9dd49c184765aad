use std::cell::RefCell;

use super::*;
use crate::context::FlagEndpoint;
use crate::model::QcState;

/// In-memory store that records every call it receives.
#[derive(Default)]
struct RecordingStore {
    flags: FlagSet,
    fail_fetch: bool,
    fail_put: bool,
    fetches: RefCell<Vec<String>>,
    puts: RefCell<Vec<(String, FlagEdit)>>,
}

impl FlagStore for RecordingStore {
    fn fetch_flags(&self, run_id: &str) -> Result<FlagSet, LuiError> {
        self.fetches.borrow_mut().push(run_id.to_string());
        if self.fail_fetch {
            return Err(LuiError::LoadFailed {
                run_id: run_id.to_string(),
                detail: "connection refused".to_string(),
            });
        }
        Ok(self.flags.clone())
    }

    fn put_flag(&self, run_id: &str, edit: &FlagEdit) -> Result<(), LuiError> {
        self.puts
            .borrow_mut()
            .push((run_id.to_string(), edit.clone()));
        if self.fail_put {
            return Err(LuiError::SaveFailed {
                run_id: run_id.to_string(),
                detail: "unexpected status 500".to_string(),
            });
        }
        Ok(())
    }
}

fn context(run_id: &str, lane: &str) -> ReportContext {
    ReportContext {
        run_id: run_id.to_string(),
        active_lane: lane.to_string(),
        endpoint: FlagEndpoint::for_origin("https://reports.example.org"),
    }
}

fn page_with_lanes(run_id: &str, active: &str, others: &[&str]) -> ReportPage {
    let mut page = ReportPage::for_lane(run_id, active);
    for lane in others {
        page.set_active_lane(lane);
    }
    page.set_active_lane(active);
    page
}

fn flag(qc: Option<bool>, reason: Option<&str>) -> Flag {
    Flag {
        qc,
        reason: reason.map(ToOwned::to_owned),
    }
}

fn loaded_client(store: &RecordingStore, run_id: &str, lane: &str) -> LaneFlagClient {
    let mut client = LaneFlagClient::new(context(run_id, lane), page_with_lanes(run_id, lane, &[]));
    let request = client.initialize().expect("fresh client should load");
    client.dispatch(store, &request);
    assert_eq!(client.state(), ClientState::Loaded);
    client
}

#[test]
fn load_renders_active_lane_into_panel_tab_and_sidebar() {
    let store = RecordingStore {
        flags: FlagSet::single("lane1", flag(Some(true), None)),
        ..RecordingStore::default()
    };
    let client = loaded_client(&store, "run1", "lane1");
    let page = client.page();

    let Some(Panel::Flag(panel)) = page.panel() else {
        panic!("expected flag panel, got {:?}", page.panel());
    };
    assert_eq!(panel.state.as_class(), "lui_state_true");
    assert_eq!(panel.qc_label, "Yes");
    assert_eq!(panel.summary(), "Yes");
    assert_eq!(page.sidebar_state().map(QcState::as_class), Some("lui_state_true"));
    assert_eq!(page.tab("lane1").and_then(|tab| tab.state), Some(QcState::True));
    assert_eq!(page.trigger(), Some(&TriggerControl::idle()));
    assert_eq!(*store.fetches.borrow(), vec!["run1".to_string()]);
}

#[test]
fn load_colours_every_tab_but_only_renders_active_panel() {
    let mut flags = FlagSet::single("lane1", flag(None, None));
    flags.insert("lane2", flag(Some(false), Some("low yield")));
    let store = RecordingStore {
        flags,
        ..RecordingStore::default()
    };

    let mut client = LaneFlagClient::new(
        context("run1", "lane1"),
        page_with_lanes("run1", "lane1", &["lane2"]),
    );
    let request = client.initialize().expect("load request");
    client.dispatch(&store, &request);

    let page = client.page();
    assert_eq!(page.tab("lane1").and_then(|t| t.state), Some(QcState::Null));
    assert_eq!(page.tab("lane2").and_then(|t| t.state), Some(QcState::False));
    let Some(Panel::Flag(panel)) = page.panel() else {
        panic!("expected flag panel");
    };
    assert_eq!(panel.qc_label, "Not Set");
    assert_eq!(panel.reason, None);
}

#[test]
fn rendering_same_flags_twice_is_idempotent() {
    let mut flags = FlagSet::single("lane1", flag(Some(false), Some("bubbles")));
    flags.insert("lane2", flag(Some(true), None));

    let mut client = LaneFlagClient::new(
        context("run1", "lane1"),
        page_with_lanes("run1", "lane1", &["lane2"]),
    );
    client.initialize().expect("load request");
    client.render(&flags);
    let once = client.page().clone();
    client.render(&flags);

    assert_eq!(client.page(), &once);
}

#[test]
fn load_failure_shows_message_and_leaves_tabs_alone() {
    let store = RecordingStore {
        fail_fetch: true,
        ..RecordingStore::default()
    };
    let mut client = LaneFlagClient::new(
        context("run7", "lane1"),
        page_with_lanes("run7", "lane1", &["lane2"]),
    );
    let before = client.page().browser.as_ref().map(|b| b.tabs.clone());

    let request = client.initialize().expect("load request");
    client.dispatch(&store, &request);

    assert_eq!(client.state(), ClientState::LoadError);
    assert_eq!(
        client.page().panel(),
        Some(&Panel::Failure {
            message: "Failed to load usable/unusable flags for run run7".to_string()
        })
    );
    assert_eq!(client.page().browser.as_ref().map(|b| b.tabs.clone()), before);
    assert!(matches!(client.take_error(), Some(LuiError::LoadFailed { .. })));

    // No retry: the page has to be reloaded.
    assert_eq!(client.initialize(), Err(ClientError::Busy(ClientState::LoadError)));
    assert!(matches!(client.open_editor(), Err(ClientError::NotEditable(_))));
    assert_eq!(store.fetches.borrow().len(), 1);
}

#[test]
fn only_one_request_in_flight() {
    let mut client = LaneFlagClient::new(
        context("run1", "lane1"),
        page_with_lanes("run1", "lane1", &[]),
    );
    client.initialize().expect("first load");

    assert_eq!(client.initialize(), Err(ClientError::Busy(ClientState::Loading)));
    assert!(matches!(client.open_editor(), Err(ClientError::Busy(ClientState::Loading))));
}

#[test]
fn save_success_rerenders_from_echo_and_reenables_trigger() {
    let mut flags = FlagSet::single("lane1", flag(Some(true), None));
    flags.insert("lane2", flag(None, None));
    let store = RecordingStore {
        flags,
        ..RecordingStore::default()
    };
    let mut client = loaded_client(&store, "run7", "lane2");

    let dialog = client.open_editor().expect("editor should open");
    dialog.choose(Some(false));
    dialog.set_reason("contamination");
    assert_eq!(client.page().trigger().map(|t| t.enabled), Some(false));

    let request = client.submit_edit().expect("submit should produce a put");
    assert_eq!(client.state(), ClientState::Saving);
    assert_eq!(client.page().trigger(), Some(&TriggerControl::saving()));
    assert!(matches!(client.open_editor(), Err(ClientError::Busy(ClientState::Saving))));

    client.dispatch(&store, &request);

    assert_eq!(client.state(), ClientState::Loaded);
    let Some(Panel::Flag(panel)) = client.page().panel() else {
        panic!("expected flag panel");
    };
    assert_eq!(panel.summary(), "No -- contamination");
    assert_eq!(client.page().tab("lane2").and_then(|t| t.state), Some(QcState::False));
    assert_eq!(client.page().trigger(), Some(&TriggerControl::idle()));
    assert_eq!(client.flags().get("lane1").map(Flag::state), Some(QcState::True));
    assert_eq!(
        client.flags().get("lane2"),
        Some(&flag(Some(false), Some("contamination")))
    );

    let puts = store.puts.borrow();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, "run7");
    assert_eq!(puts[0].1.lane, "lane2");
}

#[test]
fn save_failure_shows_message_and_allows_manual_retry() {
    let store = RecordingStore {
        flags: FlagSet::single("lane1", flag(None, None)),
        fail_put: true,
        ..RecordingStore::default()
    };
    let mut client = loaded_client(&store, "run7", "lane1");

    client.open_editor().expect("editor").choose(Some(true));
    let request = client.submit_edit().expect("put request");
    client.dispatch(&store, &request);

    assert_eq!(client.state(), ClientState::SaveError);
    assert_eq!(
        client.page().panel(),
        Some(&Panel::Failure {
            message: "Failed to save usable/unusable flags for run run7".to_string()
        })
    );
    assert_eq!(client.page().trigger(), Some(&TriggerControl::idle()));
    assert_eq!(client.flags().get("lane1"), Some(&flag(None, None)));

    let dialog = client.open_editor().expect("retry should be possible");
    assert_eq!(dialog.choice(), None);
}

#[test]
fn submit_without_choice_never_reaches_store() {
    let store = RecordingStore {
        flags: FlagSet::single("lane1", flag(None, None)),
        ..RecordingStore::default()
    };
    let mut client = loaded_client(&store, "run1", "lane1");

    client.open_editor().expect("editor");
    assert_eq!(client.submit_edit(), None);
    assert_eq!(client.submit_edit(), None);

    assert_eq!(client.state(), ClientState::Loaded);
    assert!(client.dialog().is_open());
    assert!(store.puts.borrow().is_empty());
}

#[test]
fn cancel_restores_dialog_and_trigger() {
    let store = RecordingStore {
        flags: FlagSet::single("lane1", flag(Some(true), Some("ok"))),
        ..RecordingStore::default()
    };
    let mut client = loaded_client(&store, "run1", "lane1");

    let dialog = client.open_editor().expect("editor");
    assert_eq!(dialog.choice(), Some(true));
    assert_eq!(dialog.reason(), "ok");
    dialog.choose(Some(false));
    dialog.set_reason("nope");

    client.cancel_edit();

    assert!(!client.dialog().is_open());
    assert_eq!(client.dialog().choice(), Some(true));
    assert_eq!(client.dialog().reason(), "ok");
    assert_eq!(client.page().trigger(), Some(&TriggerControl::idle()));
    assert_eq!(client.state(), ClientState::Loaded);
    assert!(store.puts.borrow().is_empty());
}

#[test]
fn stray_completions_are_ignored() {
    let mut client = LaneFlagClient::new(
        context("run1", "lane1"),
        page_with_lanes("run1", "lane1", &[]),
    );
    let before = client.page().clone();

    client.handle(FlagEvent::SaveSucceeded(FlagSet::single(
        "lane1",
        flag(Some(true), None),
    )));
    client.handle(FlagEvent::LoadSucceeded(FlagSet::new()));

    assert_eq!(client.state(), ClientState::Idle);
    assert_eq!(client.page(), &before);
}

#[test]
fn lane_missing_from_store_cannot_be_edited() {
    let store = RecordingStore {
        flags: FlagSet::single("lane2", flag(Some(true), None)),
        ..RecordingStore::default()
    };
    let mut client = loaded_client(&store, "run1", "lane1");

    assert_eq!(client.page().panel(), Some(&Panel::Empty));
    assert!(matches!(
        client.open_editor(),
        Err(ClientError::NoFlagPanel(ref lane)) if lane == "lane1"
    ));
}
