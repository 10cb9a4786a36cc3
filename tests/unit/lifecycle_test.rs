//! Remediation lifecycle across evaluation runs and process restarts

use riskgraph::asset::Asset;
use riskgraph::component::{Component, Technology};
use riskgraph::data_flow::{DataFlow, Protocol};
use riskgraph::model::Model;
use riskgraph::score::Score;
use riskgraph::storage::StateStore;
use riskgraph::Treatment;

const RISK_ID: &str = "CAPEC-62@WebApp@WebTraffic";

fn make_model() -> Model {
    let mut model = Model::new("Demo");
    let user = model
        .add_component(Component::actor("User").with_technology(Technology::Browser))
        .unwrap();
    let app = model
        .add_component(
            Component::process("WebApp").with_technology(Technology::WebApplication),
        )
        .unwrap();
    let asset = model
        .add_asset(Asset::new("Session", Score::HIGH, Score::MEDIUM, Score::MEDIUM))
        .unwrap();
    let flow = model
        .add_data_flow(DataFlow::new("WebTraffic", user, app, Protocol::Https))
        .unwrap();
    model.transfers(flow, asset);
    model
}

#[test]
fn accepted_disposition_survives_a_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path());

    // First run: evaluate, accept, persist.
    let mut model = make_model();
    model.set_state(store.load().unwrap());
    model.evaluate().unwrap();
    model.accept_risk(RISK_ID, Some("SEC-7".to_string()), None).unwrap();
    store.save(model.state()).unwrap();

    // Second run: a fresh model instance sees the recorded disposition.
    let mut model = make_model();
    model.set_state(store.load().unwrap());
    model.evaluate().unwrap();
    let risk = model.risk(RISK_ID).unwrap();
    assert_eq!(model.treatment_of(risk), Treatment::Accepted);

    let record = &model.state().risks[RISK_ID];
    assert_eq!(record.ticket.as_deref(), Some("SEC-7"));
}

#[test]
fn closing_every_task_marks_the_risk_mitigated_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path());

    let mut model = make_model();
    model.evaluate().unwrap();
    let task_ids: Vec<String> = model
        .tasks_for(model.risk(RISK_ID).unwrap())
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert!(!task_ids.is_empty());
    for id in &task_ids {
        model.close_task(id, None, Some("done".to_string())).unwrap();
    }
    store.save(model.state()).unwrap();

    let mut model = make_model();
    model.set_state(store.load().unwrap());
    model.evaluate().unwrap();
    let risk = model.risk(RISK_ID).unwrap();
    assert_eq!(model.treatment_of(risk), Treatment::Mitigated);
}

#[test]
fn deferring_one_task_keeps_the_risk_open() {
    let mut model = make_model();
    model.evaluate().unwrap();

    let task_ids: Vec<String> = model
        .tasks_for(model.risk(RISK_ID).unwrap())
        .into_iter()
        .map(|t| t.id)
        .collect();
    for (i, id) in task_ids.iter().enumerate() {
        if i == 0 {
            model.defer_task(id, None, None).unwrap();
        } else {
            model.close_task(id, None, None).unwrap();
        }
    }

    let risk = model.risk(RISK_ID).unwrap();
    assert_eq!(model.treatment_of(risk), Treatment::Unchecked);
}

#[test]
fn backlog_reflects_recorded_task_states() {
    let mut model = make_model();
    model.evaluate().unwrap();

    let first = model.backlog().first().map(|t| t.id.clone()).unwrap();
    model.process_task(&first, Some("SEC-9".to_string()), None).unwrap();

    let backlog = model.backlog();
    let task = backlog.iter().find(|t| t.id == first).unwrap();
    assert_eq!(task.state, riskgraph::task::TaskState::InProgress);
}
