//! Built-in catalog rules applied against a realistic shop model

use riskgraph::asset::Asset;
use riskgraph::component::{Component, DataFormat, Technology};
use riskgraph::data_flow::{DataFlow, Protocol};
use riskgraph::model::Model;
use riskgraph::score::Score;

/// An online shop with one representative target per built-in rule
fn make_shop() -> Model {
    let mut model = Model::new("Shop");

    let user = model
        .add_component(Component::actor("User").with_technology(Technology::Browser))
        .unwrap();
    let web_app = model
        .add_component(
            Component::process("WebApp")
                .with_technology(Technology::WebApplication)
                .accepts(DataFormat::Json)
                .accepts(DataFormat::File),
        )
        .unwrap();
    let api = model
        .add_component(
            Component::process("Api")
                .with_technology(Technology::WebServiceRest)
                .accepts(DataFormat::Json),
        )
        .unwrap();
    let legacy = model
        .add_component(Component::process("Legacy").accepts(DataFormat::Xml))
        .unwrap();
    let database = model
        .add_component(Component::data_store("Database").with_technology(Technology::Database))
        .unwrap();
    let doc_store = model
        .add_component(Component::data_store("DocStore").with_technology(Technology::Database))
        .unwrap();
    let files = model
        .add_component(Component::data_store("Files").with_technology(Technology::FileServer))
        .unwrap();
    let directory = model
        .add_component(Component::data_store("Directory"))
        .unwrap();
    let gateway = model.add_component(Component::external_entity("PaymentGateway")).unwrap();

    let orders = model
        .add_asset(Asset::new("Orders", Score::HIGH, Score::HIGH, Score::MEDIUM).pii())
        .unwrap();

    let flows = [
        model.add_data_flow(DataFlow::new("Checkout", user, web_app, Protocol::Https)).unwrap(),
        model.add_data_flow(DataFlow::new("OrderQuery", web_app, database, Protocol::Jdbc)).unwrap(),
        model.add_data_flow(DataFlow::new("ReceiptFetch", web_app, files, Protocol::Nfs)).unwrap(),
        model.add_data_flow(DataFlow::new("StaffLookup", web_app, directory, Protocol::Ldap)).unwrap(),
        model.add_data_flow(DataFlow::new("Ingest", web_app, legacy, Protocol::Text)).unwrap(),
        model.add_data_flow(DataFlow::new("DocQuery", api, doc_store, Protocol::Nosql)).unwrap(),
        model.add_data_flow(DataFlow::new("PaymentCall", api, gateway, Protocol::Https)).unwrap(),
    ];
    for flow in flows {
        model.transfers(flow, orders);
    }

    model.evaluate().unwrap();
    model
}

#[test]
fn every_builtin_rule_fires_on_its_target() {
    let model = make_shop();
    for id in [
        "CAPEC-17@WebApp",
        "CAPEC-62@WebApp@Checkout",
        "CAPEC-63@WebApp",
        "CAPEC-66@WebApp@OrderQuery",
        "CAPEC-126@WebApp@ReceiptFetch",
        "CAPEC-136@WebApp@StaffLookup",
        "CAPEC-250@Legacy",
        "CAPEC-664@Api@PaymentCall",
        "CAPEC-676@Api@DocQuery",
    ] {
        assert!(model.risk(id).is_ok(), "expected risk {id}");
    }
}

#[test]
fn clients_and_external_entities_stay_clean() {
    let model = make_shop();
    // The browser is client software, so its outgoing web flow is no SSRF;
    // the gateway is out of scope by definition.
    assert!(model.risks().all(|r| r.target != "User"));
    assert!(model.risks().all(|r| r.target != "PaymentGateway"));
}

#[test]
fn ssrf_skips_non_web_callers() {
    let model = make_shop();
    // WebApp's outgoing flows are JDBC/NFS/LDAP/text, none web access.
    assert!(model.risks().all(|r| r.id != "CAPEC-664@WebApp@OrderQuery"));
    assert!(model
        .risks()
        .filter(|r| r.threat_id == "CAPEC-664")
        .all(|r| r.target == "Api"));
}

#[test]
fn sql_injection_is_rated_high() {
    let model = make_shop();
    let risk = model.risk("CAPEC-66@WebApp@OrderQuery").unwrap();
    assert_eq!(risk.severity, riskgraph::Severity::High);
    assert_eq!(
        risk.text,
        "SQL Injection risk at WebApp against database Database via OrderQuery"
    );
}

#[test]
fn risk_references_carry_cwe_links() {
    let model = make_shop();
    let risk = model.risk("CAPEC-62@WebApp@Checkout").unwrap();
    assert!(risk
        .references
        .iter()
        .any(|r| r == "https://cwe.mitre.org/data/definitions/352.html"));
    assert!(risk.references.iter().any(|r| r.contains("capec.mitre.org")));
}

#[test]
fn templates_match_by_shared_cwe() {
    let model = make_shop();

    let nosql = model.risk("CAPEC-676@Api@DocQuery").unwrap();
    let tasks = model.tasks_for(nosql);
    assert!(tasks.iter().any(|t| t.template_id == "ASVS-5.3.4"));

    // WebApp is neither a REST nor a SOAP service, so the XSS rule's
    // template filter keeps only the generic input validation template.
    let xss = model.risk("CAPEC-63@WebApp").unwrap();
    let tasks = model.tasks_for(xss);
    assert!(tasks.iter().any(|t| t.template_id == "ASVS-5.3.3"));
    assert!(tasks.iter().any(|t| t.template_id == "ASVS-5.1.3"));
    assert!(tasks.iter().all(|t| t.template_id != "ASVS-13.2.1"));
    assert!(tasks.iter().all(|t| t.template_id != "ASVS-13.3.1"));
}
