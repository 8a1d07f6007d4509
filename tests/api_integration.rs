//! Integration tests driving the HTTP router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use gridflow::api::router;

async fn send(method: &str, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method(method)
        .uri("/api")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let resp = router().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn post(body: Value) -> (StatusCode, Value) {
    let (status, bytes) = send("POST", body.to_string()).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn simulate(three_phase: bool, elements: Value) -> Value {
    json!({"status": "SIM_REQUEST", "3phase": three_phase, "elements": elements})
}

/// Two 20 kV buses fed from an external grid, with a load at the far end.
fn feeder() -> Value {
    json!({
        "b0": {"etype": "bus", "vn_kv": 20.0},
        "b1": {"etype": "bus", "vn_kv": 20.0},
        "grid": {"etype": "ext_grid", "bus": "b0"},
        "l1": {"etype": "line", "from_bus": "b0", "to_bus": "b1", "length_km": 2.0,
               "std_type": "NA2XS2Y 1x95 RM/25 12/20 kV"},
        "l2": {"etype": "line", "from_bus": "b0", "to_bus": "b1", "length_km": 3.0,
               "std_type": "NA2XS2Y 1x95 RM/25 12/20 kV"},
        "load": {"etype": "load", "bus": "b1", "p_mw": 1.5, "q_mvar": 0.4},
    })
}

fn assert_error(status: StatusCode, body: &Value, kind: &str) {
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "ERROR");
    assert_eq!(body["error"], kind);
}

#[tokio::test]
async fn welcome_page() {
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).starts_with("Welcome to Electric Blocks Panda Power."));
}

#[tokio::test]
async fn keep_alive_is_acknowledged() {
    let (status, body) = post(json!({"status": "KEEP_ALIVE"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "KEEP_ALIVE", "response": "Keep alive request acknowledged"})
    );
}

#[tokio::test]
async fn missing_status_is_invalid() {
    let (status, body) = post(json!({"3phase": false, "elements": {}})).await;
    assert_error(status, &body, "INVALID_ERROR");
    assert_eq!(body["message"], "Could not get key \"status\" from dictionary.");
}

#[tokio::test]
async fn unknown_status_is_named() {
    let (status, body) = post(json!({"status": "RESTART"})).await;
    assert_error(status, &body, "INVALID_ERROR");
    assert_eq!(body["message"], "Status \"RESTART\" is not a valid status code.");
}

#[tokio::test]
async fn unparsable_body_is_json_error() {
    let (status, bytes) = send("POST", "{\"status\": ").await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_error(status, &body, "JSON_ERROR");
    assert_eq!(body["message"], "Could not parse json from request data");

    let (status, bytes) = send("GET", Body::empty()).await;
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_error(status, &body, "JSON_ERROR");
}

#[tokio::test]
async fn undeclared_bus_is_invalid() {
    let mut elements = feeder();
    elements["load"]["bus"] = json!("b7");
    let (status, body) = post(simulate(false, elements)).await;
    assert_error(status, &body, "INVALID_ERROR");
    assert!(body["message"].as_str().unwrap().contains("b7"));
}

#[tokio::test]
async fn unknown_kind_and_attribute_are_named() {
    let mut elements = feeder();
    elements["x"] = json!({"etype": "shunt", "bus": "b0"});
    let (status, body) = post(simulate(false, elements)).await;
    assert_error(status, &body, "INVALID_ERROR");
    assert!(body["message"].as_str().unwrap().contains("shunt"));

    let mut elements = feeder();
    elements["load"]["power_factor"] = json!(0.9);
    let (status, body) = post(simulate(false, elements)).await;
    assert_error(status, &body, "INVALID_ERROR");
    assert!(body["message"].as_str().unwrap().contains("power_factor"));
}

#[tokio::test]
async fn minimal_network_reports_every_element() {
    let elements = json!({
        "bus": {"etype": "bus", "vn_kv": 0.4},
        "grid": {"etype": "ext_grid", "bus": "bus"},
        "load": {"etype": "load", "bus": "bus", "p_mw": 0.05, "q_mvar": 0.01},
    });
    let (status, body) = post(simulate(false, elements)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "SIM_RESULT");
    let results = body["elements"].as_object().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results["bus"]["etype"], "bus");
    assert_eq!(results["grid"]["etype"], "ext_grid");
    assert_eq!(results["load"]["etype"], "load");
    assert_eq!(results["bus"]["vm_pu"], 1.0);
    let p_grid = results["grid"]["p_mw"].as_f64().unwrap();
    assert!((p_grid - 0.05).abs() < 1e-9);
}

#[tokio::test]
async fn isolated_load_does_not_converge() {
    let elements = json!({
        "bus": {"etype": "bus", "vn_kv": 0.4},
        "load": {"etype": "load", "bus": "bus", "p_mw": 0.05},
    });
    let (status, body) = post(simulate(false, elements)).await;
    assert_error(status, &body, "CONV_ERROR");
    assert_eq!(body["message"], "Load flow did not converge.");
}

#[tokio::test]
async fn open_line_switch_cuts_series_flow() {
    let mut elements = feeder();
    elements["sw"] = json!({"etype": "switch", "bus": "b1", "element": "l1", "et": "l",
                            "closed": false});
    let (status, body) = post(simulate(false, elements)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let results = &body["elements"];
    assert!(results.get("sw").is_none());

    let p_to = results["l1"]["p_to_mw"].as_f64().unwrap();
    assert!(p_to.abs() < 1e-6);
    // only charging current flows into the open line
    assert!(results["l1"]["p_from_mw"].as_f64().unwrap().abs() < 1e-3);
    let p_l2 = results["l2"]["p_to_mw"].as_f64().unwrap();
    assert!((p_l2 + 1.5).abs() < 1e-6);
}

#[tokio::test]
async fn closed_line_switch_changes_nothing() {
    let (_, plain) = post(simulate(false, feeder())).await;
    let mut elements = feeder();
    elements["sw"] = json!({"etype": "switch", "bus": "b1", "element": "l1", "et": "l"});
    let (status, switched) = post(simulate(false, elements)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plain["elements"]["l1"], switched["elements"]["l1"]);
}

#[tokio::test]
async fn closed_bus_switch_joins_voltages() {
    let mut elements = feeder();
    elements["b2"] = json!({"etype": "bus", "vn_kv": 20.0});
    elements["load"]["bus"] = json!("b2");
    elements["tie"] = json!({"etype": "switch", "bus": "b1", "element": "b2", "et": "b"});
    let (status, body) = post(simulate(false, elements)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let results = &body["elements"];
    assert_eq!(results["b1"]["vm_pu"], results["b2"]["vm_pu"]);
    assert_eq!(results["b1"]["va_degree"], results["b2"]["va_degree"]);
    assert!(results["b2"]["vm_pu"].as_f64().unwrap() < 1.0);
    assert_eq!(results["b2"]["p_mw"], 1.5);
}

#[tokio::test]
async fn three_phase_reports_per_phase_fields() {
    let (status, body) = post(simulate(true, feeder())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let results = &body["elements"];
    for field in ["vm_a_pu", "vm_b_pu", "vm_c_pu", "va_b_degree", "p_c_mw"] {
        assert!(results["b1"].get(field).is_some(), "missing {field}");
    }
    assert!(results["b1"].get("vm_pu").is_none());
    assert!(results["l1"].get("i_a_from_ka").is_some());
    assert!(results["grid"].get("p_a_mw").is_some());
    let total: f64 = ["p_a_mw", "p_b_mw", "p_c_mw"]
        .iter()
        .map(|f| results["grid"][*f].as_f64().unwrap())
        .sum();
    let (_, single) = post(simulate(false, feeder())).await;
    let p_grid = single["elements"]["grid"]["p_mw"].as_f64().unwrap();
    assert!((total - p_grid).abs() < 1e-9);
}

#[tokio::test]
async fn transformer_feeds_low_voltage_side() {
    let elements = json!({
        "mv": {"etype": "bus", "vn_kv": 20.0},
        "lv": {"etype": "bus", "vn_kv": 0.4},
        "grid": {"etype": "ext_grid", "bus": "mv"},
        "t": {"etype": "transformer", "hv_bus": "mv", "lv_bus": "lv",
              "std_type": "0.4 MVA 20/0.4 kV"},
        "load": {"etype": "load", "bus": "lv", "p_mw": 0.2, "q_mvar": 0.05},
        "sw": {"etype": "switch", "bus": "mv", "element": "t", "et": "t"},
    });
    let (status, body) = post(simulate(false, elements)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let trafo = &body["elements"]["t"];
    assert_eq!(trafo["etype"], "trafo");
    assert!((trafo["p_lv_mw"].as_f64().unwrap() + 0.2).abs() < 1e-6);
    assert!(trafo["loading_percent"].as_f64().unwrap() > 40.0);
    assert!(body["elements"]["lv"]["vm_pu"].as_f64().unwrap() < 1.0);
}

#[tokio::test]
async fn single_pv_generator_solves() {
    let elements = json!({
        "b0": {"etype": "bus", "vn_kv": 20.0},
        "b1": {"etype": "bus", "vn_kv": 20.0},
        "grid": {"etype": "ext_grid", "bus": "b0"},
        "l": {"etype": "line", "from_bus": "b0", "to_bus": "b1", "length_km": 2.0,
              "std_type": "NA2XS2Y 1x95 RM/25 12/20 kV"},
        "g": {"etype": "gen", "bus": "b1", "p_mw": 1.0},
    });
    let (status, body) = post(simulate(false, elements)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "SIM_RESULT");
    let results = &body["elements"];
    assert!((results["b1"]["vm_pu"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert!((results["g"]["p_mw"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert!(results["grid"]["p_mw"].as_f64().unwrap() < 0.0);
}

#[tokio::test]
async fn bus_without_voltage_uses_default() {
    let elements = json!({
        "b": {"etype": "bus"},
        "grid": {"etype": "ext_grid", "bus": "b"},
        "load": {"etype": "load", "bus": "b", "p_mw": 0.1},
    });
    let (status, body) = post(simulate(false, elements)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "SIM_RESULT");
}
