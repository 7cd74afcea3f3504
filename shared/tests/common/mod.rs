#![allow(dead_code)]

use crux_core::testing::{AppTester, Update};
use sal_shared::capabilities::CameraOperation;
use sal_shared::{App, Effect, Event, Model};

pub type Tester = AppTester<App, Effect>;

pub fn tester() -> Tester {
    AppTester::<App, Effect>::default()
}

pub fn ok(json: &str) -> Result<Vec<u8>, sal_shared::gateway::GatewayError> {
    Ok(json.as_bytes().to_vec())
}

pub fn camera_ops(update: &Update<Effect, Event>) -> Vec<CameraOperation> {
    update
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Camera(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

/// `(method, url, body)` of every HTTP request in the update.
pub fn http_requests(update: &Update<Effect, Event>) -> Vec<(String, String, Vec<u8>)> {
    update
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some((
                request.operation.method.clone(),
                request.operation.url.clone(),
                request.operation.body.clone(),
            )),
            _ => None,
        })
        .collect()
}

pub fn kv_count(update: &Update<Effect, Event>) -> usize {
    update
        .effects
        .iter()
        .filter(|effect| matches!(effect, Effect::KeyValue(_)))
        .count()
}

pub fn renders(update: &Update<Effect, Event>) -> bool {
    update
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::Render(_)))
}

/// App started with the single-mode camera running.
pub fn started(app: &Tester) -> Model {
    let mut model = Model::default();
    app.update(Event::AppStarted, &mut model);
    app.update(
        Event::CameraStatus {
            slot: sal_shared::session::ScanSlot::Single,
            output: sal_shared::capabilities::CameraOutput::Scanning,
        },
        &mut model,
    );
    model
}

pub fn with_names(app: &Tester, model: &mut Model) {
    use sal_shared::model::ActorRole;
    app.update(
        Event::ActorNameChanged {
            role: ActorRole::Operator,
            name: "Sam".into(),
        },
        model,
    );
    app.update(
        Event::ActorNameChanged {
            role: ActorRole::TeamMember,
            name: "Alex".into(),
        },
        model,
    );
}

pub const ITEM_001: &str = r#"{
    "salId": "SAL-001", "area": "Lighting", "item": "Par can", "purpose": "Stage wash",
    "requiredQty": 5, "totalDispatched": 2, "totalReturned": 0, "returnToSal": "N"
}"#;
