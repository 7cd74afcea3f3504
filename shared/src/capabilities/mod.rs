mod camera;
mod http;
mod kv;

pub use self::camera::{Camera, CameraOperation, CameraOutput};
pub use self::http::{
    ApiEndpoint, EndpointError, DEFAULT_API_URL, MAX_URL_LENGTH, PREFLIGHT_FREE_CONTENT_TYPE,
};
pub use self::kv::{decode_name, encode_name, name_key, StoredNameError, MAX_NAME_BYTES};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
    pub camera: Camera<Event>,
}
