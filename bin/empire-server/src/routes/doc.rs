use utoipa::OpenApi;

use crate::routes::{chat, health};

#[derive(OpenApi)]
#[openapi(info(
    title = "empire-server",
    description = "Digital Empire portfolio API",
    version = "0.1.0",
    contact(name = "empire-rs", url = "https://github.com/digital-empire/empire-rs")
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(chat::ChatApi::openapi());
    root.merge(health::HealthApi::openapi());
    root
}
