use std::sync::LazyLock;
use tera::Tera;

const TEMPLATES_GLOB: &str = "web/templates/**/*.html";

pub static WEB_TEMPLATES: LazyLock<Tera> = LazyLock::new(|| {
    Tera::new(TEMPLATES_GLOB).unwrap_or_else(|e| {
        log::error!("templates at {TEMPLATES_GLOB} couldnt be loaded: {e}");
        Tera::default()
    })
});
