use std::sync::LazyLock;

use armory_core::prelude::*;

#[derive(Resource)]
struct Settings {
    name: String,
    retries: u32,
}

static SETTINGS: LazyLock<InstanceProvider<Settings>> = LazyLock::new(|| create_provider(false));

/// Mutable injected parameters keep their binding mode.
#[inject(SETTINGS)]
fn bump(#[injected] mut retries: u32) -> u32 {
    retries += 1;
    retries
}

/// Borrowed parameters and returns are left to inference.
#[inject(SETTINGS)]
fn pick<'a>(text: &'a str, #[default(String::new())] name: String) -> &'a str {
    if name.is_empty() { text } else { &text[..1] }
}

/// Unit returns are wrapped as well.
#[inject(SETTINGS)]
fn log(#[injected_if_available] name: Option<String>) {
    let _ = name;
}

fn main() {
    let _armed = SETTINGS
        .arm(Settings {
            name: "svc".to_string(),
            retries: 2,
        })
        .unwrap();

    let bumped: Result<u32, InjectError> = bump(INJECTED);
    assert_eq!(bumped.unwrap(), 3);
    assert_eq!(pick("text", INJECTED).unwrap(), "t");
    log(INJECTED).unwrap();
}
