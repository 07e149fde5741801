use armory_core::prelude::*;

/// Unit resources provide nothing.
#[derive(Resource)]
struct Marker;

/// Raw identifiers and private fields.
#[derive(Resource)]
struct Raw {
    r#type: &'static str,
    _internal: u8,
}

/// Unit factories take no arguments.
#[derive(Factory)]
struct Empty;

#[derive(Factory)]
struct Options {
    #[factory(injected_if_available)]
    verbose: Option<bool>,
    #[factory(default = "plain".to_string())]
    format: String,
}

fn main() {
    assert!(<Marker as Resource>::provides().is_empty());
    assert_eq!(<Raw as Resource>::provides(), &["type"]);

    let raw = Raw {
        r#type: "kind",
        _internal: 0,
    };
    let value = raw.resource("type").unwrap();
    assert_eq!(read_value::<&'static str>(&value), Some("kind"));
    assert!(raw.resource("_internal").is_none());

    assert!(extract_specification::<Empty>().is_empty());
    let _empty: Empty = Empty::construct(CallArgs::new()).unwrap();

    let spec = extract_specification::<Options>();
    assert_eq!(spec.argument_names(), &["verbose", "format"]);
    assert_eq!(spec.default_of("verbose"), Some(ParamDefault::InjectedIfAvailable));

    let options = Options::construct(CallArgs::new()).unwrap();
    assert_eq!(options.verbose, None);
    assert_eq!(options.format, "plain");
}
