// tests/demo_config.rs
mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::PathBuf;

use devtool::config::load_and_validate;
use devtool::types::OutputMode;

type TestResult = Result<(), Box<dyn Error>>;

/// `demos/Devtool.toml` must stay loadable as documented.
#[test]
fn demo_config_is_valid() -> TestResult {
    init_tracing();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest_dir.join("demos/Devtool.toml"))?;

    assert_eq!(cfg.build.dir, PathBuf::from("web"));
    assert_eq!(cfg.build.effective_out_dir(), PathBuf::from("web/dist"));
    assert_eq!(cfg.build.manifest.len(), 3);
    assert_eq!(
        cfg.services.keys().cloned().collect::<Vec<_>>(),
        vec!["backend".to_string(), "frontend".to_string()]
    );
    assert_eq!(cfg.services["backend"].port_env.as_deref(), Some("API_PORT"));
    assert_eq!(cfg.services["backend"].output, OutputMode::Inherited);
    assert_eq!(cfg.env.production["API_URL"], "/api");
    Ok(())
}
