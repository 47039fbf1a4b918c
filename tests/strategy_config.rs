use anyhow::{Context, Result};
use holdfast::{LazySingleton, Strategy};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct HostConfig {
    name: String,
    singleton: Strategy,
}

fn cell_from(config: &HostConfig) -> LazySingleton<String> {
    match config.singleton {
        Strategy::Eager => LazySingleton::eager(config.name.clone()),
        Strategy::DoubleChecked => LazySingleton::double_checked(),
        Strategy::OnceGuard => LazySingleton::once_guard(),
    }
}

#[test]
fn test_strategy_from_host_config() -> Result<()> {
    for (raw, expected) in [
        (r#"{ "name": "svc", "singleton": "eager" }"#, Strategy::Eager),
        (r#"{ "name": "svc", "singleton": "double_checked" }"#, Strategy::DoubleChecked),
        (r#"{ "name": "svc", "singleton": "once_guard" }"#, Strategy::OnceGuard),
    ] {
        let config: HostConfig = serde_json::from_str(raw).context("parsing host config")?;
        assert_eq!(config.singleton, expected);

        let cell = cell_from(&config);
        assert_eq!(cell.strategy(), expected);
        assert_eq!(cell.get_or_init(|| config.name.clone()), "svc");
    }
    Ok(())
}

#[test]
fn test_unknown_strategy_is_rejected() {
    let err = serde_json::from_str::<HostConfig>(r#"{ "name": "svc", "singleton": "spin" }"#)
        .unwrap_err();
    assert!(err.to_string().contains("unknown variant"));
}

#[test]
fn test_strategy_serializes_to_config_spelling() -> Result<()> {
    let encoded = serde_json::to_string(&Strategy::ALL)?;
    assert_eq!(encoded, r#"["eager","double_checked","once_guard"]"#);
    Ok(())
}
