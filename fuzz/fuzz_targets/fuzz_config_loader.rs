#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = latency_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A validated config must always yield a buildable engine.
            let engine = latency_core::LatencyEngine::builder()
                .with_config(latency_core::EngineCfg::from(&cfg.analysis))
                .build();
            assert!(engine.is_ok(), "validated config rejected by builder");
        }
    }
});
