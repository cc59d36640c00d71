#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = helmcoil_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A valid config must map onto runtime configs without panicking
            let _ramp: helmcoil_core::RampCfg = (&cfg.ramp).into();
            let _plan = helmcoil_core::SweepPlan::from(&cfg.sweep);
            let _field = helmcoil_core::SweepPlan::from(&cfg.field);
        }
    }
});
