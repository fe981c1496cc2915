#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(mut cfg) = scalepos_config::load_toml(data) {
        let _ = cfg.validate();
        // Overlaying the config's own table must keep it valid-or-invalid, never panic.
        let table = cfg.pricing.clone();
        cfg.merge_pricing(table);
        let _ = cfg.validate();
    }
});
