#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    let path = std::env::temp_dir().join(format!("scalepos-fuzz-{}.csv", std::process::id()));
    let Ok(mut file) = std::fs::File::create(&path) else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }
    drop(file);
    if let Ok(table) = scalepos_config::load_pricing_csv(&path) {
        // Accepted rates already passed the same check validate() applies.
        assert!(table.values().all(|r| r.is_finite() && *r >= 0.0));
    }
    let _ = std::fs::remove_file(&path);
});
