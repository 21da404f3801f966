//! Build script - wires the esp-hal linker scripts into the firmware
//! binary and tracks the WiFi credentials baked in at compile time.

use std::env;

fn main() {
    let embedded = env::var_os("CARGO_FEATURE_EMBEDDED").is_some();
    let xtensa = env::var("CARGO_CFG_TARGET_ARCH").map_or(false, |arch| arch == "xtensa");

    // Host builds (unit + integration tests) link normally.
    if embedded && xtensa {
        println!("cargo:rustc-link-arg-bins=-Tlinkall.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Credentials are read with `option_env!` in main.rs.
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASS");
    println!("cargo:rerun-if-changed=build.rs");
}
