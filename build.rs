//! Скрипт линковки прошивки. Для сборки на хосте ничего не делает.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=memory.x");
    if env::var_os("CARGO_FEATURE_FIRMWARE").is_none() {
        return;
    }

    let out = PathBuf::from(env::var_os("OUT_DIR").unwrap_or_default());
    if fs::copy("memory.x", out.join("memory.x")).is_err() {
        println!("cargo:warning=memory.x not found");
    }
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
