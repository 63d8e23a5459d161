use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=TOPOSTREAMS_LIB_DIR");
    if env::var("CARGO_FEATURE_CUDA").is_ok() {
        if let Ok(dir) = env::var("TOPOSTREAMS_LIB_DIR") {
            println!("cargo:rustc-link-search=native={}", dir);
        }
        println!("cargo:rustc-link-search=native=/usr/local/lib");
        println!("cargo:rustc-link-lib=dylib=topostreams");
    }
}
