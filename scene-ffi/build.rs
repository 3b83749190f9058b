//! Generates the C header for the scene FFI into OUT_DIR

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        println!("cargo:warning=scene-ffi: cargo environment missing, header not generated");
        return;
    };

    let header = PathBuf::from(out_dir).join("scene_ffi.h");
    match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("SCENE_FFI_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&header);
        }
        Err(err) => println!("cargo:warning=scene-ffi: header not generated: {}", err),
    }
}
